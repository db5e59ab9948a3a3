//! Line codec
//!
//! Frames the byte stream into `\n`-terminated lines and transcodes between
//! the wire encoding (GBK unless configured otherwise) and Rust strings.
//! Used with `FramedRead`/`FramedWrite` on both the server and the client.

use bytes::{BufMut, BytesMut};
use encoding_rs::Encoding;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;

/// Newline-delimited text codec with a fixed wire encoding
#[derive(Debug, Clone)]
pub struct LineCodec {
    encoding: &'static Encoding,
    max_length: usize,
    /// Bytes already scanned for a newline in the current buffer
    next_index: usize,
}

impl LineCodec {
    /// Create a codec for `encoding`, rejecting lines longer than `max_length` bytes
    ///
    /// The encoding must be ASCII-compatible so that a `\n` byte can only
    /// ever be a line terminator.
    pub fn new(encoding: &'static Encoding, max_length: usize) -> Self {
        Self {
            encoding,
            max_length,
            next_index: 0,
        }
    }

    fn decode_line(&self, mut line: &[u8]) -> Result<String, CodecError> {
        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }
        if line.len() > self.max_length {
            return Err(CodecError::LineTooLong {
                max: self.max_length,
            });
        }
        self.encoding
            .decode_without_bom_handling_and_without_replacement(line)
            .map(|text| text.into_owned())
            .ok_or(CodecError::Malformed {
                encoding: self.encoding.name(),
            })
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, CodecError> {
        let newline = buf[self.next_index..]
            .iter()
            .position(|b| *b == b'\n')
            .map(|offset| self.next_index + offset);

        match newline {
            Some(end) => {
                self.next_index = 0;
                let line = buf.split_to(end + 1);
                self.decode_line(&line[..end]).map(Some)
            }
            None => {
                // Allow one extra byte for a trailing '\r'
                if buf.len() > self.max_length + 1 {
                    return Err(CodecError::LineTooLong {
                        max: self.max_length,
                    });
                }
                self.next_index = buf.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, CodecError> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if buf.is_empty() {
            return Ok(None);
        }
        let line = buf.split_to(buf.len());
        self.decode_line(&line).map(Some)
    }
}

impl<T: AsRef<str>> Encoder<T> for LineCodec {
    type Error = CodecError;

    fn encode(&mut self, line: T, buf: &mut BytesMut) -> Result<(), CodecError> {
        // Unmappable characters come out as numeric character references
        let (bytes, _, _) = self.encoding.encode(line.as_ref());
        buf.reserve(bytes.len() + 1);
        buf.put_slice(&bytes);
        buf.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gbk_codec() -> LineCodec {
        LineCodec::new(encoding_rs::GBK, 64)
    }

    #[test]
    fn test_decode_splits_lines() {
        let mut codec = gbk_codec();
        let mut buf = BytesMut::from(&b"who\nrename|bob\r\npartial"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), Some("who".to_string()));
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("rename|bob".to_string())
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b" line\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("partial line".to_string())
        );
    }

    #[test]
    fn test_decode_gbk() {
        let mut codec = gbk_codec();
        let (encoded, _, _) = encoding_rs::GBK.encode("你好\n");
        let mut buf = BytesMut::from(&encoded[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), Some("你好".to_string()));
    }

    #[test]
    fn test_decode_malformed_is_error() {
        let mut codec = gbk_codec();
        // 0x81 is a GBK lead byte left without its trail byte
        let mut buf = BytesMut::from(&b"ab\x81\n"[..]);

        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::Malformed { .. })
        ));
    }

    #[test]
    fn test_decode_line_too_long() {
        let mut codec = LineCodec::new(encoding_rs::GBK, 4);
        let mut buf = BytesMut::from(&b"abcdefgh"[..]);

        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::LineTooLong { max: 4 })
        ));
    }

    #[test]
    fn test_decode_eof_flushes_unterminated_line() {
        let mut codec = gbk_codec();
        let mut buf = BytesMut::from(&b"bye"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), Some("bye".to_string()));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_encode_appends_newline() {
        let mut codec = gbk_codec();
        let mut buf = BytesMut::new();

        codec.encode("你好", &mut buf).unwrap();

        let (expected, _, _) = encoding_rs::GBK.encode("你好\n");
        assert_eq!(&buf[..], &expected[..]);
    }
}
