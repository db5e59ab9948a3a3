//! Interactive client
//!
//! Menu-driven front end for the chat protocol: the user picks public chat,
//! private chat or rename, and typed lines are turned into protocol lines.
//! Server output is printed as it arrives by a separate task.

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info};

use crate::codec::LineCodec;
use crate::config::{ClientConfig, DEFAULT_MAX_LINE_LENGTH};
use crate::error::{AppError, CodecError};
use crate::message::Command;

/// Typed in a chat loop to go back to the menu
pub const EXIT_WORD: &str = "exit";

const MENU: &str = "1. public chat\n2. private chat\n3. rename\n0. exit\n";

/// Menu choices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Public,
    Private,
    Rename,
    Exit,
}

impl Mode {
    /// Parse a menu entry (`0`-`3`)
    pub fn from_choice(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Mode::Public),
            "2" => Some(Mode::Private),
            "3" => Some(Mode::Rename),
            "0" => Some(Mode::Exit),
            _ => None,
        }
    }
}

/// Prompt loop reading from `input`, echoing prompts to `output` and
/// sending protocol lines to `server`
pub struct Console<I, O, W> {
    input: tokio::io::Lines<I>,
    output: O,
    server: W,
}

impl<I, O, W> Console<I, O, W>
where
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
    W: Sink<String, Error = CodecError> + Unpin,
{
    pub fn new(input: I, output: O, server: W) -> Self {
        Self {
            input: input.lines(),
            output,
            server,
        }
    }

    /// Run the menu until the user picks exit or input ends
    pub async fn run(&mut self) -> Result<(), AppError> {
        loop {
            let mode = loop {
                self.say(MENU).await?;
                let Some(choice) = self.read_line().await? else {
                    return Ok(());
                };
                match Mode::from_choice(&choice) {
                    Some(mode) => break mode,
                    None => self.say(">>> please enter a number from 0 to 3\n").await?,
                }
            };

            let finished = match mode {
                Mode::Public => self.public_chat().await?,
                Mode::Private => self.private_chat().await?,
                Mode::Rename => self.rename().await?,
                Mode::Exit => return Ok(()),
            };
            if finished {
                return Ok(());
            }
        }
    }

    /// Returns true when input ended
    async fn public_chat(&mut self) -> Result<bool, AppError> {
        loop {
            self.say(">>> message (exit to leave):\n").await?;
            let Some(text) = self.read_line().await? else {
                return Ok(true);
            };
            if text == EXIT_WORD {
                return Ok(false);
            }
            if !text.is_empty() {
                self.send(Command::Broadcast { text }).await?;
            }
        }
    }

    async fn private_chat(&mut self) -> Result<bool, AppError> {
        loop {
            self.send(Command::Who).await?;
            self.say(">>> chat with (name, exit to leave):\n").await?;
            let Some(target) = self.read_line().await? else {
                return Ok(true);
            };
            if target == EXIT_WORD {
                return Ok(false);
            }
            if target.is_empty() {
                continue;
            }

            loop {
                self.say(">>> message (exit to pick someone else):\n").await?;
                let Some(body) = self.read_line().await? else {
                    return Ok(true);
                };
                if body == EXIT_WORD {
                    break;
                }
                if !body.is_empty() {
                    let target = target.clone();
                    self.send(Command::Private { target, body }).await?;
                }
            }
        }
    }

    async fn rename(&mut self) -> Result<bool, AppError> {
        self.say(">>> new name:\n").await?;
        let Some(name) = self.read_line().await? else {
            return Ok(true);
        };
        if !name.is_empty() {
            self.send(Command::Rename { name }).await?;
        }
        Ok(false)
    }

    async fn read_line(&mut self) -> Result<Option<String>, AppError> {
        let line = self.input.next_line().await?;
        Ok(line.map(|l| l.trim().to_string()))
    }

    async fn say(&mut self, text: &str) -> Result<(), AppError> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await?;
        Ok(())
    }

    async fn send(&mut self, cmd: Command) -> Result<(), AppError> {
        self.server.send(cmd.to_line()).await?;
        Ok(())
    }
}

/// Copy server lines to `output` until the server goes away
pub async fn print_responses<R, O>(
    mut lines: FramedRead<R, LineCodec>,
    mut output: O,
) -> Result<(), AppError>
where
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    while let Some(line) = lines.next().await {
        let line = line?;
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    debug!("Server closed the connection");
    Ok(())
}

/// Connect and run the interactive client on stdin/stdout
pub async fn run_client(config: ClientConfig) -> Result<(), AppError> {
    let addr = config.server_addr();
    let stream = TcpStream::connect(&addr)
        .await
        .map_err(|source| AppError::Connect {
            addr: addr.clone(),
            source,
        })?;
    info!("Connected to {}", addr);

    let codec = LineCodec::new(config.encoding, DEFAULT_MAX_LINE_LENGTH);
    let (read_half, write_half) = stream.into_split();
    let lines = FramedRead::new(read_half, codec.clone());
    let server = FramedWrite::new(write_half, codec);

    let mut stdout = tokio::io::stdout();
    stdout.write_all(b">>> connected\n").await?;

    let printer = tokio::spawn(print_responses(lines, tokio::io::stdout()));
    let mut console = Console::new(BufReader::new(tokio::io::stdin()), stdout, server);

    tokio::select! {
        result = console.run() => result,
        printed = printer => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(b">>> disconnected by server\n").await?;
            match printed {
                Ok(result) => result,
                Err(e) => Err(AppError::Io(std::io::Error::other(e))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_choice() {
        assert_eq!(Mode::from_choice("1"), Some(Mode::Public));
        assert_eq!(Mode::from_choice(" 2 "), Some(Mode::Private));
        assert_eq!(Mode::from_choice("3"), Some(Mode::Rename));
        assert_eq!(Mode::from_choice("0"), Some(Mode::Exit));
        assert_eq!(Mode::from_choice("4"), None);
        assert_eq!(Mode::from_choice("one"), None);
    }

    async fn run_script(script: &str) -> (Vec<String>, String) {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let codec = LineCodec::new(encoding_rs::GBK, 4096);
        let mut output = Vec::new();
        {
            let writer = FramedWrite::new(client_io, codec.clone());
            let mut console = Console::new(script.as_bytes(), &mut output, writer);
            console.run().await.unwrap();
        }

        let mut reader = FramedRead::new(server_io, codec);
        let mut sent = Vec::new();
        while let Some(line) = reader.next().await {
            sent.push(line.unwrap());
        }
        (sent, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn test_console_sends_protocol_lines() {
        let script = "1\nhello\n\nexit\n3\nbob\n2\nbob\nhi\nexit\nexit\n0\n";

        let (sent, _) = run_script(script).await;

        assert_eq!(
            sent,
            vec!["hello", "rename|bob", "who", "to|bob|hi", "who"]
        );
    }

    #[tokio::test]
    async fn test_console_reprompts_on_bad_choice() {
        let (sent, output) = run_script("9\n0\n").await;

        assert!(sent.is_empty());
        assert!(output.contains("please enter a number from 0 to 3"));
        assert_eq!(output.matches("0. exit").count(), 2);
    }

    #[tokio::test]
    async fn test_console_stops_at_end_of_input() {
        let (sent, _) = run_script("1\nlast words\n").await;

        assert_eq!(sent, vec!["last words"]);
    }

    #[tokio::test]
    async fn test_print_responses() {
        let (mut server_io, client_io) = tokio::io::duplex(256);
        let (encoded, _, _) = encoding_rs::GBK.encode("[1.1.1.1:1]阿丽: 你好\n");
        server_io.write_all(&encoded).await.unwrap();
        drop(server_io);

        let mut output = Vec::new();
        let lines = FramedRead::new(client_io, LineCodec::new(encoding_rs::GBK, 256));
        print_responses(lines, &mut output).await.unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), "[1.1.1.1:1]阿丽: 你好\n");
    }
}
