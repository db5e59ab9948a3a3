//! Online-user registry
//!
//! The authoritative display name → session directory. Every read and write
//! goes through one `RwLock`; rename does its check and its mutation under a
//! single write acquisition so two sessions can never end up sharing a name.
//! Callers that do I/O over the registered sessions take a `snapshot` first
//! and never hold the lock while writing to peers.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::message::Notice;
use crate::session::Session;

#[derive(Debug, Default)]
pub struct Registry {
    sessions: RwLock<BTreeMap<String, Arc<Session>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under its current name
    ///
    /// Returns false, leaving the registry untouched, if the name is taken.
    /// Address-derived names are unique among live connections, so this only
    /// happens if a peer has renamed itself to another peer's address.
    pub fn join(&self, session: Arc<Session>) -> bool {
        let mut sessions = self.sessions.write();
        let name = session.name();
        if sessions.contains_key(&name) {
            warn!("Join rejected for {}: name {} taken", session.id(), name);
            return false;
        }
        debug!("Session {} joined as {}", session.id(), name);
        sessions.insert(name, session);
        debug!("Online sessions: {}", sessions.len());
        true
    }

    /// Remove a session's entry; a no-op if it is not registered
    pub fn leave(&self, session: &Session) -> bool {
        let mut sessions = self.sessions.write();
        let name = session.name();
        let owned = sessions
            .get(&name)
            .is_some_and(|entry| entry.id() == session.id());
        if owned {
            sessions.remove(&name);
            debug!("Session {} left ({}), online: {}", session.id(), name, sessions.len());
        }
        owned
    }

    /// Move a session to `new_name` and tell it how that went
    ///
    /// Fails without touching any state when another session already holds
    /// `new_name`. Renaming to one's own current name succeeds.
    pub fn rename(&self, session: &Arc<Session>, new_name: &str) -> bool {
        let renamed = {
            let mut sessions = self.sessions.write();
            let taken = sessions
                .get(new_name)
                .is_some_and(|holder| holder.id() != session.id());
            if taken {
                false
            } else {
                let old_name = session.name();
                if sessions
                    .get(&old_name)
                    .is_some_and(|entry| entry.id() == session.id())
                {
                    sessions.remove(&old_name);
                }
                sessions.insert(new_name.to_string(), Arc::clone(session));
                session.set_name(new_name.to_string());
                info!("Session {} renamed {} -> {}", session.id(), old_name, new_name);
                true
            }
        };

        let notice = if renamed {
            Notice::Renamed {
                name: new_name.to_string(),
            }
        } else {
            Notice::NameInUse {
                name: new_name.to_string(),
            }
        };
        session.notify(notice);
        renamed
    }

    /// Look up a session by display name
    pub fn get(&self, name: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(name).cloned()
    }

    /// Point-in-time copy of all sessions, ordered by name
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
