//! Who is in the session, and under which name.

use crate::connection::ConnectionId;
use crate::error::{CollabError, CollabResult};
use std::collections::{BTreeMap, HashMap};

/// Outcome of a successful join.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Joined {
    /// First join on this connection.
    New,
    /// The connection was already joined under another name.
    Renamed { previous: String },
    /// The connection asked for the name it already holds.
    Unchanged,
}

/// Maps live connections to display names and keeps names unique.
///
/// Names are compared case-sensitively and only against connections that
/// are still present, so a name is free again as soon as its holder leaves.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    names: BTreeMap<ConnectionId, String>,
    holders: HashMap<String, ConnectionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `conn_id` under `name`.
    ///
    /// Fails with [`CollabError::NameTaken`] if another live connection holds
    /// the name; the registry is not modified in that case.
    pub fn join(&mut self, conn_id: ConnectionId, name: &str) -> CollabResult<Joined> {
        if name.trim().is_empty() {
            return Err(CollabError::InvalidName(name.to_string()));
        }

        match self.holders.get(name) {
            Some(holder) if *holder == conn_id => return Ok(Joined::Unchanged),
            Some(_) => return Err(CollabError::NameTaken(name.to_string())),
            None => {}
        }

        let previous = self.names.insert(conn_id, name.to_string());
        self.holders.insert(name.to_string(), conn_id);

        Ok(match previous {
            Some(previous) => {
                self.holders.remove(&previous);
                Joined::Renamed { previous }
            }
            None => Joined::New,
        })
    }

    /// Remove `conn_id`, returning the name it held. No-op for connections
    /// that never joined.
    pub fn leave(&mut self, conn_id: ConnectionId) -> Option<String> {
        let name = self.names.remove(&conn_id)?;
        self.holders.remove(&name);
        Some(name)
    }

    /// The name held by `conn_id`.
    pub fn name_of(&self, conn_id: ConnectionId) -> Option<&str> {
        self.names.get(&conn_id).map(String::as_str)
    }

    pub fn contains(&self, conn_id: ConnectionId) -> bool {
        self.names.contains_key(&conn_id)
    }

    /// All participant names, in connection order.
    pub fn names(&self) -> Vec<String> {
        self.names.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_and_list() {
        let mut registry = SessionRegistry::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();

        assert_eq!(registry.join(a, "alice"), Ok(Joined::New));
        assert_eq!(registry.join(b, "bob"), Ok(Joined::New));
        assert_eq!(registry.names(), vec!["alice", "bob"]);
        assert_eq!(registry.name_of(a), Some("alice"));
        assert_eq!(registry.name_of(b), Some("bob"));
    }

    #[test]
    fn test_name_taken_leaves_registry_untouched() {
        let mut registry = SessionRegistry::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        registry.join(a, "alice").unwrap();

        assert_eq!(
            registry.join(b, "alice"),
            Err(CollabError::NameTaken("alice".to_string()))
        );
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(b));
        assert_eq!(registry.name_of(a), Some("alice"));
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut registry = SessionRegistry::new();
        registry.join(ConnectionId::new(), "alice").unwrap();
        assert!(registry.join(ConnectionId::new(), "Alice").is_ok());
    }

    #[test]
    fn test_leave_frees_name() {
        let mut registry = SessionRegistry::new();
        let a = ConnectionId::new();
        registry.join(a, "alice").unwrap();

        assert_eq!(registry.leave(a), Some("alice".to_string()));
        assert!(registry.is_empty());

        let c = ConnectionId::new();
        assert_eq!(registry.join(c, "alice"), Ok(Joined::New));
    }

    #[test]
    fn test_leave_unknown_is_noop() {
        let mut registry = SessionRegistry::new();
        assert_eq!(registry.leave(ConnectionId::new()), None);
    }

    #[test]
    fn test_rejoin_renames() {
        let mut registry = SessionRegistry::new();
        let a = ConnectionId::new();
        registry.join(a, "alice").unwrap();

        assert_eq!(registry.join(a, "alice"), Ok(Joined::Unchanged));
        assert_eq!(
            registry.join(a, "ally"),
            Ok(Joined::Renamed {
                previous: "alice".to_string()
            })
        );
        assert_eq!(registry.names(), vec!["ally"]);
        // The old name is free for someone else.
        assert_eq!(registry.join(ConnectionId::new(), "alice"), Ok(Joined::New));
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut registry = SessionRegistry::new();
        assert_eq!(
            registry.join(ConnectionId::new(), "  "),
            Err(CollabError::InvalidName("  ".to_string()))
        );
        assert!(registry.is_empty());
    }
}
