//! Session registry: connection-to-identity bindings.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Identifier the reactor assigns to each accepted connection.
pub type ConnId = u64;

/// Maps open connections to their authenticated usernames.
///
/// Cloning yields another handle to the same registry. Single-threaded by
/// construction (the reactor runs on one thread), hence `Rc`/`RefCell`.
/// Invariant: an entry never outlives its connection — the reactor unbinds on
/// every removal path.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Rc<RefCell<HashMap<ConnId, String>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection to a username, replacing any previous identity.
    pub fn bind(&self, conn: ConnId, username: &str) {
        self.inner.borrow_mut().insert(conn, username.to_string());
    }

    /// The username bound to this connection, if any.
    pub fn identity_of(&self, conn: ConnId) -> Option<String> {
        self.inner.borrow().get(&conn).cloned()
    }

    /// Drop a connection's binding. Unbinding an anonymous connection is a
    /// no-op.
    pub fn unbind(&self, conn: ConnId) -> Option<String> {
        self.inner.borrow_mut().remove(&conn)
    }

    /// Number of authenticated connections.
    pub fn active_count(&self) -> usize {
        self.inner.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_lookup_unbind() {
        let reg = SessionRegistry::new();
        assert_eq!(reg.identity_of(1), None);

        reg.bind(1, "alice");
        assert_eq!(reg.identity_of(1).as_deref(), Some("alice"));
        assert_eq!(reg.active_count(), 1);

        assert_eq!(reg.unbind(1).as_deref(), Some("alice"));
        assert_eq!(reg.identity_of(1), None);
        assert_eq!(reg.active_count(), 0);
    }

    #[test]
    fn test_rebind_replaces_identity() {
        let reg = SessionRegistry::new();
        reg.bind(7, "alice");
        reg.bind(7, "bob");
        assert_eq!(reg.identity_of(7).as_deref(), Some("bob"));
        assert_eq!(reg.active_count(), 1);
    }

    #[test]
    fn test_unbind_unknown_is_noop() {
        let reg = SessionRegistry::new();
        assert_eq!(reg.unbind(42), None);
    }

    #[test]
    fn test_connections_are_independent() {
        let reg = SessionRegistry::new();
        reg.bind(1, "alice");
        reg.bind(2, "bob");
        reg.unbind(1);
        assert_eq!(reg.identity_of(2).as_deref(), Some("bob"));
    }
}
