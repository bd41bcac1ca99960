use std::collections::HashMap;

use crate::conn::{ConnId, Connection};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegisterError {
    #[error("nickname {0:?} is taken")]
    Taken(String),
    #[error("connection {0} already has a nickname")]
    AlreadyRegistered(ConnId),
    #[error("no connection {0}")]
    Missing(ConnId),
}

/// Every live connection, plus a name index kept in step with it.
#[derive(Default)]
pub struct Registry {
    conns: HashMap<ConnId, Connection>,
    names: HashMap<String, ConnId>,
}

impl Registry {
    pub fn insert(&mut self, conn: Connection) {
        let id = conn.id();
        let old = self.conns.insert(id, conn);
        debug_assert!(old.is_none(), "duplicate connection id {id}");
    }

    /// Removes a connection and frees its nickname. Dropping the returned
    /// value closes the socket.
    pub fn remove(&mut self, id: ConnId) -> Option<Connection> {
        let conn = self.conns.remove(&id)?;
        if let Some(nick) = conn.nick() {
            self.names.remove(nick);
        }
        Some(conn)
    }

    pub fn get(&self, id: ConnId) -> Option<&Connection> {
        self.conns.get(&id)
    }

    pub fn get_mut(&mut self, id: ConnId) -> Option<&mut Connection> {
        self.conns.get_mut(&id)
    }

    pub fn contains(&self, id: ConnId) -> bool {
        self.conns.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }

    /// Number of connections that completed the handshake.
    pub fn registered(&self) -> usize {
        self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.conns.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Connection> {
        self.conns.values_mut()
    }

    pub(crate) fn name_index(&self) -> &HashMap<String, ConnId> {
        &self.names
    }

    /// Gives `id` the nickname `name`. A taken name leaves everything as it
    /// was.
    pub fn register(&mut self, id: ConnId, name: &str) -> Result<(), RegisterError> {
        if self.names.contains_key(name) {
            return Err(RegisterError::Taken(name.to_string()));
        }
        let conn = self.conns.get_mut(&id).ok_or(RegisterError::Missing(id))?;
        if conn.is_registered() {
            return Err(RegisterError::AlreadyRegistered(id));
        }

        conn.assign_nick(name.to_string());
        self.names.insert(name.to_string(), id);
        Ok(())
    }
}
