//! Nickname lookup and fan-out over the registry.

use crate::conn::ConnId;
use crate::registry::Registry;

impl Registry {
    /// Exact, case-sensitive nickname lookup.
    pub fn find_by_name(&self, name: &str) -> Option<ConnId> {
        if name.is_empty() {
            return None;
        }
        self.name_index().get(name).copied()
    }

    /// Sends to one connection; returns the bytes the transport accepted.
    pub fn send_to(&mut self, id: ConnId, msg: &str) -> usize {
        match self.get_mut(id) {
            Some(conn) => conn.send(msg.as_bytes()),
            None => 0,
        }
    }

    /// Sends to every connection but `sender`, named or not.
    pub fn broadcast_except(&mut self, sender: ConnId, msg: &str) {
        for conn in self.iter_mut().filter(|c| c.id() != sender) {
            conn.send(msg.as_bytes());
        }
    }

    /// Nicknames of all registered connections, in no particular order.
    pub fn roster(&self) -> Vec<&str> {
        self.iter().filter_map(|c| c.nick()).collect()
    }
}
