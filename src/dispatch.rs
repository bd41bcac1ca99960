//! Turns one framed line into replies and broadcasts.

use tracing::{info, warn};

use crate::conn::ConnId;
use crate::protocol::{self, Command, Hello};
use crate::registry::{RegisterError, Registry};

/// Whether the reactor should keep reading from a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Handles `line` (terminators already stripped) from connection `id`.
/// Unregistered connections go through the nickname handshake; registered
/// ones through the command set.
pub fn handle_line(reg: &mut Registry, id: ConnId, line: &str, max_nick_len: usize) -> Flow {
    let Some(conn) = reg.get(id) else {
        warn!(conn = %id, "line for unknown connection");
        return Flow::Continue;
    };

    match conn.nick().map(str::to_owned) {
        None => {
            handshake(reg, id, line, max_nick_len);
            // an unnamed peer may still leave; nobody is told
            if line.starts_with("/quit") {
                Flow::Close
            } else {
                Flow::Continue
            }
        }
        Some(nick) => dispatch(reg, id, &nick, line),
    }
}

fn handshake(reg: &mut Registry, id: ConnId, line: &str, max_nick_len: usize) {
    let name = match protocol::parse_hello(line) {
        Hello::Nick(name) => name,
        Hello::Other => {
            reg.send_to(id, protocol::PROMPT);
            return;
        }
    };

    if name.is_empty() || name.len() > max_nick_len {
        reg.send_to(id, protocol::INVALID_NICK);
        return;
    }

    match reg.register(id, name) {
        Ok(()) => {
            info!(conn = %id, nick = %name, "registered");
            reg.send_to(id, &protocol::welcome(name));
            reg.broadcast_except(id, &protocol::joined(name));
        }
        // the connection stays open and may try another name
        Err(RegisterError::Taken(_)) => {
            reg.send_to(id, protocol::NICK_TAKEN);
        }
        Err(e) => warn!(conn = %id, error = %e, "registration failed"),
    }
}

fn dispatch(reg: &mut Registry, id: ConnId, nick: &str, line: &str) -> Flow {
    let cmd = match protocol::parse_command(line) {
        Ok(cmd) => cmd,
        Err(e) => {
            reg.send_to(id, &e.reply());
            return Flow::Continue;
        }
    };

    match cmd {
        Command::Quit => {
            reg.broadcast_except(id, &protocol::departed(nick));
            return Flow::Close;
        }

        Command::List => {
            let mut reply = String::from(protocol::ROSTER_HEADER);
            for name in reg.roster() {
                reply.push_str(&protocol::roster_entry(name));
            }
            reg.send_to(id, &reply);
        }

        Command::Msg { to, text } => match reg.find_by_name(to) {
            None => {
                reg.send_to(id, protocol::USER_NOT_FOUND);
            }
            Some(dest) => {
                // the ack goes out even when the recipient took only part
                reg.send_to(dest, &protocol::private_from(nick, text));
                reg.send_to(id, &protocol::private_to(to, text));
            }
        },

        Command::Chat(text) => {
            reg.broadcast_except(id, &protocol::chat(nick, text));
        }
    }

    Flow::Continue
}
