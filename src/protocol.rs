//! Line grammar and the server's reply catalog.

pub const PROMPT: &str = "SERVER: please set nickname with: NICK <name>\n";
pub const INVALID_NICK: &str = "SERVER: invalid nickname\n";
pub const NICK_TAKEN: &str = "SERVER: username taken, disconnecting\n";
pub const ROSTER_HEADER: &str = "SERVER: active users:\n";
pub const USER_NOT_FOUND: &str = "SERVER: user not found\n";

/// What an unregistered connection may say.
#[derive(Debug, PartialEq, Eq)]
pub enum Hello<'a> {
    Nick(&'a str),
    Other,
}

pub fn parse_hello(line: &str) -> Hello<'_> {
    match line.strip_prefix("NICK ") {
        Some(name) => Hello::Nick(name),
        None => Hello::Other,
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Quit,
    List,
    Msg { to: &'a str, text: &'a str },
    Chat(&'a str),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("usage: /msg <user> <text>")]
    MsgUsage,
    #[error("empty message")]
    EmptyMessage,
    #[error("unknown command")]
    Unknown,
}

impl CommandError {
    pub fn reply(&self) -> String {
        format!("SERVER: {self}\n")
    }
}

/// Parses a line from a registered connection. `/quit` and `/list` match on
/// their five-byte prefix, so `/quitting` still quits.
pub fn parse_command(line: &str) -> Result<Command<'_>, CommandError> {
    if !line.starts_with('/') {
        return Ok(Command::Chat(line));
    }

    if line.starts_with("/quit") {
        return Ok(Command::Quit);
    }
    if line.starts_with("/list") {
        return Ok(Command::List);
    }

    let Some(args) = line.strip_prefix("/msg ") else {
        return Err(CommandError::Unknown);
    };

    let (to, rest) = args.split_once(' ').unwrap_or((args, ""));
    if to.is_empty() {
        return Err(CommandError::MsgUsage);
    }

    let text = rest.trim_start_matches(' ');
    if text.is_empty() {
        return Err(CommandError::EmptyMessage);
    }

    Ok(Command::Msg { to, text })
}

pub fn welcome(name: &str) -> String {
    format!("SERVER: welcome {name}\n")
}

pub fn joined(name: &str) -> String {
    format!("SERVER: {name} has joined\n")
}

pub fn departed(name: &str) -> String {
    format!("SERVER: {name} disconnected\n")
}

pub fn roster_entry(name: &str) -> String {
    format!(" - {name}\n")
}

pub fn private_from(sender: &str, text: &str) -> String {
    format!("[Private from {sender}]: {text}\n")
}

pub fn private_to(recipient: &str, text: &str) -> String {
    format!("[Private to {recipient}]: {text}\n")
}

pub fn chat(name: &str, text: &str) -> String {
    format!("[{name}]: {text}\n")
}
