//! A line-oriented TCP chat server.
//!
//! Clients pick a nickname with `NICK <name>`, then chat with everyone,
//! whisper with `/msg <user> <text>`, list users with `/list` and leave with
//! `/quit`. A single task owns every connection; see [`server::Server`].

pub mod config;
pub mod conn;
pub mod directory;
pub mod dispatch;
pub mod framer;
pub mod outbound;
pub mod protocol;
pub mod registry;
pub mod server;

pub use config::Config;
pub use server::Server;
