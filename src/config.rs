use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Args;

pub const DEFAULT_PORT: u16 = 9090;
pub const DEFAULT_MAX_CONNECTIONS: usize = 10_000;
pub const DEFAULT_LINE_CAPACITY: usize = 4096;
pub const DEFAULT_MAX_NICK_LEN: usize = 31;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("line capacity must be at least 2 bytes, got {0}")]
    LineCapacity(usize),
    #[error("max connections must be greater than zero")]
    MaxConnections,
    #[error("max nickname length must be greater than zero")]
    MaxNickLen,
}

/// Server settings, read from flags or `CHAT_*` environment variables.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "CHAT_LISTEN", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub listen: IpAddr,

    /// TCP port to listen on
    #[arg(long, short, env = "CHAT_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Connections above this count are closed right after accept
    #[arg(long, env = "CHAT_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,

    /// Per-connection inbound buffer size in bytes, terminator included
    #[arg(long, env = "CHAT_LINE_CAPACITY", default_value_t = DEFAULT_LINE_CAPACITY)]
    pub line_capacity: usize,

    /// Longest accepted nickname in bytes
    #[arg(long, env = "CHAT_MAX_NICK_LEN", default_value_t = DEFAULT_MAX_NICK_LEN)]
    pub max_nick_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            line_capacity: DEFAULT_LINE_CAPACITY,
            max_nick_len: DEFAULT_MAX_NICK_LEN,
        }
    }
}

impl Config {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.line_capacity < 2 {
            return Err(ConfigError::LineCapacity(self.line_capacity));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::MaxConnections);
        }
        if self.max_nick_len == 0 {
            return Err(ConfigError::MaxNickLen);
        }
        Ok(())
    }
}
