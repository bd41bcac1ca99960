use std::fmt;
use std::io;
use std::net::SocketAddr;

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::framer::Framer;
use crate::outbound::{Outbound, deliver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something a reader task saw on its socket.
#[derive(Debug)]
pub enum Event {
    Data(ConnId, Bytes),
    Eof(ConnId),
    Failed(ConnId, io::Error),
}

/// One accepted socket: its nickname once registered, the unconsumed input
/// and the write side. Reading happens in a separate task that is aborted
/// when the connection is dropped, which also closes the transport.
pub struct Connection {
    id: ConnId,
    peer: Option<SocketAddr>,
    nick: Option<String>,
    pub(crate) framer: Framer,
    out: Box<dyn Outbound>,
    reader: Option<AbortHandle>,
}

impl Connection {
    pub fn new(id: ConnId, out: Box<dyn Outbound>, line_capacity: usize) -> Self {
        Self {
            id,
            peer: None,
            nick: None,
            framer: Framer::new(line_capacity),
            out,
            reader: None,
        }
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn set_reader(&mut self, reader: AbortHandle) {
        self.reader = Some(reader);
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn nick(&self) -> Option<&str> {
        self.nick.as_deref()
    }

    pub fn is_registered(&self) -> bool {
        self.nick.is_some()
    }

    /// Only the registry calls this, after checking uniqueness.
    pub(crate) fn assign_nick(&mut self, name: String) {
        debug_assert!(self.nick.is_none(), "nickname is set once");
        self.nick = Some(name);
    }

    pub fn send(&mut self, msg: &[u8]) -> usize {
        deliver(self.out.as_mut(), msg)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.out.close();
    }
}

/// Forwards whatever arrives on `reader` to the reactor until the peer hangs
/// up, the read fails, or the reactor goes away.
pub async fn read_loop(
    id: ConnId,
    mut reader: TcpStream,
    events: mpsc::Sender<Event>,
    chunk: usize,
) {
    let mut buf = vec![0u8; chunk.max(1)];

    loop {
        let event = match reader.read(&mut buf).await {
            Ok(0) => Event::Eof(id),
            Ok(n) => Event::Data(id, Bytes::copy_from_slice(&buf[..n])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => Event::Failed(id, e),
        };

        let last = !matches!(event, Event::Data(..));
        if events.send(event).await.is_err() || last {
            break;
        }
    }
}
