use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::conn::{ConnId, Connection, Event, read_loop};
use crate::dispatch::{Flow, handle_line};
use crate::framer::line_text;
use crate::protocol;
use crate::registry::Registry;

const EVENT_QUEUE: usize = 1024;
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The event loop. One task owns the registry; reader tasks only forward
/// what they read, so every registry change happens here, in order.
pub struct Server {
    config: Config,
    listener: TcpListener,
    registry: Registry,
    events_tx: mpsc::Sender<Event>,
    events_rx: mpsc::Receiver<Event>,
    next_id: u64,
}

impl Server {
    pub async fn bind(config: Config) -> Result<Self> {
        config.validate()?;

        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {addr}"))?;

        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);

        Ok(Self {
            config,
            listener,
            registry: Registry::default(),
            events_tx,
            events_rx,
            next_id: 0,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs until the task is dropped.
    pub async fn run(mut self) -> Result<()> {
        info!(addr = %self.local_addr()?, "listening");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer)) => self.on_accept(socket, peer),
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        if !is_transient(&e) {
                            // e.g. out of descriptors; don't spin on it
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                        }
                    }
                },

                Some(event) = self.events_rx.recv() => self.on_event(event),
            }
        }
    }

    fn on_accept(&mut self, socket: TcpStream, peer: SocketAddr) {
        if self.registry.len() >= self.config.max_connections {
            warn!(%peer, limit = self.config.max_connections, "connection limit reached, closing");
            return;
        }

        let (reader, writer) = match split(socket) {
            Ok(halves) => halves,
            Err(e) => {
                warn!(%peer, error = %e, "could not set up connection");
                return;
            }
        };

        let id = ConnId(self.next_id);
        self.next_id += 1;

        let capacity = self.config.line_capacity;
        let mut conn = Connection::new(id, Box::new(writer), capacity).with_peer(peer);
        let task = tokio::spawn(read_loop(id, reader, self.events_tx.clone(), capacity));
        conn.set_reader(task.abort_handle());

        self.registry.insert(conn);
        info!(conn = %id, %peer, "accepted");

        self.registry.send_to(id, protocol::PROMPT);
    }

    fn on_event(&mut self, event: Event) {
        match event {
            Event::Data(id, bytes) => self.on_data(id, &bytes),
            Event::Eof(id) => self.hang_up(id),
            Event::Failed(id, e) => {
                debug!(conn = %id, error = %e, "read failed");
                self.teardown(id);
            }
        }
    }

    fn on_data(&mut self, id: ConnId, mut rest: &[u8]) {
        let max_nick = self.config.max_nick_len;

        while !rest.is_empty() {
            let Some(conn) = self.registry.get_mut(id) else {
                // queued before the connection was torn down
                debug!(conn = %id, "data for closed connection");
                return;
            };
            let taken = conn.framer.feed(rest);
            rest = &rest[taken..];

            while let Some(line) = self.registry.get_mut(id).and_then(|c| c.framer.next_line()) {
                let text = line_text(&line);
                if handle_line(&mut self.registry, id, &text, max_nick) == Flow::Close {
                    self.teardown(id);
                    return;
                }
            }

            if let Some(Err(e)) = self.registry.get(id).map(|c| c.framer.check_overflow()) {
                warn!(conn = %id, error = %e, "dropping connection");
                self.hang_up(id);
                return;
            }
        }
    }

    /// Peer went away: tell the others if it had a name, then close.
    fn hang_up(&mut self, id: ConnId) {
        let Some(conn) = self.registry.remove(id) else {
            debug!(conn = %id, "hang-up for closed connection");
            return;
        };
        if let Some(nick) = conn.nick() {
            self.registry.broadcast_except(id, &protocol::departed(nick));
        }
        info!(
            conn = %id,
            peer = ?conn.peer(),
            nick = conn.nick().unwrap_or("<unnamed>"),
            "disconnected"
        );
    }

    fn teardown(&mut self, id: ConnId) {
        if let Some(conn) = self.registry.remove(id) {
            info!(
                conn = %id,
                peer = ?conn.peer(),
                nick = conn.nick().unwrap_or("<unnamed>"),
                "removed"
            );
        }
    }
}

/// Splits an accepted socket into a runtime-driven reader and a plain
/// non-blocking writer sharing the same socket.
fn split(socket: TcpStream) -> io::Result<(TcpStream, std::net::TcpStream)> {
    let stream = socket.into_std()?;
    stream.set_nonblocking(true)?;
    let writer = stream.try_clone()?;
    let reader = TcpStream::from_std(stream)?;
    Ok((reader, writer))
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}
