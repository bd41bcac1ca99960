//! Non-blocking write path.
//!
//! Output is never queued: whatever the transport refuses right now is
//! dropped, so slow readers may see truncated messages.

use std::io::{self, Write};
use std::net::{Shutdown, TcpStream};

use tracing::debug;

pub trait Outbound: Send {
    /// Writes without waiting; `WouldBlock` when nothing fits.
    fn try_send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Closes the transport in both directions.
    fn close(&mut self) {}
}

/// A non-blocking std stream writes straight through to the socket, so
/// nothing depends on the runtime having seen a writable event yet.
impl Outbound for TcpStream {
    fn try_send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write(buf)
    }

    fn close(&mut self) {
        let _ = self.shutdown(Shutdown::Both);
    }
}

/// Pushes `msg` into `out` until it is all written or the transport stops
/// taking bytes. Returns the number of bytes accepted.
pub fn deliver(out: &mut dyn Outbound, msg: &[u8]) -> usize {
    let mut sent = 0;
    while sent < msg.len() {
        match out.try_send(&msg[sent..]) {
            Ok(0) => break,
            Ok(n) => sent += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                debug!(sent, dropped = msg.len() - sent, "outbound full, dropping remainder");
                break;
            }
            Err(e) => {
                debug!(error = %e, "write failed");
                break;
            }
        }
    }
    sent
}
