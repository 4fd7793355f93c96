//! Output side of a connection

use std::io::{self, Write};
use std::net::{Shutdown, TcpStream};

/// Where replies go. The engine never reads from the transport; incoming
/// bytes are pushed into it by whoever owns the socket.
pub trait Transport {
    /// Send bytes to the client
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Send bytes, then close the connection
    fn end(&mut self, data: &[u8]) -> io::Result<()>;

    /// Peer address shown in HELO/EHLO replies
    fn remote_address(&self) -> String;
}

impl Transport for TcpStream {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.write_all(data)?;
        self.flush()
    }

    fn end(&mut self, data: &[u8]) -> io::Result<()> {
        Transport::write(self, data)?;
        match self.shutdown(Shutdown::Both) {
            // Peer may already be gone
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }

    fn remote_address(&self) -> String {
        self.peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_owned())
    }
}

/// In-memory transport recording everything written to it
#[derive(Debug, Clone, Default)]
pub struct BufferTransport {
    pub output: Vec<u8>,
    pub closed: bool,
    pub remote: String,
}

impl BufferTransport {
    pub fn new(remote: &str) -> Self {
        Self {
            remote: remote.to_owned(),
            ..Self::default()
        }
    }

    /// Everything written so far, decoded as text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Take the written output, leaving the buffer empty
    pub fn take_text(&mut self) -> String {
        let text = self.text();
        self.output.clear();
        text
    }
}

impl Transport for BufferTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }
        self.output.extend_from_slice(data);
        Ok(())
    }

    fn end(&mut self, data: &[u8]) -> io::Result<()> {
        self.write(data)?;
        self.closed = true;
        Ok(())
    }

    fn remote_address(&self) -> String {
        self.remote.clone()
    }
}
