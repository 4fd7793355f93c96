//! TCP front end: accepts connections and drives one handler per client

use crate::smtp::backend::Backend;
use crate::smtp::commands::SmtpHandler;
use crate::smtp::config::SmtpConfig;
use crate::smtp::error::SmtpError;
use crate::smtp::sink::MessageSink;

use std::io::{ErrorKind, Read};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use tracing::{debug, error, info, warn};

const READ_BUFFER_SIZE: usize = 4096;

/// SMTP server that hands accepted messages to a [`MessageSink`]
#[derive(Debug, Clone)]
pub struct SmtpServer {
    config: Arc<SmtpConfig>,
    backend: Backend,
}

impl SmtpServer {
    /// Create a new SMTP server
    pub fn new(config: SmtpConfig, backend: Backend) -> Self {
        Self {
            config: Arc::new(config),
            backend,
        }
    }

    pub fn config(&self) -> &SmtpConfig {
        &self.config
    }

    /// Start the server on the specified address (blocking).
    /// Messages are handed to `sink` as they are received.
    pub fn start<S>(&self, addr: &str, sink: S) -> Result<(), SmtpError>
    where
        S: MessageSink + Clone + Send + 'static,
    {
        let listener = TcpListener::bind(addr)?;
        self.start_with_listener(listener, sink)
    }

    /// Start the server with an existing listener (blocking).
    /// Messages are handed to `sink` as they are received.
    pub fn start_with_listener<S>(&self, listener: TcpListener, sink: S) -> Result<(), SmtpError>
    where
        S: MessageSink + Clone + Send + 'static,
    {
        info!(
            addr = %listener.local_addr()?,
            domain = %self.config.domain,
            "SMTP server listening"
        );

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => self.spawn_client(stream, sink.clone()),
                Err(e) => warn!(error = %e, "Error accepting connection"),
            }
        }

        Ok(())
    }

    /// Run a client on its own thread
    fn spawn_client<S>(&self, stream: TcpStream, sink: S)
    where
        S: MessageSink + Send + 'static,
    {
        let server = self.clone();
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_owned());

        let spawned = thread::Builder::new()
            .name(format!("smtp-{peer}"))
            .spawn(move || {
                if let Err(e) = server.handle_client(stream, sink) {
                    warn!(peer = %peer, error = %e, "Error handling client");
                }
            });

        if let Err(e) = spawned {
            error!(error = %e, "Failed to spawn client thread");
        }
    }

    /// Handle a client connection until QUIT, disconnect or idle timeout
    pub fn handle_client<S: MessageSink>(&self, stream: TcpStream, sink: S) -> Result<(), SmtpError> {
        if let Some(timeout) = self.config.idle_timeout {
            stream.set_read_timeout(Some(timeout))?;
        }

        let mut reader = stream.try_clone()?;
        let mut handler =
            SmtpHandler::new(Arc::clone(&self.config), self.backend.clone(), stream, sink)?;
        let mut buffer = [0u8; READ_BUFFER_SIZE];

        while !handler.is_closed() {
            match reader.read(&mut buffer) {
                Ok(0) => {
                    debug!(session = %handler.id(), "Client disconnected");
                    break;
                }
                Ok(n) => handler.feed(&buffer[..n])?,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    handler.idle_timeout()?;
                    break;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }
}
