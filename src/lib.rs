//! # Mailgate
//!
//! Mailgate is an embeddable SMTP server engine with SASL authentication.
//!
//! Clients must authenticate with `AUTH PLAIN`, `AUTH LOGIN` or
//! `AUTH CRAM-MD5` before a message is accepted. Accepted messages are
//! handed to a [`MessageSink`]; passwords come from a [`PasswordLookup`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mailgate::{Backend, Message, SmtpConfig, SmtpServer};
//! use std::sync::mpsc;
//! use std::thread;
//! use std::time::Duration;
//!
//! let backend = Backend::new(|user: &str| (user == "alice").then(|| "secret".to_owned()));
//! let server = SmtpServer::new(SmtpConfig::new("mail.example.org"), backend);
//!
//! let (tx, rx) = mpsc::channel::<Message>();
//! thread::spawn(move || {
//!     server.start("127.0.0.1:2525", tx).unwrap();
//! });
//!
//! // Application sends mail to localhost:2525 as alice
//! // ...
//!
//! if let Ok(message) = rx.recv_timeout(Duration::from_secs(1)) {
//!     println!("Received message from: {}", message.from());
//! }
//! ```
//!
//! ## Supported SMTP commands
//!
//! - `HELO` / `EHLO` - Identify the client
//! - `AUTH` - Authenticate (PLAIN, LOGIN, CRAM-MD5)
//! - `MAIL FROM` - Specify the sender's address
//! - `RCPT TO` - Specify a recipient, optionally with a display name
//! - `DATA` - Send the message text
//! - `RSET` - Reset the current transaction
//! - `NOOP` - Do nothing
//! - `HELP` - List the commands
//! - `QUIT` - Close connection
//!
//! `MAIL`, `RCPT` and `DATA` are answered with `500` until the client has
//! authenticated.
//!
//! ## Embedding without TCP
//!
//! [`SmtpHandler`] is the per-connection state machine. It takes bytes through
//! [`SmtpHandler::feed`] and writes replies to any [`Transport`], so it can be
//! driven from tests or another I/O layer.
//!
//! ## Notes
//!
//! - Runs in-memory only. Message persistence is not supported.
//! - SSL/TLS connection is not supported.
//! - Mail relay is not supported.

pub mod smtp;

pub use smtp::{
    AuthMechanism, Backend, LineFramer, Message, MessageSink, PasswordLookup, SmtpConfig,
    SmtpError, SmtpHandler, SmtpResponse, SmtpServer, SmtpSession, Transport,
};
