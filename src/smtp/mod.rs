//! SMTP server implementation

pub mod address;
pub mod auth;
pub mod backend;
pub mod commands;
pub mod config;
pub mod error;
pub mod framer;
pub mod message;
pub mod response;
pub mod server;
pub mod session;
pub mod sink;
pub mod tokenizer;
pub mod transport;

pub use auth::{AuthExchange, AuthMechanism, AuthState, AuthStep, PasswordLookup};
pub use backend::Backend;
pub use commands::SmtpHandler;
pub use config::SmtpConfig;
pub use error::SmtpError;
pub use framer::LineFramer;
pub use message::Message;
pub use response::SmtpResponse;
pub use server::SmtpServer;
pub use session::SmtpSession;
pub use sink::MessageSink;
pub use tokenizer::tokenize;
pub use transport::{BufferTransport, Transport};
