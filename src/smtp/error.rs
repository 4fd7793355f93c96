//! Error types for the SMTP engine

use thiserror::Error;

use crate::smtp::response::SmtpResponse;

#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Syntax error, command unrecognized")]
    CommandUnrecognized,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Syntax error in parameters or arguments")]
    InvalidParameters,

    #[error("Unrecognized authentication type: {0}")]
    UnsupportedMechanism(String),

    #[error("Authentication credentials invalid")]
    AuthenticationFailed,

    #[error("Bad sequence of commands: {0}")]
    BadSequence(String),

    #[error("Address rejected: {0}")]
    Rejected(String),

    #[error("Line length limit exceeded (max {max} bytes)")]
    LineTooLong { max: usize },

    #[error("Connection closed")]
    ConnectionClosed,
}

/// Maps SMTP errors to reply codes
impl SmtpError {
    pub fn code(&self) -> u16 {
        match self {
            SmtpError::Io(_) => 421,
            SmtpError::CommandUnrecognized => 500,
            SmtpError::InvalidArgument(_) => 500,
            SmtpError::InvalidParameters => 501,
            SmtpError::UnsupportedMechanism(_) => 504,
            SmtpError::AuthenticationFailed => 535,
            SmtpError::BadSequence(_) => 503,
            SmtpError::Rejected(_) => 550,
            SmtpError::LineTooLong { .. } => 500,
            SmtpError::ConnectionClosed => 421,
        }
    }

    pub fn to_response_message(&self) -> String {
        match self {
            SmtpError::Io(_) => "Service not available".to_owned(),
            SmtpError::InvalidArgument(text) => text.clone(),
            SmtpError::UnsupportedMechanism(_) => "Unrecognized authentication type".to_owned(),
            SmtpError::Rejected(address) => format!("<{address}> rejected"),
            SmtpError::LineTooLong { .. } => "Line length limit exceeded".to_owned(),
            other => other.to_string(),
        }
    }

    /// The reply sent to the client for this error
    pub fn to_response(&self) -> SmtpResponse {
        SmtpResponse::new(self.code(), self.to_response_message())
    }

    /// Whether the connection can no longer be used
    pub fn is_fatal(&self) -> bool {
        matches!(self, SmtpError::Io(_) | SmtpError::ConnectionClosed)
    }
}
