//! Consumers of session output

use std::sync::mpsc;

use tracing::{debug, error};

use crate::smtp::error::SmtpError;
use crate::smtp::message::Message;

/// Receives accepted messages and unexpected faults from a session
pub trait MessageSink {
    /// Called exactly once per completed DATA sequence
    fn on_message(&self, message: Message);

    /// Called for faults that are not ordinary protocol errors
    fn on_error(&self, err: &SmtpError) {
        error!(error = %err, "Session fault");
    }
}

impl MessageSink for mpsc::Sender<Message> {
    fn on_message(&self, message: Message) {
        // Fails only when nobody is listening
        if self.send(message).is_err() {
            debug!("Message dropped, receiver is gone");
        }
    }
}
