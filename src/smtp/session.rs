//! SMTP session state management

use indexmap::IndexMap;
use uuid::Uuid;

use crate::smtp::auth::AuthExchange;
use crate::smtp::error::SmtpError;
use crate::smtp::message::Message;

const DELIMITER: &str = "\r\n";

/// Per-connection state, owned by exactly one handler
#[derive(Debug)]
pub struct SmtpSession {
    /// Random identifier of this connection
    pub id: Uuid,
    /// HELO or EHLO seen
    pub greeted: bool,
    /// Client domain from HELO/EHLO
    pub client_domain: Option<String>,
    /// Most recent AUTH attempt
    pub auth: Option<AuthExchange>,
    /// Set once an AUTH attempt validates; gates MAIL, RCPT and DATA
    pub authenticated: bool,
    /// Sender address from MAIL
    pub mail_from: Option<String>,
    /// Recipient address to display name, in order of first appearance
    pub recipients: IndexMap<String, String>,
    /// Collecting message text
    pub data_mode: bool,
    /// Message text received so far, each line followed by CRLF
    pub body: String,
}

impl SmtpSession {
    /// Create a new SMTP session
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            greeted: false,
            client_domain: None,
            auth: None,
            authenticated: false,
            mail_from: None,
            recipients: IndexMap::new(),
            data_mode: false,
            body: String::new(),
        }
    }

    /// Record the client greeting
    pub fn greet(&mut self, domain: &str) {
        self.greeted = true;
        self.client_domain = Some(domain.to_owned());
    }

    /// Whether the next line belongs to an unfinished AUTH exchange
    pub fn auth_in_progress(&self) -> bool {
        !self.data_mode
            && self
                .auth
                .as_ref()
                .is_some_and(AuthExchange::is_awaiting_response)
    }

    /// Clear the mail transaction, keeping greeting and authentication
    pub fn reset(&mut self) {
        self.mail_from = None;
        self.recipients.clear();
        self.data_mode = false;
        self.body.clear();
    }

    /// Set the sender address, starting a new transaction
    pub fn set_sender(&mut self, sender: String) {
        self.reset();
        self.mail_from = Some(sender);
    }

    /// Add a recipient; a repeated address keeps its position and takes the new name
    pub fn add_recipient(&mut self, email: String, name: String) {
        self.recipients.insert(email, name);
    }

    /// Start data collection mode
    pub fn start_data_mode(&mut self) -> Result<(), SmtpError> {
        if self.mail_from.is_none() {
            return Err(SmtpError::BadSequence("DATA requires MAIL first".to_owned()));
        }

        self.data_mode = true;
        self.body.clear();
        Ok(())
    }

    /// Add a line of message text, followed by CRLF.
    ///
    /// Unlike a literal append, a leading dot added by the client for
    /// transparency (RFC 5321 section 4.5.2) is removed, so `..x` is stored
    /// as `.x`.
    pub fn add_data_line(&mut self, line: &str) {
        let line = if line.starts_with("..") { &line[1..] } else { line };
        self.body.push_str(line);
        self.body.push_str(DELIMITER);
    }

    /// Finish data collection and build the message
    pub fn finish_data_collection(&mut self) -> Result<Message, SmtpError> {
        if !self.data_mode {
            return Err(SmtpError::BadSequence(
                "Not in data collection mode".to_owned(),
            ));
        }

        let from = self
            .mail_from
            .take()
            .ok_or_else(|| SmtpError::BadSequence("No sender specified".to_owned()))?;

        let mut body = std::mem::take(&mut self.body);
        if body.ends_with(DELIMITER) {
            body.truncate(body.len() - DELIMITER.len());
        }

        let message = Message::new(from, std::mem::take(&mut self.recipients), body, self.id);
        self.reset();
        Ok(message)
    }
}

impl Default for SmtpSession {
    fn default() -> Self {
        Self::new()
    }
}
