//! Accepted message value object

use std::time::SystemTime;

use indexmap::IndexMap;
use uuid::Uuid;

/// A message accepted at the end of a DATA sequence.
///
/// Built exactly once per completed DATA and never modified afterwards.
#[derive(Debug, Clone)]
pub struct Message {
    from: String,
    recipients: IndexMap<String, String>,
    body: String,
    session_id: Uuid,
    received_at: SystemTime,
}

impl Message {
    pub fn new(
        from: String,
        recipients: IndexMap<String, String>,
        body: String,
        session_id: Uuid,
    ) -> Self {
        Self {
            from,
            recipients,
            body,
            session_id,
            received_at: SystemTime::now(),
        }
    }

    /// The envelope sender
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Recipients in the order they were given, mapped to their display names
    pub fn recipients(&self) -> &IndexMap<String, String> {
        &self.recipients
    }

    /// Message text with lines joined by CRLF, without the final delimiter
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The connection that delivered this message
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn received_at(&self) -> SystemTime {
        self.received_at
    }

    /// Check if this message was sent to a specific recipient
    pub fn has_recipient(&self, email: &str) -> bool {
        self.recipients.contains_key(email)
    }

    /// Display name given for a recipient, if any
    pub fn recipient_name(&self, email: &str) -> Option<&str> {
        self.recipients
            .get(email)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Get the subject line from the message headers (if present)
    pub fn subject(&self) -> Option<&str> {
        for line in self.body.lines() {
            if line.is_empty() {
                // End of headers
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("subject") {
                    return Some(value.trim());
                }
            }
        }
        None
    }
}
