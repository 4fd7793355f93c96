//! SMTP reply encoding

use std::fmt::Write;

/// An SMTP reply: a numeric code and one or more text lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpResponse {
    /// The SMTP reply code (e.g. 250, 334, 500)
    pub code: u16,
    /// Text lines; multi-line replies have more than one
    pub lines: Vec<String>,
}

impl SmtpResponse {
    /// Create a single-line reply
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            lines: vec![message.into()],
        }
    }

    /// Create a multi-line reply
    pub fn new_multiline(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// 250 OK
    pub fn ok() -> Self {
        Self::new(250, "OK")
    }

    /// Greeting sent when a connection opens (220)
    pub fn greeting(banner: &str) -> Self {
        Self::new(220, banner)
    }

    /// HELO reply (250)
    pub fn helo(hostname: &str, client_domain: &str, remote: &str) -> Self {
        Self::new(250, format!("{hostname} Hello {client_domain} @ {remote}"))
    }

    /// EHLO reply (250) listing the supported extensions
    pub fn ehlo(hostname: &str, client_domain: &str, remote: &str, capabilities: &[&str]) -> Self {
        let mut lines = vec![format!("{hostname} Hello {client_domain} @ {remote}")];
        lines.extend(capabilities.iter().map(|&cap| cap.to_owned()));
        Self::new_multiline(250, lines)
    }

    /// 334 continuation carrying a (possibly empty) base64 challenge
    pub fn auth_challenge(challenge: impl Into<String>) -> Self {
        Self::new(334, challenge)
    }

    /// 235 authentication succeeded
    pub fn auth_success() -> Self {
        Self::new(235, "2.7.0 Authentication successful")
    }

    /// DATA intermediate reply (354)
    pub fn data_start() -> Self {
        Self::new(354, "Enter message, end with <CRLF>.<CRLF>")
    }

    /// QUIT reply (221)
    pub fn quit() -> Self {
        Self::new(221, "Goodbye.")
    }

    /// Sent before dropping an idle connection (421)
    pub fn idle_timeout(hostname: &str) -> Self {
        Self::new(421, format!("{hostname} Idle timeout, closing connection"))
    }

    /// Format the reply for sending over the wire.
    ///
    /// All lines but the last use `code-text`, the last uses `code text`.
    pub fn format(&self) -> String {
        let mut result = String::new();
        let last = self.lines.len().saturating_sub(1);
        for (i, line) in self.lines.iter().enumerate() {
            let separator = if i == last { ' ' } else { '-' };
            // Writing to a String cannot fail
            let _ = write!(result, "{}{}{}\r\n", self.code, separator, line);
        }
        if self.lines.is_empty() {
            let _ = write!(result, "{} \r\n", self.code);
        }
        result
    }

    /// Check if this is a success reply (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Check if this is an intermediate reply (3xx)
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }

    /// Check if this is an error reply (4xx or 5xx)
    pub fn is_error(&self) -> bool {
        (400..600).contains(&self.code)
    }
}
