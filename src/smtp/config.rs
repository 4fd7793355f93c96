//! Server configuration

use std::time::Duration;

use crate::smtp::framer::DEFAULT_LINE_LIMIT;

/// Settings shared by every connection of a server
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// Fully-qualified server name, used in HELO/EHLO replies and CRAM-MD5 challenges
    pub domain: String,
    /// Text of the 220 greeting
    pub banner: String,
    /// Maximum line length accepted from clients, excluding CRLF
    pub line_limit: usize,
    /// Close connections that stay silent this long. `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

impl SmtpConfig {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_owned(),
            ..Self::default()
        }
    }

    pub fn with_banner(mut self, banner: &str) -> Self {
        self.banner = banner.to_owned();
        self
    }

    pub fn with_line_limit(mut self, line_limit: usize) -> Self {
        self.line_limit = line_limit;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = Some(idle_timeout);
        self
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            domain: "localhost".to_owned(),
            banner: "Welcome to Mailgate SMTP Server".to_owned(),
            line_limit: DEFAULT_LINE_LIMIT,
            idle_timeout: None,
        }
    }
}
