//! Collaborators injected into every session

use std::fmt;
use std::sync::Arc;

use crate::smtp::auth::PasswordLookup;

/// Decides whether an address is accepted by MAIL or RCPT
pub type AddressFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// The password source plus optional sender and recipient filters.
///
/// Cheap to clone; every connection of a server holds one.
#[derive(Clone)]
pub struct Backend {
    passwords: Arc<dyn PasswordLookup>,
    sender_filter: Option<AddressFilter>,
    recipient_filter: Option<AddressFilter>,
}

impl Backend {
    pub fn new(passwords: impl PasswordLookup + 'static) -> Self {
        Self {
            passwords: Arc::new(passwords),
            sender_filter: None,
            recipient_filter: None,
        }
    }

    /// Only accept MAIL FROM addresses for which `filter` returns true
    pub fn with_sender_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.sender_filter = Some(Arc::new(filter));
        self
    }

    /// Only accept RCPT TO addresses for which `filter` returns true
    pub fn with_recipient_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.recipient_filter = Some(Arc::new(filter));
        self
    }

    pub fn passwords(&self) -> &dyn PasswordLookup {
        self.passwords.as_ref()
    }

    pub fn accepts_sender(&self, email: &str) -> bool {
        self.sender_filter.as_ref().is_none_or(|filter| filter(email))
    }

    pub fn accepts_recipient(&self, email: &str) -> bool {
        self.recipient_filter
            .as_ref()
            .is_none_or(|filter| filter(email))
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("sender_filter", &self.sender_filter.is_some())
            .field("recipient_filter", &self.recipient_filter.is_some())
            .finish_non_exhaustive()
    }
}
