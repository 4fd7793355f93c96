//! AUTH PLAIN (RFC 4616)

use std::fmt;

use crate::smtp::auth::{Mechanism, PasswordLookup, decode_base64, password_matches};

/// PLAIN credentials: `base64(authzid NUL user NUL password)` in a single
/// message, either inline with AUTH or after an empty 334 prompt.
#[derive(Clone, Default)]
pub struct PlainAuth {
    user: String,
    password: String,
}

impl PlainAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

impl Mechanism for PlainAuth {
    fn name(&self) -> &'static str {
        "PLAIN"
    }

    fn decode(&mut self, token: &str) {
        let data = decode_base64(token);
        let mut parts = data.splitn(3, |&b| b == 0).skip(1);
        self.user = parts
            .next()
            .map(|part| String::from_utf8_lossy(part).into_owned())
            .unwrap_or_default();
        self.password = parts
            .next()
            .map(|part| String::from_utf8_lossy(part).into_owned())
            .unwrap_or_default();
    }

    fn validate(&self, passwords: &dyn PasswordLookup) -> bool {
        password_matches(passwords, &self.user, &self.password)
    }
}

impl fmt::Debug for PlainAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainAuth")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}
