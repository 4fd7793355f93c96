//! AUTH LOGIN

use std::fmt;

use crate::smtp::auth::{Mechanism, PasswordLookup, decode_base64, password_matches};

/// `base64("Username:")`
pub const USERNAME_PROMPT: &str = "VXNlcm5hbWU6";

/// `base64("Password:")`
pub const PASSWORD_PROMPT: &str = "UGFzc3dvcmQ6";

/// LOGIN credentials, collected over two continuation steps: first the
/// base64 user name, then the base64 password.
#[derive(Clone, Default)]
pub struct LoginAuth {
    user: Option<String>,
    password: Option<String>,
}

impl LoginAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn has_user(&self) -> bool {
        self.user.is_some()
    }

    pub fn set_user(&mut self, token: &str) {
        self.user = Some(decode_text(token));
    }

    pub fn set_password(&mut self, token: &str) {
        self.password = Some(decode_text(token));
    }
}

impl Mechanism for LoginAuth {
    fn name(&self) -> &'static str {
        "LOGIN"
    }

    /// Fills the user slot first, then the password slot
    fn decode(&mut self, token: &str) {
        if self.user.is_none() {
            self.set_user(token);
        } else {
            self.set_password(token);
        }
    }

    fn validate(&self, passwords: &dyn PasswordLookup) -> bool {
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => password_matches(passwords, user, password),
            _ => false,
        }
    }
}

impl fmt::Debug for LoginAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginAuth")
            .field("user", &self.user)
            .field("has_password", &self.password.is_some())
            .finish()
    }
}

fn decode_text(token: &str) -> String {
    String::from_utf8_lossy(&decode_base64(token)).into_owned()
}
