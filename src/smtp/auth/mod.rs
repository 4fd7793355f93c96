//! SASL authentication mechanisms for the AUTH command
//!
//! Three mechanisms are offered: PLAIN, LOGIN and CRAM-MD5. Each one decodes
//! the client's credential material and validates it against a password
//! obtained from a [`PasswordLookup`]. [`AuthExchange`] drives one AUTH
//! attempt through its challenge/response steps:
//!
//! ```text
//! Idle -> AwaitingResponse (334) -> Validated (235) | Failed (535)
//! ```
//!
//! PLAIN skips `AwaitingResponse` when the credentials arrive inline with
//! the AUTH command.

mod cram_md5;
mod login;
mod plain;

pub use cram_md5::CramMd5Auth;
pub use login::{LoginAuth, PASSWORD_PROMPT, USERNAME_PROMPT};
pub use plain::PlainAuth;

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

/// Source of account passwords.
///
/// Shared by every connection of a server, so implementations must be safe
/// to call concurrently. Returning `None` means the user does not exist.
pub trait PasswordLookup: Send + Sync {
    fn lookup_password(&self, user: &str) -> Option<String>;
}

impl<F> PasswordLookup for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn lookup_password(&self, user: &str) -> Option<String> {
        self(user)
    }
}

impl PasswordLookup for HashMap<String, String> {
    fn lookup_password(&self, user: &str) -> Option<String> {
        self.get(user).cloned()
    }
}

/// Common contract of the SASL mechanisms
pub trait Mechanism {
    /// Mechanism name as advertised in EHLO, e.g. `PLAIN`
    fn name(&self) -> &'static str;

    /// Absorb one base64 token of credential material
    fn decode(&mut self, token: &str);

    /// Check the decoded credentials against the stored password
    fn validate(&self, passwords: &dyn PasswordLookup) -> bool;
}

/// The mechanism selected by an AUTH command
#[derive(Debug, Clone)]
pub enum AuthMechanism {
    Plain(PlainAuth),
    Login(LoginAuth),
    CramMd5(CramMd5Auth),
}

impl AuthMechanism {
    /// Mechanism list advertised in the EHLO reply
    pub const ADVERTISED: &'static str = "AUTH PLAIN LOGIN CRAM-MD5";

    /// Create a mechanism from its case-insensitive name.
    ///
    /// `domain` is only used by CRAM-MD5 to build its challenge.
    pub fn from_name(name: &str, domain: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "plain" => Some(Self::Plain(PlainAuth::new())),
            "login" => Some(Self::Login(LoginAuth::new())),
            "cram-md5" => Some(Self::CramMd5(CramMd5Auth::new(domain))),
            _ => None,
        }
    }

    /// Text of the first 334 continuation for this mechanism
    pub fn initial_challenge(&self) -> String {
        match self {
            Self::Plain(_) => String::new(),
            Self::Login(_) => USERNAME_PROMPT.to_owned(),
            Self::CramMd5(auth) => auth.encoded_challenge(),
        }
    }

    /// The user name decoded so far, if any
    pub fn user(&self) -> Option<&str> {
        match self {
            Self::Plain(auth) => Some(auth.user()),
            Self::Login(auth) => auth.user(),
            Self::CramMd5(auth) => Some(auth.user()),
        }
        .filter(|user| !user.is_empty())
    }

    fn as_mechanism(&self) -> &dyn Mechanism {
        match self {
            Self::Plain(auth) => auth,
            Self::Login(auth) => auth,
            Self::CramMd5(auth) => auth,
        }
    }

    fn as_mechanism_mut(&mut self) -> &mut dyn Mechanism {
        match self {
            Self::Plain(auth) => auth,
            Self::Login(auth) => auth,
            Self::CramMd5(auth) => auth,
        }
    }
}

impl Mechanism for AuthMechanism {
    fn name(&self) -> &'static str {
        self.as_mechanism().name()
    }

    fn decode(&mut self, token: &str) {
        self.as_mechanism_mut().decode(token);
    }

    fn validate(&self, passwords: &dyn PasswordLookup) -> bool {
        self.as_mechanism().validate(passwords)
    }
}

/// Progress of an [`AuthExchange`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    AwaitingResponse,
    Validated,
    Failed,
}

/// Outcome of one step of an exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStep {
    /// Send a 334 continuation with this text and wait for the next line
    Challenge(String),
    /// Credentials accepted (235)
    Success,
    /// Credentials rejected (535)
    Failure,
}

/// One AUTH attempt. A new exchange is created for every AUTH command.
#[derive(Debug, Clone)]
pub struct AuthExchange {
    mechanism: AuthMechanism,
    state: AuthState,
}

impl AuthExchange {
    pub fn new(mechanism: AuthMechanism) -> Self {
        Self {
            mechanism,
            state: AuthState::Idle,
        }
    }

    pub fn mechanism(&self) -> &AuthMechanism {
        &self.mechanism
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Whether the next non-command line belongs to this exchange
    pub fn is_awaiting_response(&self) -> bool {
        self.state == AuthState::AwaitingResponse
    }

    /// Begin the exchange.
    ///
    /// An initial response is only honoured by PLAIN; the other mechanisms
    /// always start with a challenge.
    pub fn start(
        &mut self,
        initial_response: Option<&str>,
        passwords: &dyn PasswordLookup,
    ) -> AuthStep {
        match initial_response.filter(|token| !token.is_empty()) {
            Some(token) if matches!(self.mechanism, AuthMechanism::Plain(_)) => {
                self.complete(token, passwords)
            }
            _ => {
                self.state = AuthState::AwaitingResponse;
                AuthStep::Challenge(self.mechanism.initial_challenge())
            }
        }
    }

    /// Feed one client line into an exchange that is awaiting a response.
    ///
    /// Returns `None` when the exchange is not waiting for input.
    pub fn respond(&mut self, line: &str, passwords: &dyn PasswordLookup) -> Option<AuthStep> {
        if !self.is_awaiting_response() {
            return None;
        }

        if let AuthMechanism::Login(login) = &mut self.mechanism {
            if !login.has_user() {
                login.decode(line);
                return Some(AuthStep::Challenge(PASSWORD_PROMPT.to_owned()));
            }
        }

        Some(self.complete(line, passwords))
    }

    fn complete(&mut self, token: &str, passwords: &dyn PasswordLookup) -> AuthStep {
        self.mechanism.decode(token);
        if self.mechanism.validate(passwords) {
            self.state = AuthState::Validated;
            AuthStep::Success
        } else {
            self.state = AuthState::Failed;
            AuthStep::Failure
        }
    }
}

/// Lenient base64 decoding: malformed input decodes to nothing, which then
/// fails validation.
pub(crate) fn decode_base64(token: &str) -> Vec<u8> {
    match STANDARD.decode(token.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "Undecodable SASL token");
            Vec::new()
        }
    }
}

/// Case-sensitive comparison against the stored password.
/// Unknown users never validate.
pub(crate) fn password_matches(
    passwords: &dyn PasswordLookup,
    user: &str,
    password: &str,
) -> bool {
    passwords
        .lookup_password(user)
        .is_some_and(|stored| stored == password)
}
