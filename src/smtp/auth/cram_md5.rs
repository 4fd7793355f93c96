//! AUTH CRAM-MD5 (RFC 2195)

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use md5::Md5;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::smtp::auth::{Mechanism, PasswordLookup, decode_base64};

type HmacMd5 = Hmac<Md5>;

/// CRAM-MD5 challenge/response.
///
/// The challenge `<hex(32 random bytes)@domain>` is fixed when the mechanism
/// is created. The client answers with `base64(user SP hex-digest)` where the
/// digest is HMAC-MD5 of the challenge keyed by the account password.
#[derive(Clone)]
pub struct CramMd5Auth {
    challenge: String,
    user: String,
    digest: String,
}

impl CramMd5Auth {
    pub fn new(domain: &str) -> Self {
        let mut random = [0u8; 32];
        OsRng.fill_bytes(&mut random);

        Self {
            challenge: format!("<{}@{}>", hex::encode(random), domain),
            user: String::new(),
            digest: String::new(),
        }
    }

    /// The raw challenge text
    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    /// The challenge as sent in the 334 continuation
    pub fn encoded_challenge(&self) -> String {
        STANDARD.encode(&self.challenge)
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

impl Mechanism for CramMd5Auth {
    fn name(&self) -> &'static str {
        "CRAM-MD5"
    }

    fn decode(&mut self, token: &str) {
        let data = decode_base64(token);
        let text = String::from_utf8_lossy(&data);
        let mut parts = text.split(' ');
        self.user = parts.next().unwrap_or_default().to_owned();
        self.digest = parts.next().unwrap_or_default().to_owned();
    }

    fn validate(&self, passwords: &dyn PasswordLookup) -> bool {
        let Some(password) = passwords.lookup_password(&self.user) else {
            return false;
        };
        // The digest is sent as lowercase hex
        if self.digest.bytes().any(|b| b.is_ascii_uppercase()) {
            return false;
        }
        let Ok(expected) = hex::decode(&self.digest) else {
            return false;
        };
        let Ok(mut mac) = HmacMd5::new_from_slice(password.as_bytes()) else {
            return false;
        };
        mac.update(self.challenge.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

impl fmt::Debug for CramMd5Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CramMd5Auth")
            .field("challenge", &self.challenge)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}
