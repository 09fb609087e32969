use std::fmt;

use subtle::ConstantTimeEq;

/// Checks a presented shared secret against the configured one.
#[derive(Clone)]
pub struct SecretVerifier {
    secret: Vec<u8>,
}

impl SecretVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into().into_bytes(),
        }
    }

    /// Constant-time comparison of the byte content. A length mismatch is
    /// rejected up front; an empty configured secret never matches.
    pub fn verify(&self, presented: &[u8]) -> bool {
        if self.secret.is_empty() || presented.len() != self.secret.len() {
            return false;
        }
        self.secret.as_slice().ct_eq(presented).into()
    }
}

impl fmt::Debug for SecretVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}
