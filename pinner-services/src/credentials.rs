//! API credentials.

use std::fmt;

/// An API key and secret. Empty strings count as absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    apikey: Option<String>,
    secret: Option<String>,
}

impl Credentials {
    /// Creates credentials from a key and a secret.
    pub fn new(apikey: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            apikey: non_empty(apikey.into()),
            secret: non_empty(secret.into()),
        }
    }

    /// Credentials with only an API key (or token).
    pub fn key(apikey: impl Into<String>) -> Self {
        Self::new(apikey, "")
    }

    /// No credentials at all.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The API key, if any.
    pub fn apikey(&self) -> Option<&str> {
        self.apikey.as_deref()
    }

    /// The secret, if any.
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Returns true when neither value is present.
    pub fn is_empty(&self) -> bool {
        self.apikey.is_none() && self.secret.is_none()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("Credentials")
            .field("apikey", &redact(&self.apikey))
            .field("secret", &redact(&self.secret))
            .finish()
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
