//! Access token used to authenticate a live session.

use secrecy::{ExposeSecret, SecretString};
use std::hash::{Hash, Hasher};

/// Opaque API access token.
///
/// The token is appended to the connection URL as the `key` query parameter.
/// Equality and hashing compare the token value; `Debug` never prints it.
pub struct AccessToken {
    secret: SecretString,
}

impl AccessToken {
    /// Wrap an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { secret: SecretString::from(api_key.into()) }
    }

    /// Read the token from the first environment variable that is set and non-empty.
    pub fn from_env(names: &[&str]) -> Option<Self> {
        names
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
            .map(Self::new)
    }

    /// The raw token value.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl Clone for AccessToken {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_owned())
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for AccessToken {}

impl Hash for AccessToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.expose().hash(state);
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken").field("secret", &"[REDACTED]").finish()
    }
}
