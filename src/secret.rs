/// Source of the commit-reveal secret.
///
/// The protocol only needs the value to be stable for the lifetime of one
/// round and recoverable at reveal time; pick commands verify it against the
/// commit published at close and refuse to draw on a mismatch.
pub trait SecretProvider: Send + Sync {
    fn reveal(&self) -> Option<&str>;
}

/// Secret captured from the environment once at startup
pub struct EnvSecret {
    value: Option<String>,
}

impl EnvSecret {
    pub const VAR: &'static str = "SECRET_SALT";

    pub fn from_env() -> Self {
        let value = std::env::var(Self::VAR).ok().filter(|s| !s.is_empty());
        EnvSecret { value }
    }

    /// Fixed secret, mainly for tests and one-off verification runs
    pub fn fixed(secret: impl Into<String>) -> Self {
        EnvSecret {
            value: Some(secret.into()),
        }
    }

    pub fn missing() -> Self {
        EnvSecret { value: None }
    }
}

impl SecretProvider for EnvSecret {
    fn reveal(&self) -> Option<&str> {
        self.value.as_deref()
    }
}
