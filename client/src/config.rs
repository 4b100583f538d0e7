//! Configuration for the smoke binary.

use std::env;

/// Settings loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// User identity to activate the demo session for
    pub user: String,
    /// Inject a remote failure into the first delete, to exercise rollback
    pub fail_delete: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    // Parsing goes through an injectable lookup so tests never mutate
    // process-global environment state.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let user = lookup("MARQUE_USER").unwrap_or_else(|| "demo-user".to_string());

        let fail_delete = match lookup("MARQUE_FAIL_DELETE") {
            None => false,
            Some(raw) => match raw.as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => return Err(ConfigError::InvalidFailDelete(raw)),
            },
        };

        Ok(Self { user, fail_delete })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid MARQUE_FAIL_DELETE value: {0}")]
    InvalidFailDelete(String),
}
