//! Broker configuration.
//!
//! Loaded from a TOML file such as:
//!
//! ```toml
//! policy_mode = "log"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// How policy check failures are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Failures reject the request.
    #[default]
    Strict,
    /// Failures are logged and the request proceeds.
    Log,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerConfig {
    pub policy_mode: PolicyMode,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl BrokerConfig {
    pub fn strict() -> Self {
        Self {
            policy_mode: PolicyMode::Strict,
        }
    }

    pub fn log() -> Self {
        Self {
            policy_mode: PolicyMode::Log,
        }
    }

    /// Parses a TOML document, failing on malformed input.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Loads config from a file. A missing, unreadable or malformed file
    /// yields the default (strict) config.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No broker config found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded broker config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!(
                        "Failed to parse broker config {:?}: {}. Falling back to strict mode.",
                        path, e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read broker config {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}
