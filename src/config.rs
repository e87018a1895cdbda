//! Configuration for an evictor.
//!
//! # Example
//!
//! ```
//! use servant_evictor::config::EvictorConfig;
//!
//! let config = EvictorConfig::default();
//! assert_eq!(config.capacity, 1000);
//! assert_eq!(config.adapter, "default");
//!
//! let config = EvictorConfig {
//!     capacity: 64,
//!     adapter: "phonebook".into(),
//! };
//! config.validate().unwrap();
//! ```

use serde::Deserialize;

use crate::error::ConfigError;
use crate::evictor::DEFAULT_ADAPTER;

/// Settings for one evictor.
///
/// Every field has a default, so an empty document deserializes to
/// [`EvictorConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EvictorConfig {
    /// Maximum resident servants (default: 1000). `0` disables caching.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Serving scope the evictor belongs to; shows up in logs and `Current`.
    #[serde(default = "default_adapter")]
    pub adapter: String,
}

fn default_capacity() -> usize {
    1000
}

fn default_adapter() -> String {
    DEFAULT_ADAPTER.to_string()
}

impl Default for EvictorConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            adapter: default_adapter(),
        }
    }
}

impl EvictorConfig {
    /// Checks values that cannot be expressed in the type.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.adapter.trim().is_empty() {
            return Err(ConfigError::new("adapter name must not be empty"));
        }
        Ok(())
    }
}
