//! Harness configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{NegotiationError, Result};

pub const ENV_CALLBACK_ADDRESS: &str = "DATASPACETCK_CALLBACK_ADDRESS";
pub const ENV_LOG: &str = "DATASPACETCK_LOG";

/// Settings resolved before the connector and its managers are constructed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TckConfig {
    /// Callback address inserted into contract requests that carry none
    pub default_callback_address: Option<String>,
    /// `tracing` filter directive
    pub log_filter: String,
}

impl Default for TckConfig {
    fn default() -> Self {
        Self {
            default_callback_address: None,
            log_filter: "info".to_string(),
        }
    }
}

impl TckConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: TckConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CALLBACK_ADDRESS) {
            self.default_callback_address = Some(value);
        }
        if let Some(value) = lookup(ENV_LOG) {
            self.log_filter = value;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(address) = &self.default_callback_address {
            if address.trim().is_empty() {
                return Err(NegotiationError::Configuration(
                    "defaultCallbackAddress must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
