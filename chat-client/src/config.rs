//! Client configuration.
//!
//! Loaded from a TOML file or built in code. The push-channel endpoint
//! address is the one setting the engine requires from the outside.

use serde::Deserialize;

use chat_types::ChatError;

/// Configuration for the driftchat client engine.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base address of the REST service (e.g. `http://localhost:3000/api`).
    #[serde(default = "default_rest_address")]
    pub rest_address: String,
    /// Address of the push-channel endpoint (e.g. `localhost:4460`).
    #[serde(default = "default_channel_address")]
    pub channel_address: String,
}

fn default_rest_address() -> String {
    "http://127.0.0.1:3000/api".to_string()
}

fn default_channel_address() -> String {
    "127.0.0.1:4460".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rest_address: default_rest_address(),
            channel_address: default_channel_address(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration with explicit addresses.
    pub fn new(rest_address: &str, channel_address: &str) -> Self {
        Self {
            rest_address: rest_address.to_string(),
            channel_address: channel_address.to_string(),
        }
    }

    /// Set the REST base address.
    pub fn with_rest_address(mut self, address: &str) -> Self {
        self.rest_address = address.to_string();
        self
    }

    /// Set the push-channel endpoint address.
    pub fn with_channel_address(mut self, address: &str) -> Self {
        self.channel_address = address.to_string();
        self
    }

    /// Parse a configuration from TOML text. Missing fields take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ChatError> {
        toml::from_str(text).map_err(|e| ChatError::Validation(format!("invalid config: {e}")))
    }
}
