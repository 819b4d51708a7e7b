//! Config loading from `config.json`.
//!
//! CHANGELOG:
//! - 10/14/2026 - Initial implementation

use serde::Deserialize;
use std::path::Path;

use crate::error::ClientError;

/// Default config path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Settings read once at startup.
///
/// Only `token` and `host` drive the run; the other fields are carried
/// through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default, rename = "lightNum")]
    pub light_num: String,
    #[serde(default)]
    pub username: String,
    /// Hostname or IP, without a port.
    pub host: String,
}

impl Config {
    /// Check that a credential is present before touching the network.
    pub fn require_token(&self) -> Result<&str, ClientError> {
        if self.token.is_empty() {
            return Err(ClientError::MissingCredential);
        }
        Ok(&self.token)
    }
}

/// Parse a config from JSON text.
pub fn parse(content: &str) -> Result<Config, ClientError> {
    serde_json::from_str(content).map_err(ClientError::ConfigParse)
}

/// Read and parse the config file at `path`.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ClientError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ClientError::ConfigRead {
        path: path.display().to_string(),
        source,
    })?;

    parse(&content)
}
