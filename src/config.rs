//! Link configuration.
//!
//! Load order: defaults, then a YAML file, then environment overrides
//! (`COOLMON_TARGET_NAME`, `COOLMON_CONNECT_TIMEOUT_MS`).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::ServiceToken;
use crate::{LinkError, Result};

/// Peer name the rig's radio module advertises.
pub const DEFAULT_TARGET_NAME: &str = "HC-06";

const ENV_TARGET_NAME: &str = "COOLMON_TARGET_NAME";
const ENV_CONNECT_TIMEOUT_MS: &str = "COOLMON_CONNECT_TIMEOUT_MS";

/// One row of the TCP bridge table: a peer name and where to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgePeer {
    pub name: String,
    pub address: String,
}

/// Link manager configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    /// Exact name of the peer to connect to.
    pub target_name: String,
    /// Capability token the peer expects.
    pub service_token: ServiceToken,
    /// Give up on a connect after this long. Absent means wait indefinitely.
    pub connect_timeout_ms: Option<u64>,
    /// Peers reachable through a TCP bridge.
    pub peers: Vec<BridgePeer>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            target_name: DEFAULT_TARGET_NAME.to_string(),
            service_token: ServiceToken::default(),
            connect_timeout_ms: None,
            peers: Vec::new(),
        }
    }
}

impl LinkConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: LinkConfig = serde_yaml_ng::from_str(yaml)
            .map_err(|e| LinkError::config(format!("YAML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| LinkError::config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&yaml)
    }

    /// Defaults, overlaid with `path` when given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from a key lookup (the environment, in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup(ENV_TARGET_NAME) {
            debug!(target_name = %name, "Target name overridden from environment");
            self.target_name = name;
        }
        if let Some(raw) = lookup(ENV_CONNECT_TIMEOUT_MS) {
            match raw.parse::<u64>() {
                Ok(ms) => self.connect_timeout_ms = Some(ms),
                Err(e) => warn!("Ignoring {}={:?}: {}", ENV_CONNECT_TIMEOUT_MS, raw, e),
            }
        }
    }

    /// Reject configurations the manager cannot act on.
    pub fn validate(&self) -> Result<()> {
        if self.target_name.is_empty() {
            return Err(LinkError::config("target_name must not be empty"));
        }
        if self.connect_timeout_ms == Some(0) {
            return Err(LinkError::config("connect_timeout_ms must be positive"));
        }
        if let Some(peer) = self.peers.iter().find(|p| p.address.is_empty()) {
            return Err(LinkError::config(format!("peer '{}' has no address", peer.name)));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}
