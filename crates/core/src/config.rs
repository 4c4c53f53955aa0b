//! Proxy configuration.
//!
//! [`ProxyOptions`] controls the few behaviours of the proxy layer that are
//! deployment specific. Options can be built in code or loaded from TOML:
//!
//! ```toml
//! delist_flag = "success"
//! close_on_drop = true
//! capture_creation_sites = false
//! ```

use crate::error::{Error, Result};
use crate::xa::DelistFlag;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options shared by a factory proxy and every proxy it creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyOptions {
    /// Flag used when delisting a handle on close
    pub delist_flag: DelistFlag,
    /// Run the close path when an open proxy is dropped
    pub close_on_drop: bool,
    /// Log a backtrace of the creating call site at trace level
    pub capture_creation_sites: bool,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        ProxyOptions {
            delist_flag: DelistFlag::Success,
            close_on_drop: true,
            capture_creation_sites: false,
        }
    }
}

impl ProxyOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for tracking down who creates and leaks resources
    pub fn diagnostic() -> Self {
        ProxyOptions {
            capture_creation_sites: true,
            ..Default::default()
        }
    }

    /// Options for callers that manage every close explicitly
    pub fn explicit_close() -> Self {
        ProxyOptions {
            close_on_drop: false,
            ..Default::default()
        }
    }

    /// Set the delist flag
    pub fn delist_flag(mut self, flag: DelistFlag) -> Self {
        self.delist_flag = flag;
        self
    }

    /// Enable or disable close on drop
    pub fn close_on_drop(mut self, enabled: bool) -> Self {
        self.close_on_drop = enabled;
        self
    }

    /// Enable or disable creation-site capture
    pub fn capture_creation_sites(mut self, enabled: bool) -> Self {
        self.capture_creation_sites = enabled;
        self
    }

    /// Parse options from a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source)
            .map_err(|e| Error::Configuration(format!("invalid proxy options: {}", e)))
    }

    /// Load options from a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let options = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), ?options, "Loaded proxy options");
        Ok(options)
    }
}
