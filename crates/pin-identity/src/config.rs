//! Instance configuration.
//!
//! One record per server instance, stored as `instance.json` in the data
//! directory. The protected domain lives here as an explicit field rather
//! than a free-form setting.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domains::normalize_domain;
use crate::error::{PinError, Result};
use crate::identity::IdentityId;

/// File name of the configuration inside a data directory.
pub const CONFIG_FILE_NAME: &str = "instance.json";

/// Environment variable overriding [`InstanceConfig::base_url`].
pub const BASE_URL_ENV: &str = "PIN_BASE_URL";

/// Default bound on a single domain challenge.
pub const DEFAULT_CHALLENGE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Public base URL, e.g. `https://pin.example`. May be blank.
    #[serde(default)]
    pub base_url: String,

    /// The identity that owns this instance.
    #[serde(default = "default_owner")]
    pub owner_identity_id: IdentityId,

    /// Host of the instance itself, registered once for the owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected_domain: Option<String>,

    /// Deadline for a domain challenge, in seconds. Zero disables the bound.
    #[serde(default = "default_timeout")]
    pub challenge_timeout_secs: u64,
}

fn default_owner() -> IdentityId {
    IdentityId(1)
}

fn default_timeout() -> u64 {
    DEFAULT_CHALLENGE_TIMEOUT_SECS
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            owner_identity_id: default_owner(),
            protected_domain: None,
            challenge_timeout_secs: DEFAULT_CHALLENGE_TIMEOUT_SECS,
        }
    }
}

impl InstanceConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            PinError::Serialization(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Load `path`, or return the default when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json.as_bytes())?;
        Ok(())
    }

    /// Apply `PIN_BASE_URL` when it is set and not blank.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(BASE_URL_ENV) {
            self.apply_base_url_override(&value);
        }
    }

    fn apply_base_url_override(&mut self, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            log::debug!("base_url overridden to {value}");
            self.base_url = value.to_string();
        }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }

    /// Normalized host of the base URL, if any.
    pub fn base_host(&self) -> Option<String> {
        let base = self.base_url();
        if base.is_empty() {
            return None;
        }
        match url::Url::parse(base) {
            Ok(parsed) => parsed.host_str().and_then(normalize_domain),
            Err(_) => normalize_domain(base),
        }
    }

    /// The challenge deadline, `None` when disabled.
    pub fn challenge_timeout(&self) -> Option<std::time::Duration> {
        (self.challenge_timeout_secs > 0)
            .then(|| std::time::Duration::from_secs(self.challenge_timeout_secs))
    }
}
