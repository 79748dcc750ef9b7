//! Bot configuration
//!
//! Loaded once at startup from a TOML file and validated before anything
//! talks to the network. Missing or empty fields are a startup error, not
//! something discovered mid-call.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_instance() -> String {
    "https://login.microsoftonline.com/{tenant}".to_string()
}

fn default_api_url() -> String {
    "https://graph.microsoft.com/".to_string()
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Identity provider authority template; `{tenant}` is replaced with the
    /// tenant id of the conversation being handled.
    #[serde(default = "default_instance")]
    pub instance: String,
    /// Directory (Graph) API base URL; also the audience of the app token.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Application (client) id registered with the identity provider.
    pub app_id: String,
    /// Application client secret.
    pub app_password: String,
    /// Telephony bridge URL template; `{from}` and `{to}` are replaced with
    /// the normalized phone suffixes of caller and callee.
    pub bridge_url: String,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field the pipeline depends on. Called from `load`, and
    /// again by `phonebot check` as a deployment probe.
    pub fn validate(&self) -> Result<()> {
        if self.instance.trim().is_empty() {
            bail!("config: 'instance' must not be empty");
        }
        if !self.instance.contains("{tenant}") {
            bail!("config: 'instance' must contain a {{tenant}} placeholder");
        }
        if self.api_url.trim().is_empty() {
            bail!("config: 'api_url' must not be empty");
        }
        if self.app_id.trim().is_empty() {
            bail!("config: 'app_id' must not be empty");
        }
        if self.app_password.trim().is_empty() {
            bail!("config: 'app_password' must not be empty");
        }
        if self.bridge_url.trim().is_empty() {
            bail!("config: 'bridge_url' must not be empty");
        }
        if !self.bridge_url.contains("{from}") || !self.bridge_url.contains("{to}") {
            bail!("config: 'bridge_url' must contain {{from}} and {{to}} placeholders");
        }
        Ok(())
    }

    /// Authority URL for a tenant, rendered from the instance template.
    pub fn authority(&self, tenant_id: &str) -> String {
        self.instance.replace("{tenant}", tenant_id)
    }

    /// Telephony bridge dispatch URL for a caller/callee suffix pair.
    pub fn dispatch_url(&self, from_suffix: &str, to_suffix: &str) -> String {
        self.bridge_url
            .replace("{from}", from_suffix)
            .replace("{to}", to_suffix)
    }
}
