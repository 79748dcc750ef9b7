//! Directory service lookups
//!
//! Thin authenticated wrapper over the directory API, used to resolve a
//! participant's business phone number from their directory id.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

#[derive(Debug, Deserialize)]
struct UserRecord {
    #[serde(rename = "businessPhones", default)]
    business_phones: Vec<String>,
}

/// Authenticated directory client, valid for one orchestration invocation.
pub struct DirectoryClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl DirectoryClient {
    /// Build a client from validated configuration and a bearer token.
    ///
    /// # Panics
    ///
    /// Panics if `token` is empty. The orchestrator checks the token before
    /// constructing this client, so an empty one here is a programming error
    /// rather than a runtime failure.
    pub fn new(config: &Config, token: &str) -> Self {
        assert!(
            !token.trim().is_empty(),
            "DirectoryClient requires a non-empty bearer token"
        );

        Self {
            http: reqwest::Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Resolve the user's primary business phone number.
    ///
    /// Returns `None` when the record does not exist or carries no business
    /// phones. Other HTTP errors are runtime failures.
    pub async fn get_phone(
        &self,
        directory_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let url = format!("{}/v1.0/users/{}", self.base_url, directory_id);
        tracing::debug!("Directory GET {}", url);

        let request = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header("Prefer", "outlook.timezone=\"UTC\"")
            .send();

        let resp = tokio::select! {
            _ = cancel.cancelled() => bail!("directory lookup cancelled"),
            resp = request => resp.with_context(|| format!("Directory GET {} failed", url))?,
        };

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            bail!("HTTP {} for {}: {}", status, url, body);
        }

        let user: UserRecord = resp
            .json()
            .await
            .with_context(|| format!("Invalid user record from {}", url))?;

        Ok(user.business_phones.into_iter().next())
    }
}
