//! Application-only authentication against the identity provider
//!
//! Performs a client-credentials exchange scoped to the directory API.
//! Tokens are acquired fresh on every invocation; nothing here caches.

use anyhow::{bail, Context, Result};
use oauth2::{
    basic::BasicClient, AuthUrl, ClientId, ClientSecret, Scope, TokenResponse, TokenUrl,
};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Application token returned by the client-credentials exchange.
#[derive(Debug, Clone)]
pub struct AppToken {
    pub token: String,
    pub expires_at: Option<u64>,
}

impl AppToken {
    pub fn new(token: String, expires_in_secs: Option<u64>) -> Self {
        let expires_at = expires_in_secs.map(|secs| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs()
                + secs
        });

        Self { token, expires_at }
    }

    /// An empty token is treated as an authentication failure upstream.
    pub fn is_empty(&self) -> bool {
        self.token.trim().is_empty()
    }
}

/// Build the OAuth2 client for a tenant's authority.
fn build_client(tenant_id: &str, config: &Config) -> Result<BasicClient> {
    let authority = config.authority(tenant_id);
    let auth_url = AuthUrl::new(format!("{}/oauth2/v2.0/authorize", authority))?;
    let token_url = TokenUrl::new(format!("{}/oauth2/v2.0/token", authority))?;

    Ok(BasicClient::new(
        ClientId::new(config.app_id.clone()),
        Some(ClientSecret::new(config.app_password.clone())),
        auth_url,
        Some(token_url),
    ))
}

/// Acquire an application token for `tenant_id` via client credentials.
///
/// The single scope is the directory API's default scope, so the token is
/// good for user lookups and nothing else. Any exchange error is a hard
/// failure; there is no retry here.
pub async fn acquire_app_token(
    tenant_id: &str,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<AppToken> {
    let client = build_client(tenant_id, config)?;
    let scope = format!("{}.default", config.api_url);

    tracing::debug!("requesting app token for tenant {}", tenant_id);

    let exchange = client
        .exchange_client_credentials()
        .add_scope(Scope::new(scope))
        .request_async(oauth2::reqwest::async_http_client);

    let token_response = tokio::select! {
        _ = cancel.cancelled() => bail!("token exchange cancelled"),
        resp = exchange => resp.context("client credentials exchange failed")?,
    };

    Ok(AppToken::new(
        token_response.access_token().secret().to_string(),
        token_response.expires_in().map(|d| d.as_secs()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn test_config(server: &MockServer) -> Config {
        Config {
            instance: format!("{}/{{tenant}}", server.base_url()),
            api_url: format!("{}/", server.base_url()),
            app_id: "app-id".into(),
            app_password: "secret".into(),
            bridge_url: "http://pbx.local/call/{from}/{to}".into(),
        }
    }

    #[tokio::test]
    async fn acquires_token_from_tenant_authority() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/contoso/oauth2/v2.0/token");
                then.status(200).json_body(json!({
                    "access_token": "tok-123",
                    "token_type": "Bearer",
                    "expires_in": 3599,
                }));
            })
            .await;

        let config = test_config(&server);
        let cancel = CancellationToken::new();
        let token = acquire_app_token("contoso", &config, &cancel)
            .await
            .unwrap();

        token_mock.assert_async().await;
        assert_eq!(token.token, "tok-123");
        assert!(token.expires_at.is_some());
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn exchange_error_is_a_hard_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/contoso/oauth2/v2.0/token");
                then.status(500).body("boom");
            })
            .await;

        let config = test_config(&server);
        let cancel = CancellationToken::new();
        let result = acquire_app_token("contoso", &config, &cancel).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn cancellation_abandons_the_exchange() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/contoso/oauth2/v2.0/token");
                then.status(200)
                    .delay(Duration::from_secs(5))
                    .json_body(json!({
                        "access_token": "tok-123",
                        "token_type": "Bearer",
                    }));
            })
            .await;

        let config = test_config(&server);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = acquire_app_token("contoso", &config, &cancel).await;
        assert!(result.is_err());
    }

    #[test]
    fn empty_token_is_detected() {
        assert!(AppToken::new("  ".into(), None).is_empty());
        assert!(!AppToken::new("tok".into(), None).is_empty());
    }
}
