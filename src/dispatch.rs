//! Outbound call dispatch to the telephony bridge
//!
//! One GET against the configured bridge URL template. The bridge answers
//! 2xx when it accepts the call; anything else is a rejection whose body is
//! shown verbatim to the user.

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Dispatch failure. `Display` yields the text the orchestrator surfaces
/// directly to the chat, so `Rejected` renders as the bare response body.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{body}")]
    Rejected { status: u16, body: String },
    #[error("call dispatch failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("call dispatch cancelled")]
    Cancelled,
}

/// Place a call between two normalized phone suffixes, caller first.
pub async fn place_call(
    config: &Config,
    from_suffix: &str,
    to_suffix: &str,
    cancel: &CancellationToken,
) -> Result<(), DispatchError> {
    let url = config.dispatch_url(from_suffix, to_suffix);
    tracing::debug!("trying to call: {}", url);

    let request = reqwest::Client::new().get(&url).send();
    let resp = tokio::select! {
        _ = cancel.cancelled() => return Err(DispatchError::Cancelled),
        resp = request => resp?,
    };

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        tracing::debug!("Error: {}, Message: {}", url, body);
        return Err(DispatchError::Rejected { status, body });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn test_config(server: &MockServer) -> Config {
        Config {
            instance: "https://login.microsoftonline.com/{tenant}".into(),
            api_url: "https://graph.microsoft.com/".into(),
            app_id: "app-id".into(),
            app_password: "secret".into(),
            bridge_url: format!("{}/call/{{from}}/{{to}}", server.base_url()),
        }
    }

    #[tokio::test]
    async fn renders_suffixes_into_bridge_url() {
        let server = MockServer::start_async().await;
        let call_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/call/51234/55678");
                then.status(200);
            })
            .await;

        let config = test_config(&server);
        let cancel = CancellationToken::new();

        place_call(&config, "51234", "55678", &cancel).await.unwrap();
        call_mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejection_carries_the_response_body_verbatim() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/call/51234/55678");
                then.status(503).body("busy");
            })
            .await;

        let config = test_config(&server);
        let cancel = CancellationToken::new();

        let err = place_call(&config, "51234", "55678", &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "busy");
        match err {
            DispatchError::Rejected { status, .. } => assert_eq!(status, 503),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_prevents_the_call() {
        let server = MockServer::start_async().await;
        let call_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/call/51234/55678");
                then.status(200).delay(std::time::Duration::from_secs(5));
            })
            .await;

        let config = test_config(&server);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = place_call(&config, "51234", "55678", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Cancelled));
        assert_eq!(call_mock.hits_async().await, 0);
    }
}
