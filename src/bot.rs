//! Call-initiation orchestrator
//!
//! Handles one "connect these two people" event end to end: fetch the
//! conversation's participants, validate there are exactly two, acquire an
//! app token for the tenant, resolve both phone numbers, and dispatch the
//! call to the telephony bridge. Every failure becomes one plain-text chat
//! message, and the inbound event is always acknowledged so the platform
//! does not re-deliver it.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::auth;
use crate::config::Config;
use crate::directory::DirectoryClient;
use crate::dispatch;
use crate::phone;

/// A member of the conversation, as reported by the chat platform.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Display name, used in user-facing error messages.
    pub name: String,
    /// Opaque key into the directory service.
    pub directory_id: String,
}

/// The inbound "connect these participants by phone" event.
#[derive(Debug, Clone)]
pub struct ConnectEvent {
    pub conversation_id: String,
    pub tenant_id: String,
    /// Id of the triggering activity, echoed back in the acknowledgment.
    pub activity_id: String,
}

/// Synchronous acknowledgment returned to the chat platform. Status is 200
/// on both the success and the handled-error path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeResponse {
    pub status: u16,
    pub activity_id: String,
}

/// The chat platform as seen from the orchestrator. The hosting runtime
/// supplies the real implementation; tests supply mocks.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// List the participants of a conversation.
    async fn list_participants(&self, conversation_id: &str) -> anyhow::Result<Vec<Participant>>;

    /// Post a plain-text message into the conversation.
    async fn send_message(&self, conversation_id: &str, text: &str) -> anyhow::Result<()>;
}

/// Everything that can go wrong while handling one event. `Display` is the
/// exact text sent to the chat.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("Sorry, this works only in a chat with exactly two people.")]
    WrongParticipantCount(usize),
    #[error("Sorry, I could not sign in to look up phone numbers.")]
    AuthenticationFailure,
    #[error("Sorry, I could not find a phone number for {0}.")]
    PhoneNotFound(String),
    #[error("{0}")]
    DispatchFailure(String),
    #[error("Sorry, something went wrong: {0}")]
    Unhandled(String),
}

/// The bot. One instance serves many events; it holds nothing but read-only
/// configuration and the platform handle, so events may run concurrently.
pub struct PhoneBot<P: ChatPlatform> {
    config: Arc<Config>,
    platform: P,
}

impl<P: ChatPlatform> PhoneBot<P> {
    pub fn new(config: Arc<Config>, platform: P) -> Self {
        Self { config, platform }
    }

    /// Handle one connect event. Never returns an error: failures are
    /// reported into the chat, and the event is acknowledged either way.
    pub async fn on_connect_request(
        &self,
        event: &ConnectEvent,
        cancel: &CancellationToken,
    ) -> InvokeResponse {
        if let Err(err) = self.run(event, cancel).await {
            tracing::error!("connect request failed: {}", err);
            if let Err(send_err) = self
                .platform
                .send_message(&event.conversation_id, &err.to_string())
                .await
            {
                tracing::error!("failed to report error to chat: {:#}", send_err);
            }
        }

        InvokeResponse {
            status: 200,
            activity_id: event.activity_id.clone(),
        }
    }

    /// The pipeline proper. First failure wins; nothing is retried.
    async fn run(&self, event: &ConnectEvent, cancel: &CancellationToken) -> Result<(), CallError> {
        let participants = self
            .platform
            .list_participants(&event.conversation_id)
            .await
            .map_err(|e| CallError::Unhandled(format!("{:#}", e)))?;

        if participants.len() != 2 {
            return Err(CallError::WrongParticipantCount(participants.len()));
        }

        let token = auth::acquire_app_token(&event.tenant_id, &self.config, cancel)
            .await
            .map_err(|e| {
                tracing::error!("token acquisition failed: {:#}", e);
                CallError::AuthenticationFailure
            })?;
        if token.is_empty() {
            return Err(CallError::AuthenticationFailure);
        }

        let directory = DirectoryClient::new(&self.config, &token.token);
        let caller = &participants[0];
        let callee = &participants[1];

        // Resolved sequentially so the first participant with a missing
        // number is the one reported, even when both are missing.
        let caller_phone = self
            .resolve_phone(&directory, caller, cancel)
            .await?;
        let callee_phone = self
            .resolve_phone(&directory, callee, cancel)
            .await?;

        dispatch::place_call(
            &self.config,
            &phone::normalize(&caller_phone),
            &phone::normalize(&callee_phone),
            cancel,
        )
        .await
        .map_err(|e| CallError::DispatchFailure(e.to_string()))?;

        Ok(())
    }

    /// Look up one participant's phone, mapping "no number" to an error
    /// naming that participant.
    async fn resolve_phone(
        &self,
        directory: &DirectoryClient,
        participant: &Participant,
        cancel: &CancellationToken,
    ) -> Result<String, CallError> {
        let phone = directory
            .get_phone(&participant.directory_id, cancel)
            .await
            .map_err(|e| CallError::Unhandled(format!("{:#}", e)))?;

        match phone {
            Some(number) if !number.is_empty() => Ok(number),
            _ => Err(CallError::PhoneNotFound(participant.name.clone())),
        }
    }
}
