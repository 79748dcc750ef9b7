//! phonebot - bridge two chat participants over a phone call
//!
//! The chat platform delivers one event ("these two people want to talk"),
//! and this crate turns it into exactly one call-dispatch request against
//! the telephony bridge, or a chat message explaining why it could not.
//! Event transport and dependency wiring belong to the hosting runtime; the
//! seam is the [`bot::ChatPlatform`] trait.

pub mod auth;
pub mod bot;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod phone;

pub use bot::{CallError, ChatPlatform, ConnectEvent, InvokeResponse, Participant, PhoneBot};
pub use config::Config;
