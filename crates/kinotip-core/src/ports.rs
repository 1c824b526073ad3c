use async_trait::async_trait;

use crate::{domain::PostKind, Result};

/// A raw channel message, already reduced to what normalization needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelMessage {
    pub id: i64,
    pub text: String,
    pub kind: PostKind,
    /// Public link if the client library provides one.
    pub link: Option<String>,
}

/// Port for reading the whole history of the configured channel.
///
/// Implementations return `Error::Unavailable` when the session is not usable
/// (not authorized, expired) and any other error for transient failures.
#[async_trait]
pub trait ChannelSource: Send + Sync {
    async fn fetch_messages(&self) -> Result<Vec<ChannelMessage>>;
}

/// Port for reading the collector feed from the responder side.
///
/// Returns the decoded JSON document as is; shape detection happens in
/// [`crate::payload`]. A body that is not JSON decodes to `Value::Null`.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_payload(&self) -> Result<serde_json::Value>;
}
