//! Telegram adapter (teloxide).
//!
//! The responder bot: commands, manual additions and the inline-query
//! handler, all backed by the `kinotip-core` feed cache.

use teloxide::{prelude::*, RequestError};
use tokio::time::sleep;

pub mod handlers;
pub mod router;

/// Run a request, retrying once when Telegram asks us to back off.
pub(crate) async fn with_retry<T, Fut>(mut op: impl FnMut() -> Fut) -> Result<T, RequestError>
where
    Fut: std::future::IntoFuture<Output = Result<T, RequestError>>,
    Fut::IntoFuture: Send,
{
    const MAX_RETRIES: usize = 1;
    let mut attempts = 0usize;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(RequestError::RetryAfter(d)) if attempts < MAX_RETRIES => {
                attempts += 1;
                tracing::warn!(wait_secs = d.as_secs(), "telegram rate limit, retrying");
                sleep(d).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Plain-text reply to a chat; failures are logged and swallowed.
pub(crate) async fn reply(bot: &Bot, chat_id: ChatId, text: impl Into<String>) {
    let text = text.into();
    if let Err(e) = with_retry(|| bot.send_message(chat_id, text.clone())).await {
        tracing::warn!(chat_id = chat_id.0, error = %e, "failed to send reply");
    }
}
