//! Telegram update handlers.
//!
//! Messages are only used for commands; everything user-facing besides that
//! goes through inline queries.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{InlineQuery, Message},
};

use crate::router::AppState;

mod commands;
mod inline;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if !text.starts_with('/') {
        return Ok(());
    }
    commands::handle_command(bot, msg, state).await
}

pub async fn handle_inline_query(
    bot: Bot,
    q: InlineQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    inline::handle_inline_query(bot, q, state).await
}
