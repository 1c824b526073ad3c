use std::sync::Arc;

use teloxide::prelude::*;

use kinotip_core::{
    domain::{Hashtag, Post, PostKind},
    feed_cache::{AddOutcome, FeedDiagnostic},
    stats::{format_stats, KindCounts},
};

use crate::{reply, router::AppState};

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let (cmd, _args) = parse_command(text);
    let chat_id = msg.chat.id;

    match cmd.as_str() {
        "start" => reply(&bot, chat_id, start_text(&state)).await,
        "help" => reply(&bot, chat_id, help_text(&state)).await,
        "stats" => {
            state.cache.ensure_fresh(false).await;
            let view = state.cache.merged_view().await;
            reply(&bot, chat_id, format_stats(&KindCounts::from_posts(&view))).await;
        }
        "add_post" => handle_add_post(&bot, &msg, &state).await,
        "feed" => handle_feed(&bot, chat_id, &state).await,
        _ => {}
    }

    Ok(())
}

fn mention(state: &AppState) -> String {
    match &state.bot_username {
        Some(name) => format!("@{name}"),
        None => "@your_bot_username".to_string(),
    }
}

fn start_text(state: &AppState) -> String {
    format!(
        "Hi! I recommend films from the Titr show.\n\n\
         Start typing {mention} in any chat and pick the suggestion.\n\
         I show random posts from the Titr channel tagged {tag}.",
        mention = mention(state),
        tag = state.cache.hashtag().as_str(),
    )
}

fn help_text(state: &AppState) -> String {
    format!(
        "🎬 Kinotip - film recommendations from the Titr show\n\n\
         📖 How to use:\n\
         1. Open any Telegram chat\n\
         2. Type {mention} and optionally a word to search for\n\
         3. Pick the suggested film\n\
         4. The post is sent to the chat\n\n\
         🔧 Commands:\n\
         • /start - greeting\n\
         • /help - this help\n\
         • /stats - post counts by type\n\
         • /add_post - add a post (reply to a message tagged {tag})\n\
         • /feed - check the channel feed\n\n\
         Hashtag: {tag}",
        mention = mention(state),
        tag = state.cache.hashtag().as_str(),
    )
}

/// Reason a replied-to message cannot be added.
#[derive(Debug, PartialEq, Eq)]
enum Rejection {
    NoReply,
    MissingHashtag,
}

async fn handle_add_post(bot: &Bot, msg: &Message, state: &AppState) {
    let chat_id = msg.chat.id;
    let post = match manual_post(msg.reply_to_message(), state.cache.hashtag()) {
        Ok(p) => p,
        Err(Rejection::NoReply) => {
            reply(bot, chat_id, "Reply to a message to add it to the collection.").await;
            return;
        }
        Err(Rejection::MissingHashtag) => {
            let tag = state.cache.hashtag().as_str();
            reply(
                bot,
                chat_id,
                format!("This post has no {tag} hashtag. Add it to the post so it can be recommended."),
            )
            .await;
            return;
        }
    };

    match state.cache.add_manual(post).await {
        AddOutcome::Added { total, .. } => {
            reply(bot, chat_id, format!("✅ Post added! Posts available now: {total}")).await
        }
        AddOutcome::Duplicate => reply(bot, chat_id, "This post is already in the collection.").await,
    }
}

async fn handle_feed(bot: &Bot, chat_id: ChatId, state: &AppState) {
    if !state.cache.remote_enabled() {
        reply(bot, chat_id, "FEED_URL is not configured, only manual posts are served.").await;
        return;
    }

    let text = match state.cache.diagnose().await {
        Ok(d) => feed_report(&d, state.cache.hashtag()),
        Err(e) => {
            tracing::warn!(error = %e, "feed diagnostic failed");
            format!("⚠️ Feed check failed: {e}")
        }
    };
    reply(bot, chat_id, text).await;
}

fn feed_report(d: &FeedDiagnostic, hashtag: &Hashtag) -> String {
    format!(
        "📡 Feed check:\n\nItems in feed: {}\nWith {}: {}\nFormat: {}",
        d.total,
        hashtag.as_str(),
        d.matching,
        d.shape.unwrap_or("unrecognized"),
    )
}

fn manual_post(reply_to: Option<&Message>, hashtag: &Hashtag) -> Result<Post, Rejection> {
    let msg = reply_to.ok_or(Rejection::NoReply)?;
    let text = msg.text().or_else(|| msg.caption()).unwrap_or("").trim();
    if !hashtag.matches(text) {
        return Err(Rejection::MissingHashtag);
    }

    let (kind, file_id) = media_of(msg);
    Ok(build_manual_post(
        msg.chat.id.0,
        msg.id.0,
        msg.chat.username(),
        text,
        kind,
    )
    .with_file_id(file_id))
}

/// Media kind of a message and the file id to re-send it by.
fn media_of(msg: &Message) -> (PostKind, Option<String>) {
    if let Some(sizes) = msg.photo() {
        // Telegram lists photo sizes smallest first.
        (PostKind::Photo, sizes.last().map(|p| p.file.id.clone()))
    } else if let Some(doc) = msg.document() {
        (PostKind::Document, Some(doc.file.id.clone()))
    } else if let Some(video) = msg.video() {
        (PostKind::Video, Some(video.file.id.clone()))
    } else if let Some(sticker) = msg.sticker() {
        (PostKind::Sticker, Some(sticker.file.id.clone()))
    } else {
        (PostKind::Text, None)
    }
}

fn build_manual_post(
    chat_id: i64,
    message_id: i32,
    chat_username: Option<&str>,
    text: &str,
    kind: PostKind,
) -> Post {
    let link = chat_username.map(|u| format!("https://t.me/{u}/{message_id}"));
    Post::new(
        format!("{chat_id}_{message_id}"),
        i64::from(message_id),
        text,
        kind,
        link,
    )
}
