use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use kinotip_core::{config::ResponderConfig, feed_cache::FeedCache};

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<FeedCache>,
    /// `@username` of the bot, when `getMe` succeeded at startup.
    pub bot_username: Option<String>,
}

pub async fn run_polling(cfg: Arc<ResponderConfig>, cache: Arc<FeedCache>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    let bot_username = match bot.get_me().await {
        Ok(me) => {
            let name = me.username().to_string();
            tracing::info!(bot = %name, "kinotip bot started");
            Some(name)
        }
        Err(e) => {
            tracing::warn!(error = %e, "getMe failed, continuing");
            None
        }
    };
    match &cfg.feed_url {
        Some(url) => tracing::info!(
            feed_url = %url,
            ttl_secs = cfg.cache_ttl.as_secs(),
            "remote feed enabled"
        ),
        None => tracing::warn!("FEED_URL not set, serving manual posts only"),
    }

    // Warm the cache so the first inline query does not wait on the collector.
    let outcome = cache.ensure_fresh(true).await;
    tracing::info!(?outcome, "initial feed refresh");

    let state = Arc::new(AppState {
        cache,
        bot_username,
    });

    let handler = dptree::entry()
        .branch(Update::filter_inline_query().endpoint(handlers::handle_inline_query))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("dispatcher stopped");
    Ok(())
}
