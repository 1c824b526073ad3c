use std::sync::Arc;

use kinotip_core::{
    config::ResponderConfig, feed_cache::FeedCache, feed_client::FeedClient, ports::FeedSource,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kinotip_core::logging::init("kinotip-bot")?;

    let cfg = Arc::new(ResponderConfig::load()?);

    let source: Option<Arc<dyn FeedSource>> = match &cfg.feed_url {
        Some(url) => Some(Arc::new(FeedClient::new(url.clone(), cfg.feed_timeout)?)),
        None => None,
    };
    let cache = Arc::new(FeedCache::new(source, cfg.hashtag.clone(), cfg.cache_ttl));

    kinotip_telegram::router::run_polling(cfg, cache).await
}
