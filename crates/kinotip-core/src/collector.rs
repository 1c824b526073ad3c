use std::sync::Arc;

use crate::{
    domain::{Hashtag, Post},
    ports::{ChannelMessage, ChannelSource},
    store::SnapshotStore,
    Error,
};

/// What a refresh did to the snapshot.
#[derive(Debug)]
pub enum RefreshOutcome {
    Replaced { count: usize },
    /// The fetch failed and the previous snapshot of `kept` posts stays.
    Kept { kept: usize, error: Error },
}

/// Owns the collector snapshot and refreshes it from the channel.
pub struct Collector {
    source: Arc<dyn ChannelSource>,
    store: Arc<SnapshotStore>,
    hashtag: Hashtag,
    channel_slug: String,
}

impl Collector {
    pub fn new(
        source: Arc<dyn ChannelSource>,
        store: Arc<SnapshotStore>,
        hashtag: Hashtag,
        channel: &str,
    ) -> Self {
        Self {
            source,
            store,
            hashtag,
            channel_slug: channel.trim().trim_start_matches('@').to_string(),
        }
    }

    pub fn store(&self) -> Arc<SnapshotStore> {
        self.store.clone()
    }

    /// Refetch the channel and swap the snapshot. Errors never clear it.
    pub async fn refresh(&self, reason: &str) -> RefreshOutcome {
        tracing::info!(reason, "refreshing post cache");

        match self.source.fetch_messages().await {
            Ok(messages) => {
                let fetched = messages.len();
                let posts = normalize(messages, &self.hashtag, &self.channel_slug);
                let count = posts.len();
                self.store.replace(posts).await;
                tracing::info!(
                    reason,
                    fetched,
                    count,
                    hashtag = self.hashtag.as_str(),
                    "post cache replaced"
                );
                RefreshOutcome::Replaced { count }
            }
            Err(error) => {
                let kept = self.store.len().await;
                match &error {
                    Error::Unavailable(_) => tracing::error!(
                        reason,
                        kept,
                        %error,
                        "channel source unavailable, keeping previous posts"
                    ),
                    _ => tracing::warn!(
                        reason,
                        kept,
                        %error,
                        "cache refresh failed, keeping previous posts"
                    ),
                }
                RefreshOutcome::Kept { kept, error }
            }
        }
    }
}

/// Keep hashtag-carrying messages and turn them into feed posts.
pub fn normalize(messages: Vec<ChannelMessage>, hashtag: &Hashtag, channel_slug: &str) -> Vec<Post> {
    messages
        .into_iter()
        .filter_map(|msg| {
            let text = msg.text.trim();
            if text.is_empty() || !hashtag.matches(text) {
                return None;
            }
            let link = msg
                .link
                .filter(|l| !l.trim().is_empty())
                .or_else(|| post_link(channel_slug, msg.id));
            Some(Post::new(msg.id.to_string(), msg.id, text, msg.kind, link))
        })
        .collect()
}

fn post_link(channel_slug: &str, message_id: i64) -> Option<String> {
    if channel_slug.is_empty() || message_id <= 0 {
        return None;
    }
    Some(format!("https://t.me/{channel_slug}/{message_id}"))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::{domain::PostKind, Result};

    struct ScriptedSource {
        replies: Mutex<Vec<Result<Vec<ChannelMessage>>>>,
    }

    impl ScriptedSource {
        fn new(mut replies: Vec<Result<Vec<ChannelMessage>>>) -> Arc<Self> {
            replies.reverse();
            Arc::new(Self {
                replies: Mutex::new(replies),
            })
        }
    }

    #[async_trait]
    impl ChannelSource for ScriptedSource {
        async fn fetch_messages(&self) -> Result<Vec<ChannelMessage>> {
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(Error::External("script exhausted".to_string())))
        }
    }

    fn msg(id: i64, text: &str, kind: PostKind) -> ChannelMessage {
        ChannelMessage {
            id,
            text: text.to_string(),
            kind,
            link: None,
        }
    }

    fn collector(source: Arc<ScriptedSource>) -> Collector {
        Collector::new(
            source,
            Arc::new(SnapshotStore::new()),
            Hashtag::default(),
            "@titr_show",
        )
    }

    #[test]
    fn normalize_keeps_only_tagged_messages() {
        let posts = normalize(
            vec![
                msg(1, "  Film #ShowTitrVibe  ", PostKind::Photo),
                msg(2, "untagged", PostKind::Text),
                msg(3, "   ", PostKind::Text),
            ],
            &Hashtag::default(),
            "titr_show",
        );
        assert_eq!(posts.len(), 1);
        let p = &posts[0];
        assert_eq!(p.id, "1");
        assert_eq!(p.text, "Film #ShowTitrVibe");
        assert_eq!(p.kind, PostKind::Photo);
        assert_eq!(p.link.as_deref(), Some("https://t.me/titr_show/1"));
    }

    #[test]
    fn normalize_prefers_link_from_client() {
        let mut m = msg(5, "#showtitrvibe", PostKind::Text);
        m.link = Some("https://t.me/c/99/5".to_string());
        let posts = normalize(vec![m], &Hashtag::default(), "titr_show");
        assert_eq!(posts[0].link.as_deref(), Some("https://t.me/c/99/5"));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let source = ScriptedSource::new(vec![
            Ok(vec![msg(1, "A #showtitrvibe", PostKind::Text)]),
            Err(Error::External("flood wait".to_string())),
            Err(Error::Unavailable("session expired".to_string())),
        ]);
        let c = collector(source);

        assert!(matches!(
            c.refresh("startup").await,
            RefreshOutcome::Replaced { count: 1 }
        ));
        assert!(matches!(
            c.refresh("scheduled").await,
            RefreshOutcome::Kept { kept: 1, .. }
        ));
        assert!(matches!(
            c.refresh("scheduled").await,
            RefreshOutcome::Kept { kept: 1, .. }
        ));
        let snap = c.store().snapshot().await;
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].message_id, 1);
    }

    #[tokio::test]
    async fn successful_refresh_replaces_not_merges() {
        let source = ScriptedSource::new(vec![
            Ok(vec![
                msg(1, "A #showtitrvibe", PostKind::Text),
                msg(2, "B #showtitrvibe", PostKind::Video),
            ]),
            Ok(vec![msg(3, "C #showtitrvibe", PostKind::Sticker)]),
        ]);
        let c = collector(source);
        c.refresh("startup").await;
        c.refresh("scheduled").await;

        let snap = c.store().snapshot().await;
        let ids: Vec<i64> = snap.iter().map(|p| p.message_id).collect();
        assert_eq!(ids, vec![3]);
    }
}
