//! Responder-side feed cache.
//!
//! Holds the last snapshot fetched from the collector plus the manually added
//! posts, and produces the merged view the inline handler picks from. All
//! responder state lives here; handlers share it behind an `Arc`.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, RwLock},
    time::Instant,
};

use crate::{
    domain::{Hashtag, Post},
    payload::{self, FeedBatch},
    ports::FeedSource,
    Error, Result,
};

/// What `ensure_fresh` ended up doing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FreshnessOutcome {
    /// No feed URL configured.
    Disabled,
    /// The snapshot is non-empty and was updated within the TTL window.
    Fresh,
    Updated { count: usize },
    /// The fetch failed or found nothing usable; the previous snapshot stays.
    Kept { kept: usize },
}

/// Result of adding a manual post.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added { manual: usize, total: usize },
    Duplicate,
}

/// Counts reported by the `/feed` diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedDiagnostic {
    pub shape: Option<&'static str>,
    pub total: usize,
    pub matching: usize,
}

#[derive(Debug)]
struct RemoteSnapshot {
    posts: Arc<[Post]>,
    // Last fetch that replaced `posts`; failed or empty fetches leave it alone.
    updated_at: Option<Instant>,
}

pub struct FeedCache {
    source: Option<Arc<dyn FeedSource>>,
    hashtag: Hashtag,
    ttl: Duration,
    remote: RwLock<RemoteSnapshot>,
    manual: RwLock<Vec<Post>>,
    // Single-flight: concurrent callers wait for one fetch instead of racing.
    refresh_gate: Mutex<()>,
}

impl FeedCache {
    pub fn new(source: Option<Arc<dyn FeedSource>>, hashtag: Hashtag, ttl: Duration) -> Self {
        Self {
            source,
            hashtag,
            ttl,
            remote: RwLock::new(RemoteSnapshot {
                posts: Arc::from(Vec::new()),
                updated_at: None,
            }),
            manual: RwLock::new(Vec::new()),
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn hashtag(&self) -> &Hashtag {
        &self.hashtag
    }

    pub fn remote_enabled(&self) -> bool {
        self.source.is_some()
    }

    /// Refetch the collector feed unless the snapshot is non-empty and younger
    /// than the TTL.
    ///
    /// Never fails: errors and empty results keep the previous snapshot.
    pub async fn ensure_fresh(&self, force: bool) -> FreshnessOutcome {
        let Some(source) = &self.source else {
            return FreshnessOutcome::Disabled;
        };

        let _gate = self.refresh_gate.lock().await;
        if !force && self.is_fresh().await {
            return FreshnessOutcome::Fresh;
        }

        match self.fetch_and_apply(source.as_ref()).await {
            Ok((_, outcome)) => outcome,
            Err(e) => {
                let kept = self.remote.read().await.posts.len();
                tracing::warn!(error = %e, kept, "feed refresh failed, keeping cached posts");
                FreshnessOutcome::Kept { kept }
            }
        }
    }

    /// Force a fetch and report raw and matching item counts.
    pub async fn diagnose(&self) -> Result<FeedDiagnostic> {
        let Some(source) = &self.source else {
            return Err(Error::Config("FEED_URL is not configured".to_string()));
        };

        let _gate = self.refresh_gate.lock().await;
        let (batch, _) = self.fetch_and_apply(source.as_ref()).await?;
        Ok(FeedDiagnostic {
            shape: batch.shape,
            total: batch.total,
            matching: batch.posts.len(),
        })
    }

    /// Remote snapshot followed by the manual posts.
    pub async fn merged_view(&self) -> Vec<Post> {
        let remote = self.remote.read().await.posts.clone();
        let manual = self.manual.read().await;
        remote.iter().chain(manual.iter()).cloned().collect()
    }

    pub async fn remote_len(&self) -> usize {
        self.remote.read().await.posts.len()
    }

    /// Append a manual post unless one with the same id was already added.
    pub async fn add_manual(&self, post: Post) -> AddOutcome {
        let remote_len = self.remote_len().await;
        let mut manual = self.manual.write().await;
        if manual.iter().any(|p| p.id == post.id) {
            return AddOutcome::Duplicate;
        }
        tracing::info!(id = %post.id, kind = %post.kind, "manual post added");
        manual.push(post);
        AddOutcome::Added {
            manual: manual.len(),
            total: remote_len + manual.len(),
        }
    }

    async fn is_fresh(&self) -> bool {
        let remote = self.remote.read().await;
        !remote.posts.is_empty()
            && remote
                .updated_at
                .is_some_and(|at| at.elapsed() < self.ttl)
    }

    // Caller holds `refresh_gate`.
    async fn fetch_and_apply(
        &self,
        source: &dyn FeedSource,
    ) -> Result<(FeedBatch, FreshnessOutcome)> {
        let payload = source.fetch_payload().await?;
        let now_secs = chrono::Utc::now().timestamp();
        let batch = payload::parse_feed(&payload, &self.hashtag, now_secs);

        if batch.shape.is_none() {
            tracing::warn!("feed payload has no recognizable post list");
        }

        if batch.posts.is_empty() {
            let kept = self.remote.read().await.posts.len();
            tracing::warn!(
                total = batch.total,
                kept,
                "feed returned no tagged posts, keeping cached posts"
            );
            return Ok((batch, FreshnessOutcome::Kept { kept }));
        }

        let count = batch.posts.len();
        {
            let mut remote = self.remote.write().await;
            remote.posts = Arc::from(batch.posts.clone());
            remote.updated_at = Some(Instant::now());
        }
        tracing::info!(
            total = batch.total,
            count,
            shape = batch.shape.unwrap_or("?"),
            "feed cache updated"
        );
        Ok((batch, FreshnessOutcome::Updated { count }))
    }
}
