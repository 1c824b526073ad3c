use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::Post;

/// In-memory post snapshot shared by the feed server and the refresher.
///
/// Readers get a cheap `Arc` clone of the current snapshot and never observe a
/// partially built list; the writer replaces the whole snapshot at once.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<[Post]>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::with_posts(Vec::new())
    }

    pub fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            current: RwLock::new(posts.into()),
        }
    }

    pub async fn snapshot(&self) -> Arc<[Post]> {
        self.current.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.current.read().await.len()
    }

    /// Swap in a new snapshot, returning the previous one.
    pub async fn replace(&self, posts: Vec<Post>) -> Arc<[Post]> {
        let next: Arc<[Post]> = posts.into();
        let mut guard = self.current.write().await;
        std::mem::replace(&mut *guard, next)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
