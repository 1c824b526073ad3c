use std::collections::BTreeMap;

use crate::domain::{Post, PostKind};

/// Post counts per media kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KindCounts {
    pub total: usize,
    counts: BTreeMap<PostKind, usize>,
}

impl KindCounts {
    pub fn from_posts(posts: &[Post]) -> Self {
        let mut counts = BTreeMap::new();
        for post in posts {
            *counts.entry(post.kind).or_insert(0) += 1;
        }
        Self {
            total: posts.len(),
            counts,
        }
    }

    pub fn get(&self, kind: PostKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Non-zero kinds, most frequent first; ties keep declaration order.
    pub fn ranked(&self) -> Vec<(PostKind, usize)> {
        let mut out: Vec<(PostKind, usize)> = self.counts.iter().map(|(k, n)| (*k, *n)).collect();
        out.sort_by(|a, b| b.1.cmp(&a.1));
        out
    }
}

fn kind_label(kind: PostKind) -> &'static str {
    match kind {
        PostKind::Photo => "Photos",
        PostKind::Document => "Documents",
        PostKind::Video => "Videos",
        PostKind::Sticker => "Stickers",
        PostKind::Text => "Text",
    }
}

/// Plain-text `/stats` reply.
pub fn format_stats(counts: &KindCounts) -> String {
    let mut out = String::from("📊 Stats:\n\n");
    out.push_str(&format!("Total posts: {}\n\n", counts.total));

    if counts.total == 0 {
        out.push_str("No posts in the collection\n");
        out.push_str("Use /add_post to add one");
        return out;
    }

    out.push_str("By type:\n");
    for (kind, n) in counts.ranked() {
        out.push_str(&format!("{} {}: {n}\n", kind.glyph(), kind_label(kind)));
    }
    out
}
