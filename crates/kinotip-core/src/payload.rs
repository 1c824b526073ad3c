//! Shape detection for collector feed payloads.
//!
//! The responder accepts the collector's own `{"posts": [...]}` document as
//! well as a bare array and a few wrapper objects produced by older feed
//! versions. Both the list and each record field are located by walking an
//! ordered list of named extractors; the first one that yields a value wins.

use serde_json::Value;

use crate::domain::{Hashtag, Post, PostKind};

/// A named path to the record list inside a payload. An empty path means the
/// payload itself must be an array.
#[derive(Clone, Copy, Debug)]
pub struct ListExtractor {
    pub name: &'static str,
    path: &'static [&'static str],
}

impl ListExtractor {
    const fn new(name: &'static str, path: &'static [&'static str]) -> Self {
        Self { name, path }
    }

    pub fn extract<'a>(&self, payload: &'a Value) -> Option<&'a [Value]> {
        let mut cur = payload;
        for key in self.path {
            cur = cur.get(key)?;
        }
        cur.as_array().map(Vec::as_slice)
    }
}

pub const LIST_EXTRACTORS: &[ListExtractor] = &[
    ListExtractor::new("array", &[]),
    ListExtractor::new("posts", &["posts"]),
    ListExtractor::new("items", &["items"]),
    ListExtractor::new("data", &["data"]),
    ListExtractor::new("results", &["results"]),
    ListExtractor::new("messages", &["messages"]),
    ListExtractor::new("data.posts", &["data", "posts"]),
    ListExtractor::new("data.items", &["data", "items"]),
];

const MESSAGE_ID_KEYS: &[&str] = &["message_id", "id"];
const ID_KEYS: &[&str] = &["id", "message_id"];
const TEXT_KEYS: &[&str] = &["text", "caption", "content", "message"];
const KIND_KEYS: &[&str] = &["type", "media_type", "kind"];
const LINK_KEYS: &[&str] = &["link", "url"];

/// Result of parsing one payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedBatch {
    /// Name of the extractor that located the list, if any did.
    pub shape: Option<&'static str>,
    /// Number of records in the located list before filtering.
    pub total: usize,
    /// Records that carry the hashtag.
    pub posts: Vec<Post>,
}

/// Locate the record list. Unknown shapes yield `None`.
pub fn locate_items(payload: &Value) -> Option<(&'static str, &[Value])> {
    LIST_EXTRACTORS
        .iter()
        .find_map(|ex| ex.extract(payload).map(|items| (ex.name, items)))
}

/// Parse a payload into hashtag-carrying posts.
///
/// `now_secs` seeds synthetic message ids for records whose id is missing or
/// not numeric.
pub fn parse_feed(payload: &Value, hashtag: &Hashtag, now_secs: i64) -> FeedBatch {
    let Some((shape, items)) = locate_items(payload) else {
        return FeedBatch::default();
    };

    let posts = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| parse_record(item, index, now_secs))
        .filter(|post| hashtag.matches(&post.text))
        .collect();

    FeedBatch {
        shape: Some(shape),
        total: items.len(),
        posts,
    }
}

/// Parse one record. Only records that are objects with some text survive;
/// every other field falls back to a default.
pub fn parse_record(item: &Value, index: usize, now_secs: i64) -> Option<Post> {
    if !item.is_object() {
        return None;
    }

    let text = first_of(item, TEXT_KEYS, as_text)?;
    let message_id = first_of(item, MESSAGE_ID_KEYS, as_message_id)
        .unwrap_or_else(|| synthetic_message_id(now_secs, index));
    let id = first_of(item, ID_KEYS, as_id_string).unwrap_or_else(|| message_id.to_string());
    let kind = first_of(item, KIND_KEYS, |v| v.as_str().map(PostKind::parse_lenient))
        .unwrap_or(PostKind::Text);
    let link = first_of(item, LINK_KEYS, as_text);

    Some(Post::new(id, message_id, text, kind, link))
}

pub fn synthetic_message_id(now_secs: i64, index: usize) -> i64 {
    now_secs
        .saturating_mul(1000)
        .saturating_add(index as i64)
}

fn first_of<T>(item: &Value, keys: &[&str], convert: impl Fn(&Value) -> Option<T>) -> Option<T> {
    keys.iter().find_map(|key| item.get(*key).and_then(&convert))
}

fn as_text(v: &Value) -> Option<String> {
    let s = v.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn as_message_id(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn as_id_string(v: &Value) -> Option<String> {
    match v {
        Value::Number(n) => Some(n.to_string()),
        Value::String(_) => as_text(v),
        _ => None,
    }
}
