use std::fmt;

use serde::{Serialize, Serializer};

/// Hashtag used when `HASHTAG` is not configured.
pub const DEFAULT_HASHTAG: &str = "#showtitrvibe";

/// Media kind of a channel post.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Photo,
    Document,
    Video,
    Sticker,
    Text,
}

impl PostKind {
    /// Parse a wire string. Anything unknown is a text post.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "photo" => Self::Photo,
            "document" => Self::Document,
            "video" => Self::Video,
            "sticker" => Self::Sticker,
            _ => Self::Text,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Document => "document",
            Self::Video => "video",
            Self::Sticker => "sticker",
            Self::Text => "text",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Self::Photo => "📷",
            Self::Document => "📄",
            Self::Video => "🎥",
            Self::Sticker => "😊",
            Self::Text => "📝",
        }
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized channel post.
///
/// Posts are never mutated after construction; snapshots share them behind an
/// `Arc<[Post]>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub message_id: i64,
    pub text: String,
    pub kind: PostKind,
    pub link: Option<String>,
    /// Telegram file id of the media, kept only for manually added posts.
    pub file_id: Option<String>,
}

impl Post {
    pub fn new(
        id: impl Into<String>,
        message_id: i64,
        text: impl Into<String>,
        kind: PostKind,
        link: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            message_id,
            text: text.into(),
            kind,
            link: link.filter(|l| !l.trim().is_empty()),
            file_id: None,
        }
    }

    pub fn with_file_id(mut self, file_id: Option<String>) -> Self {
        self.file_id = file_id.filter(|f| !f.is_empty());
        self
    }

    /// Reply body sent when the post is picked: glyph, text, then the origin link.
    pub fn reply_text(&self) -> String {
        let mut out = format!("{} {}", self.kind.glyph(), self.text.trim());
        if let Some(link) = &self.link {
            out.push_str("\n\n");
            out.push_str(link);
        }
        out
    }
}

// The feed record repeats the normalized text under three keys for older clients.
#[derive(Serialize)]
struct PostRecord<'a> {
    id: &'a str,
    message_id: i64,
    text: &'a str,
    caption: &'a str,
    content: &'a str,
    #[serde(rename = "type")]
    kind: PostKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<&'a str>,
}

impl Serialize for Post {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        PostRecord {
            id: &self.id,
            message_id: self.message_id,
            text: &self.text,
            caption: &self.text,
            content: &self.text,
            kind: self.kind,
            link: self.link.as_deref(),
        }
        .serialize(serializer)
    }
}

/// Case-insensitive hashtag marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hashtag {
    marker: String,
}

impl Hashtag {
    pub fn new(raw: &str) -> Self {
        Self {
            marker: raw.trim().to_lowercase(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.marker
    }

    pub fn matches(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.marker)
    }
}

impl Default for Hashtag {
    fn default() -> Self {
        Self::new(DEFAULT_HASHTAG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashtag_match_ignores_case() {
        let tag = Hashtag::new("#ShowTitrVibe");
        assert!(tag.matches("Watch this #SHOWTITRVIBE tonight"));
        assert!(tag.matches("#showtitrvibe"));
        assert!(!tag.matches("#showtitr vibe"));
    }

    #[test]
    fn record_json_repeats_text_and_omits_missing_link() {
        let post = Post::new("7", 7, "A #showtitrvibe", PostKind::Photo, None);
        let v = serde_json::to_value(&post).unwrap();
        assert_eq!(v["id"], "7");
        assert_eq!(v["message_id"], 7);
        assert_eq!(v["text"], "A #showtitrvibe");
        assert_eq!(v["caption"], v["text"]);
        assert_eq!(v["content"], v["text"]);
        assert_eq!(v["type"], "photo");
        assert!(v.get("link").is_none());
    }

    #[test]
    fn file_id_stays_out_of_feed_record() {
        let post = Post::new("c_1", 1, "A #showtitrvibe", PostKind::Photo, None)
            .with_file_id(Some("AgACAgIAAx0".to_string()));
        assert_eq!(post.file_id.as_deref(), Some("AgACAgIAAx0"));
        let v = serde_json::to_value(&post).unwrap();
        assert!(v.get("file_id").is_none());

        let blank = Post::new("c_2", 2, "B", PostKind::Text, None).with_file_id(Some(String::new()));
        assert_eq!(blank.file_id, None);
    }

    #[test]
    fn reply_text_appends_link() {
        let post = Post::new(
            "1",
            1,
            "Film #showtitrvibe",
            PostKind::Video,
            Some("https://t.me/titr/1".to_string()),
        );
        assert_eq!(
            post.reply_text(),
            "🎥 Film #showtitrvibe\n\nhttps://t.me/titr/1"
        );
    }

    #[test]
    fn unknown_kind_is_text() {
        assert_eq!(PostKind::parse_lenient("VIDEO"), PostKind::Video);
        assert_eq!(PostKind::parse_lenient("audio"), PostKind::Text);
    }
}
