use rand::{seq::SliceRandom, Rng};

use crate::domain::{Post, PostKind};

const TITLE_MAX_CHARS: usize = 64;
const DESCRIPTION_MAX_CHARS: usize = 96;
pub const DEFAULT_TITLE: &str = "Movie recommendation";

/// Posts whose text contains `query` (case-insensitive).
///
/// A blank query, or one that matches nothing, yields the whole view: the
/// inline answer always shows something when the view is non-empty.
pub fn filter_view<'a>(view: &'a [Post], query: &str) -> Vec<&'a Post> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return view.iter().collect();
    }

    let matched: Vec<&Post> = view
        .iter()
        .filter(|p| p.text.to_lowercase().contains(&needle))
        .collect();
    if matched.is_empty() {
        return view.iter().collect();
    }
    matched
}

/// Uniformly random post from the filtered view.
pub fn pick<'a, R: Rng + ?Sized>(view: &'a [Post], query: &str, rng: &mut R) -> Option<&'a Post> {
    filter_view(view, query).choose(rng).copied()
}

/// Provider-agnostic shape of one inline answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineAnswer {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub message: String,
    /// Set when the post carries an uploaded media file that can be re-sent.
    pub media: Option<CachedMedia>,
}

/// Media already stored on Telegram's side, sent back by file id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedMedia {
    pub kind: PostKind,
    pub file_id: String,
    pub caption: Option<String>,
}

impl CachedMedia {
    fn for_post(post: &Post) -> Option<Self> {
        if post.kind == PostKind::Text {
            return None;
        }
        let file_id = post.file_id.clone()?;
        let caption = post.text.trim();
        Some(Self {
            kind: post.kind,
            file_id,
            caption: (!caption.is_empty()).then(|| caption.to_string()),
        })
    }
}

impl InlineAnswer {
    pub fn for_post(post: &Post) -> Self {
        let text = post.text.trim();
        let title = if text.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            truncate_chars(text, TITLE_MAX_CHARS)
        };
        let description = if text.is_empty() {
            None
        } else {
            Some(truncate_chars(text, DESCRIPTION_MAX_CHARS))
        };

        Self {
            id: format!("post_{}", post.message_id),
            title,
            description,
            message: post.reply_text(),
            media: CachedMedia::for_post(post),
        }
    }

    /// Shown when there is nothing to recommend.
    pub fn no_posts(hashtag: &str) -> Self {
        Self {
            id: "no_posts".to_string(),
            title: "No recommendations yet".to_string(),
            description: Some("Something broke or the feed is empty. Add posts with /add_post".to_string()),
            message: format!(
                "Sorry, there are no recommendations right now.\n\n\
                 Reply to a post tagged {hashtag} with /add_post to add one."
            ),
            media: None,
        }
    }
}

/// Resolve an inline query against the merged view.
pub fn resolve<R: Rng + ?Sized>(view: &[Post], query: &str, hashtag: &str, rng: &mut R) -> InlineAnswer {
    match pick(view, query, rng) {
        Some(post) => InlineAnswer::for_post(post),
        None => InlineAnswer::no_posts(hashtag),
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn post(id: i64, text: &str) -> Post {
        Post::new(id.to_string(), id, text, PostKind::Text, None)
    }

    #[test]
    fn single_post_is_always_picked() {
        let view = vec![post(1, "A #showtitrvibe")];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            assert_eq!(pick(&view, "", &mut rng).map(|p| p.message_id), Some(1));
        }
    }

    #[test]
    fn filter_is_subset_or_full_view() {
        let view = vec![
            post(1, "Dune #showtitrvibe"),
            post(2, "Alien #showtitrvibe"),
            post(3, "Dune part two #showtitrvibe"),
        ];

        let hits = filter_view(&view, "  DUNE ");
        let ids: Vec<i64> = hits.iter().map(|p| p.message_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(hits.iter().all(|h| view.contains(*h)));

        let fallback = filter_view(&view, "matrix");
        assert_eq!(fallback.len(), view.len());
    }

    #[test]
    fn empty_view_picks_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(pick(&[], "dune", &mut rng).is_none());
        let answer = resolve(&[], "", "#showtitrvibe", &mut rng);
        assert_eq!(answer.id, "no_posts");
        assert!(answer.message.contains("#showtitrvibe"));
    }

    #[test]
    fn pick_reaches_every_match() {
        let view = vec![post(1, "a #x"), post(2, "b #x"), post(3, "c #x")];
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = [false; 3];
        for _ in 0..200 {
            let p = pick(&view, "", &mut rng).unwrap();
            seen[(p.message_id - 1) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn answer_truncates_title_and_description() {
        let long = "я".repeat(150);
        let answer = InlineAnswer::for_post(&post(9, &long));
        assert_eq!(answer.id, "post_9");
        assert_eq!(answer.title.chars().count(), 64);
        assert_eq!(answer.description.unwrap().chars().count(), 96);
        assert!(answer.message.starts_with("📝 "));
    }

    #[test]
    fn media_posts_carry_cached_file() {
        let photo = Post::new("c_5", 5, " Dune #showtitrvibe ", PostKind::Photo, None)
            .with_file_id(Some("photo-id".to_string()));
        assert_eq!(
            InlineAnswer::for_post(&photo).media,
            Some(CachedMedia {
                kind: PostKind::Photo,
                file_id: "photo-id".to_string(),
                caption: Some("Dune #showtitrvibe".to_string()),
            })
        );

        // Channel posts have no file id and text never becomes media.
        let remote = Post::new("6", 6, "Alien #showtitrvibe", PostKind::Video, None);
        assert_eq!(InlineAnswer::for_post(&remote).media, None);
        let text = post(7, "x").with_file_id(Some("stray".to_string()));
        assert_eq!(InlineAnswer::for_post(&text).media, None);
    }
}
