use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{
        InlineQuery, InlineQueryResult, InlineQueryResultArticle, InlineQueryResultCachedDocument,
        InlineQueryResultCachedPhoto, InlineQueryResultCachedSticker,
        InlineQueryResultCachedVideo, InputMessageContent, InputMessageContentText,
    },
};

use kinotip_core::{
    domain::PostKind,
    query::{self, CachedMedia, InlineAnswer},
};

use crate::{router::AppState, with_retry};

pub async fn handle_inline_query(
    bot: Bot,
    q: InlineQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    state.cache.ensure_fresh(false).await;
    let view = state.cache.merged_view().await;

    let answer = {
        let mut rng = rand::thread_rng();
        query::resolve(&view, &q.query, state.cache.hashtag().as_str(), &mut rng)
    };
    tracing::debug!(
        query = %q.query,
        view = view.len(),
        result = %answer.id,
        cached = answer.media.is_some(),
        "inline query answered"
    );

    let result = to_result(answer);
    with_retry(|| {
        bot.answer_inline_query(q.id.clone(), vec![result.clone()])
            .cache_time(1)
            .is_personal(true)
    })
    .await?;
    Ok(())
}

fn to_result(mut answer: InlineAnswer) -> InlineQueryResult {
    match answer.media.take() {
        Some(media) => cached(answer, media),
        None => article(answer),
    }
}

fn cached(answer: InlineAnswer, media: CachedMedia) -> InlineQueryResult {
    let CachedMedia {
        kind,
        file_id,
        caption,
    } = media;

    match kind {
        PostKind::Photo => {
            let mut photo = InlineQueryResultCachedPhoto::new(answer.id, file_id).title(answer.title);
            if let Some(d) = answer.description {
                photo = photo.description(d);
            }
            if let Some(c) = caption {
                photo = photo.caption(c);
            }
            InlineQueryResult::CachedPhoto(photo)
        }
        PostKind::Document => {
            let mut doc = InlineQueryResultCachedDocument::new(answer.id, answer.title, file_id);
            if let Some(d) = answer.description {
                doc = doc.description(d);
            }
            if let Some(c) = caption {
                doc = doc.caption(c);
            }
            InlineQueryResult::CachedDocument(doc)
        }
        PostKind::Video => {
            let mut video = InlineQueryResultCachedVideo::new(answer.id, file_id, answer.title);
            if let Some(d) = answer.description {
                video = video.description(d);
            }
            if let Some(c) = caption {
                video = video.caption(c);
            }
            InlineQueryResult::CachedVideo(video)
        }
        PostKind::Sticker => {
            InlineQueryResult::CachedSticker(InlineQueryResultCachedSticker::new(answer.id, file_id))
        }
        PostKind::Text => article(answer),
    }
}

fn article(answer: InlineAnswer) -> InlineQueryResult {
    let content = InputMessageContent::Text(InputMessageContentText::new(answer.message));
    let mut article = InlineQueryResultArticle::new(answer.id, answer.title, content);
    if let Some(description) = answer.description {
        article = article.description(description);
    }
    InlineQueryResult::Article(article)
}

#[cfg(test)]
mod tests {
    use kinotip_core::domain::Post;

    use super::*;

    fn answer_for(post: &Post) -> InlineQueryResult {
        to_result(InlineAnswer::for_post(post))
    }

    #[test]
    fn text_post_becomes_article() {
        let post = Post::new(
            "3",
            3,
            "Dune #showtitrvibe",
            PostKind::Text,
            Some("https://t.me/titr/3".to_string()),
        );
        let InlineQueryResult::Article(a) = answer_for(&post) else {
            panic!("expected an article");
        };
        assert_eq!(a.id, "post_3");
        assert_eq!(a.title, "Dune #showtitrvibe");
        assert_eq!(a.description.as_deref(), Some("Dune #showtitrvibe"));
        let InputMessageContent::Text(content) = a.input_message_content else {
            panic!("expected text content");
        };
        assert_eq!(content.message_text, "📝 Dune #showtitrvibe\n\nhttps://t.me/titr/3");
    }

    #[test]
    fn no_posts_answer_is_article() {
        let InlineQueryResult::Article(a) = to_result(InlineAnswer::no_posts("#showtitrvibe")) else {
            panic!("expected an article");
        };
        assert_eq!(a.id, "no_posts");
        assert_eq!(a.title, "No recommendations yet");
        let InputMessageContent::Text(content) = a.input_message_content else {
            panic!("expected text content");
        };
        assert!(content.message_text.contains("#showtitrvibe"));
    }

    #[test]
    fn remote_media_without_file_is_article() {
        let post = Post::new("4", 4, "Alien #showtitrvibe", PostKind::Video, None);
        assert!(matches!(answer_for(&post), InlineQueryResult::Article(_)));
    }

    #[test]
    fn manual_media_maps_to_cached_results() {
        let manual = |kind| {
            Post::new("7_9", 9, "Film #showtitrvibe", kind, None)
                .with_file_id(Some("file-9".to_string()))
        };

        let InlineQueryResult::CachedPhoto(p) = answer_for(&manual(PostKind::Photo)) else {
            panic!("expected a cached photo");
        };
        assert_eq!(p.id, "post_9");
        assert_eq!(p.photo_file_id, "file-9");
        assert_eq!(p.caption.as_deref(), Some("Film #showtitrvibe"));

        let InlineQueryResult::CachedDocument(d) = answer_for(&manual(PostKind::Document)) else {
            panic!("expected a cached document");
        };
        assert_eq!(d.document_file_id, "file-9");
        assert_eq!(d.title, "Film #showtitrvibe");

        let InlineQueryResult::CachedVideo(v) = answer_for(&manual(PostKind::Video)) else {
            panic!("expected a cached video");
        };
        assert_eq!(v.video_file_id, "file-9");
        assert_eq!(v.caption.as_deref(), Some("Film #showtitrvibe"));

        let InlineQueryResult::CachedSticker(s) = answer_for(&manual(PostKind::Sticker)) else {
            panic!("expected a cached sticker");
        };
        assert_eq!(s.id, "post_9");
        assert_eq!(s.sticker_file_id, "file-9");
    }
}
