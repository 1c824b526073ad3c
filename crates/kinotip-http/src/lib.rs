//! Feed HTTP server (actix-web).
//!
//! Two read-only routes over the collector's snapshot store: `GET /feed`
//! returns the posts as JSON, `GET /` a greeting.

use std::{net::SocketAddr, sync::Arc};

use actix_web::{dev::Server, get, web, App, HttpResponse, HttpServer, Responder};
use serde::Serialize;

use kinotip_core::{domain::Post, store::SnapshotStore, Result};

pub const GREETING: &str =
    "Hi! This is the Titr show parser. Grab fresh posts at /feed and enjoy the vibe ✨";

#[derive(Serialize)]
struct FeedBody<'a> {
    posts: &'a [Post],
}

#[get("/feed")]
async fn feed(store: web::Data<SnapshotStore>) -> impl Responder {
    let snapshot = store.snapshot().await;
    HttpResponse::Ok().json(FeedBody { posts: &snapshot })
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(GREETING)
}

/// Register the feed routes; shared by the server and tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(feed).service(index);
}

/// Bind the server. The returned `Server` must be awaited (or spawned) to run.
pub fn bind(addr: SocketAddr, store: Arc<SnapshotStore>) -> Result<Server> {
    let data = web::Data::from(store);
    let server = HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
        .workers(2)
        .disable_signals()
        .bind(addr)?
        .run();
    tracing::info!(%addr, "feed server listening");
    Ok(server)
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::Value;

    use super::*;
    use kinotip_core::domain::PostKind;

    fn app_store(posts: Vec<Post>) -> web::Data<SnapshotStore> {
        web::Data::from(Arc::new(SnapshotStore::with_posts(posts)))
    }

    #[actix_web::test]
    async fn feed_returns_posts_wrapper() {
        let store = app_store(vec![Post::new(
            "1",
            1,
            "A #showtitrvibe",
            PostKind::Text,
            Some("https://t.me/titr/1".to_string()),
        )]);
        let app = test::init_service(App::new().app_data(store).configure(configure)).await;

        let req = test::TestRequest::get().uri("/feed").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let posts = body["posts"].as_array().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["id"], "1");
        assert_eq!(posts[0]["message_id"], 1);
        assert_eq!(posts[0]["caption"], "A #showtitrvibe");
        assert_eq!(posts[0]["type"], "text");
        assert_eq!(posts[0]["link"], "https://t.me/titr/1");
    }

    #[actix_web::test]
    async fn empty_store_serves_empty_list() {
        let app =
            test::init_service(App::new().app_data(app_store(Vec::new())).configure(configure))
                .await;
        let req = test::TestRequest::get().uri("/feed").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, serde_json::json!({"posts": []}));
    }

    #[actix_web::test]
    async fn feed_reflects_replaced_snapshot() {
        let store = Arc::new(SnapshotStore::new());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::from(store.clone()))
                .configure(configure),
        )
        .await;

        store
            .replace(vec![Post::new("5", 5, "#showtitrvibe", PostKind::Photo, None)])
            .await;
        let req = test::TestRequest::get().uri("/feed").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["posts"][0]["message_id"], 5);
    }

    #[actix_web::test]
    async fn index_greets() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        assert_eq!(body, GREETING.as_bytes());
    }
}
