mod support;

use axum::http::StatusCode;
use murmur::cache::CacheConfig;
use support::{TestApp, body_bytes, get, post_empty, post_form, post_ids};

#[tokio::test]
async fn new_posts_appear_on_the_index_only_after_clearing() {
    let app = TestApp::new();
    let leo = app.register("leo").await;
    let old = app.post_at(&leo, None, "old news", 1).await;

    let before = body_bytes(app.send(get("/", None)).await).await;
    let first: serde_json::Value = serde_json::from_slice(&before).expect("json body");
    assert_eq!(post_ids(&first), vec![old.id]);

    let response = app
        .send(post_form("/create/", Some(&leo.token), &[("text", "fresh")]))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // Still the cached rendering, byte for byte.
    let after = body_bytes(app.send(get("/", None)).await).await;
    assert_eq!(after, before);
    // Uncached views see the new post immediately.
    assert_eq!(app.get_json("/profile/leo/", None).await["posts"][0]["text"], "fresh");

    let response = app.send_admin(post_empty("/cache/clear", None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let index = app.get_json("/", None).await;
    assert_eq!(index["posts"][0]["text"], "fresh");
    assert_eq!(index["posts"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn each_query_string_is_cached_separately() {
    let app = TestApp::new();
    let leo = app.register("leo").await;
    for minute in 0..11 {
        app.post_at(&leo, None, "text", minute).await;
    }

    let first = app.get_json("/", None).await;
    let second = app.get_json("/?page=2", None).await;
    assert_eq!(first["page"]["number"], 1);
    assert_eq!(second["page"]["number"], 2);
    assert_eq!(app.http.cache.store.len(), 2);
}

#[tokio::test]
async fn disabled_cache_always_renders() {
    let app = TestApp::with_cache(CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    });
    let leo = app.register("leo").await;

    assert_eq!(app.get_json("/", None).await["posts"].as_array().unwrap().len(), 0);
    app.post_at(&leo, None, "visible at once", 1).await;
    assert_eq!(app.get_json("/", None).await["posts"].as_array().unwrap().len(), 1);
    assert!(app.http.cache.store.is_empty());
}

#[tokio::test]
async fn clearing_through_state_empties_the_store() {
    let app = TestApp::new();
    app.get_json("/", None).await;
    assert_eq!(app.http.cache.store.len(), 1);

    app.http.cache.clear();
    assert!(app.http.cache.store.is_empty());
}
