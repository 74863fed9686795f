mod support;

use axum::http::StatusCode;
use murmur::application::{
    posts::{PostError, PostForm},
    repos::{CommentsRepo, PostsRepo},
};
use murmur::domain::posts::PostScope;
use serde_json::json;
use support::{SMALL_GIF, TestApp, get, json_body, location, post_form, post_multipart};

async fn post_count(app: &TestApp) -> u64 {
    app.repos.posts.count_posts(PostScope::All).await.unwrap()
}

#[tokio::test]
async fn create_post_redirects_to_author_profile() {
    let app = TestApp::new();
    let leo = app.register("leo").await;
    let cats = app.group("Cats", "cats").await;

    let response = app
        .send(post_form(
            "/create/",
            Some(&leo.token),
            &[("text", "  hello cats  "), ("group", &cats.id.to_string())],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/leo/");

    let profile = app.get_json("/profile/leo/", None).await;
    assert_eq!(profile["posts"][0]["text"], "hello cats");
    assert_eq!(profile["posts"][0]["group"]["slug"], "cats");
    assert_eq!(profile["posts"][0]["image"], json!(null));
}

#[tokio::test]
async fn create_form_lists_groups_by_title() {
    let app = TestApp::new();
    let leo = app.register("leo").await;
    app.group("Zebras", "zebras").await;
    app.group("Ants", "ants").await;

    let form = app.get_json("/create/", Some(&leo.token)).await;
    assert_eq!(form["is_edit"], false);
    let titles: Vec<_> = form["groups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|group| group["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["Ants", "Zebras"]);
}

#[tokio::test]
async fn invalid_submission_reports_every_field_and_writes_nothing() {
    let app = TestApp::new();
    let leo = app.register("leo").await;

    let response = app
        .send(post_multipart(
            "/create/",
            Some(&leo.token),
            &[("text", "   "), ("group", "999")],
            Some(("notes.txt", b"plain text, not an image")),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["errors"]["text"], json!(["this field is required"]));
    assert!(body["errors"]["group"].is_array());
    assert!(body["errors"]["image"].is_array());

    assert_eq!(post_count(&app).await, 0);
    assert_eq!(app.stored_files(), 0);
}

#[tokio::test]
async fn image_upload_is_stored_and_served() {
    let app = TestApp::new();
    let leo = app.register("leo").await;

    let response = app
        .send(post_multipart(
            "/create/",
            Some(&leo.token),
            &[("text", "with a picture"), ("group", "")],
            Some(("Small.gif", SMALL_GIF)),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.stored_files(), 1);

    let page = app.get_json("/", None).await;
    let image = page["posts"][0]["image"].as_str().expect("image url").to_string();
    assert!(image.starts_with("/media/posts/"));
    assert!(image.ends_with("-small.gif"));

    let response = app.send(get(&image, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/gif");
}

#[tokio::test]
async fn anonymous_writes_redirect_to_login_and_change_nothing() {
    let app = TestApp::new();
    let leo = app.register("leo").await;
    let post = app.post_at(&leo, None, "original", 1).await;

    let attempts = [
        post_form("/create/", None, &[("text", "sneaky")]),
        post_form(&format!("/posts/{}/edit/", post.id), None, &[("text", "sneaky")]),
        post_form(&format!("/posts/{}/comment/", post.id), None, &[("text", "sneaky")]),
    ];
    for request in attempts {
        let uri = request.uri().to_string();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert!(location(&response).starts_with("/auth/login/?next="), "{uri}");
    }

    assert_eq!(post_count(&app).await, 1);
    assert!(app.repos.comments.list_comments(post.id).await.unwrap().is_empty());
    let stored = app.repos.posts.find_post_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "original");
}

#[tokio::test]
async fn only_the_author_may_edit() {
    let app = TestApp::new();
    let leo = app.register("leo").await;
    let mia = app.register("mia").await;
    let post = app.post_at(&leo, None, "original", 1).await;
    let edit_uri = format!("/posts/{}/edit/", post.id);

    let response = app.send(get(&edit_uri, Some(&mia.token))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));

    let response = app
        .send(post_form(&edit_uri, Some(&mia.token), &[("text", "hijacked")]))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));

    let stored = app.repos.posts.find_post_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "original");

    let form = PostForm {
        text: "hijacked".to_string(),
        ..PostForm::default()
    };
    let result = app.http.posts.edit(&mia.viewer, post.id, form).await;
    assert!(matches!(result, Err(PostError::NotAuthor { post_id }) if post_id == post.id));
}

#[tokio::test]
async fn author_edit_updates_text_and_keeps_image() {
    let app = TestApp::new();
    let leo = app.register("leo").await;
    let cats = app.group("Cats", "cats").await;

    app.send(post_multipart(
        "/create/",
        Some(&leo.token),
        &[("text", "first draft")],
        Some(("cat.gif", SMALL_GIF)),
    ))
    .await;
    let created = app.get_json("/", None).await;
    let post_id = created["posts"][0]["id"].as_i64().unwrap();
    let image = created["posts"][0]["image"].clone();

    let edit_uri = format!("/posts/{post_id}/edit/");
    let form = app.get_json(&edit_uri, Some(&leo.token)).await;
    assert_eq!(form["is_edit"], true);
    assert_eq!(form["values"]["text"], "first draft");
    assert_eq!(form["values"]["image"], image);

    let response = app
        .send(post_form(
            &edit_uri,
            Some(&leo.token),
            &[("text", "second draft"), ("group", &cats.id.to_string())],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{post_id}/"));

    let detail = app.get_json(&format!("/posts/{post_id}/"), None).await;
    assert_eq!(detail["post"]["text"], "second draft");
    assert_eq!(detail["post"]["group"]["slug"], "cats");
    assert_eq!(detail["post"]["image"], image);
}

#[tokio::test]
async fn author_edit_with_invalid_text_is_rejected() {
    let app = TestApp::new();
    let leo = app.register("leo").await;
    let post = app.post_at(&leo, None, "original", 1).await;

    let response = app
        .send(post_form(
            &format!("/posts/{}/edit/", post.id),
            Some(&leo.token),
            &[("text", "")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let stored = app.repos.posts.find_post_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "original");
}

#[tokio::test]
async fn comments_are_listed_oldest_first() {
    let app = TestApp::new();
    let leo = app.register("leo").await;
    let mia = app.register("mia").await;
    let post = app.post_at(&leo, None, "discuss", 1).await;
    let comment_uri = format!("/posts/{}/comment/", post.id);

    for (user, text) in [(&mia, "first!"), (&leo, "thanks"), (&mia, "  ")] {
        let response = app
            .send(post_form(&comment_uri, Some(&user.token), &[("text", text)]))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), format!("/posts/{}/", post.id));
    }

    let detail = app.get_json(&format!("/posts/{}/", post.id), None).await;
    let comments: Vec<_> = detail["comments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|comment| (comment["author"].clone(), comment["text"].clone()))
        .collect();
    assert_eq!(
        comments,
        vec![
            (json!("mia"), json!("first!")),
            (json!("leo"), json!("thanks")),
        ]
    );
}

#[tokio::test]
async fn unknown_posts_are_not_found() {
    let app = TestApp::new();
    let leo = app.register("leo").await;

    for uri in ["/posts/42/", "/posts/not-a-number/"] {
        let response = app.send(get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }

    let response = app
        .send(post_form("/posts/42/comment/", Some(&leo.token), &[("text", "hi")]))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.send(get("/posts/42/edit/", Some(&leo.token))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
