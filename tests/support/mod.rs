#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use time::{Duration, OffsetDateTime, macros::datetime};
use tower::ServiceExt;

use murmur::{
    application::{
        accounts::Viewer,
        groups::CreateGroupCommand,
        repos::{CreatePostParams, PostsWriteRepo},
    },
    cache::CacheConfig,
    domain::entities::{GroupRecord, PostRecord},
    infra::{
        app::{ApplicationContext, Repositories, build_application_context},
        http::{AdminState, HttpState, build_admin_router, build_router},
        memory::MemoryRepositories,
        uploads::UploadStorage,
    },
};

pub const BOUNDARY: &str = "murmur-test-boundary";

/// 2x1 GIF.
pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0c, 0x0a, 0x00, 0x3b,
];

pub struct TestApp {
    pub repos: Repositories,
    pub http: HttpState,
    pub admin: AdminState,
    pub media: TempDir,
}

pub struct TestUser {
    pub viewer: Viewer,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_cache(CacheConfig::default())
    }

    pub fn with_cache(cache: CacheConfig) -> Self {
        let media = tempfile::tempdir().expect("tempdir");
        let storage = Arc::new(UploadStorage::new(media.path().to_path_buf()).expect("storage"));
        let repos = Repositories::from_backend(Arc::new(MemoryRepositories::new()));
        let ApplicationContext {
            http_state,
            admin_state,
        } = build_application_context(&repos, storage, cache, 1024 * 1024);

        Self {
            repos,
            http: http_state,
            admin: admin_state,
            media,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.http.clone())
    }

    pub fn admin_router(&self) -> Router {
        build_admin_router(self.admin.clone())
    }

    pub async fn register(&self, username: &str) -> TestUser {
        let registration = self
            .repos
            .accounts()
            .register(username)
            .await
            .expect("register user");
        TestUser {
            viewer: Viewer::from(&registration.user),
            token: registration.token,
        }
    }

    pub async fn group(&self, title: &str, slug: &str) -> GroupRecord {
        self.repos
            .groups_service()
            .create(CreateGroupCommand {
                title: title.to_string(),
                slug: Some(slug.to_string()),
                description: String::new(),
            })
            .await
            .expect("create group")
    }

    /// Insert a post `minute` minutes after a fixed epoch.
    pub async fn post_at(
        &self,
        author: &TestUser,
        group: Option<&GroupRecord>,
        text: &str,
        minute: i64,
    ) -> PostRecord {
        self.repos
            .posts_write
            .create_post(CreatePostParams {
                author_id: author.viewer.user_id,
                group_id: group.map(|group| group.id),
                text: text.to_string(),
                image: None,
                created_at: at_minute(minute),
            })
            .await
            .expect("create post")
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router().oneshot(request).await.expect("router response")
    }

    pub async fn send_admin(&self, request: Request<Body>) -> Response<Body> {
        self.admin_router()
            .oneshot(request)
            .await
            .expect("admin response")
    }

    pub async fn get_json(&self, uri: &str, token: Option<&str>) -> Value {
        let response = self.send(get(uri, token)).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
        json_body(response).await
    }

    /// Number of files written under the media root.
    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self.media.path().join("posts"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub fn at_minute(minute: i64) -> OffsetDateTime {
    datetime!(2026-01-01 00:00 UTC) + Duration::minutes(minute)
}

fn with_token(builder: axum::http::request::Builder, token: Option<&str>) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    with_token(Request::builder().method("GET").uri(uri), token)
        .body(Body::empty())
        .expect("request")
}

pub fn post_empty(uri: &str, token: Option<&str>) -> Request<Body> {
    with_token(Request::builder().method("POST").uri(uri), token)
        .body(Body::empty())
        .expect("request")
}

pub fn post_form(uri: &str, token: Option<&str>, pairs: &[(&str, &str)]) -> Request<Body> {
    let body: String = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    with_token(Request::builder().method("POST").uri(uri), token)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .expect("request")
}

/// Multipart submission with text fields and an optional `image` file.
pub fn post_multipart(
    uri: &str,
    token: Option<&str>,
    fields: &[(&str, &str)],
    image: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, data)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    with_token(Request::builder().method("POST").uri(uri), token)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

pub async fn body_bytes(response: Response<Body>) -> axum::body::Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
}

pub async fn json_body(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
}

pub fn post_ids(page: &Value) -> Vec<i64> {
    page["posts"]
        .as_array()
        .expect("posts array")
        .iter()
        .map(|post| post["id"].as_i64().expect("post id"))
        .collect()
}
