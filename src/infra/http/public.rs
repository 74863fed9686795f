use std::{convert::Infallible, io::ErrorKind, sync::Arc};

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, FromRequestParts, Path, State},
    http::{
        HeaderValue, Request, StatusCode,
        request::Parts,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use tracing::error;

use crate::{
    application::{
        accounts::AccountService,
        error::HttpError,
        feed::FeedService,
        follow::FollowService,
        groups::GroupService,
        pagination::parse_page_number,
        posts::PostService,
        repos::HealthRepo,
    },
    cache::{CacheState, index_cache_layer},
    infra::uploads::{UploadStorage, UploadStorageError},
};

use super::{
    actions, db_health_response,
    auth::{MaybeViewer, resolve_viewer},
    middleware::{log_responses, set_request_context},
    views::{INDEX_TITLE, PostDetailView, feed_page, group_page, profile_page},
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follow: Arc<FollowService>,
    pub groups: Arc<GroupService>,
    pub accounts: Arc<AccountService>,
    pub health: Arc<dyn HealthRepo>,
    pub upload_storage: Arc<UploadStorage>,
    pub cache: CacheState,
    pub max_request_bytes: usize,
}

pub fn build_router(state: HttpState) -> Router {
    // Only the global index is cached; every other view is rendered per request.
    let cached_routes = Router::new()
        .route("/", get(index))
        .layer(middleware::from_fn_with_state(
            state.cache.clone(),
            index_cache_layer,
        ));

    let routes = Router::new()
        .route("/group/{slug}/", get(group_posts))
        .route("/profile/{username}/", get(profile))
        .route("/posts/{post_id}/", get(post_detail))
        .route(
            "/create/",
            get(actions::create_form).post(actions::create_post),
        )
        .route(
            "/posts/{post_id}/edit/",
            get(actions::edit_form).post(actions::edit_post),
        )
        .route("/posts/{post_id}/comment/", post(actions::add_comment))
        .route("/follow/", get(actions::follow_index))
        .route(
            "/profile/{username}/follow/",
            get(actions::profile_follow).post(actions::profile_follow),
        )
        .route(
            "/profile/{username}/unfollow/",
            get(actions::profile_unfollow).post(actions::profile_unfollow),
        )
        .route("/media/{*path}", get(serve_media))
        .route("/_health/db", get(public_health));

    let body_limit = state.max_request_bytes;
    cached_routes
        .merge(routes)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_viewer))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

/// Requested page number. A repeated `page` key uses the last value, and a
/// malformed query never rejects the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct PageNumber(pub i64);

impl<S> FromRequestParts<S> for PageNumber
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(page_from_query(parts.uri.query())))
    }
}

fn page_from_query(query: Option<&str>) -> i64 {
    let raw = query.and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .filter(|(key, _)| key == "page")
            .map(|(_, value)| value.into_owned())
            .last()
    });
    parse_page_number(raw.as_deref())
}

async fn index(State(state): State<HttpState>, PageNumber(page): PageNumber) -> Response {
    match state.feed.global_feed(page).await {
        Ok(page) => Json(feed_page(INDEX_TITLE, page)).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn group_posts(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    PageNumber(page): PageNumber,
) -> Response {
    match state.feed.group_feed(&slug, page).await {
        Ok(feed) => Json(group_page(feed)).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn profile(
    State(state): State<HttpState>,
    MaybeViewer(viewer): MaybeViewer,
    Path(username): Path<String>,
    PageNumber(page): PageNumber,
) -> Response {
    let feed = match state.feed.profile_feed(&username, page).await {
        Ok(feed) => feed,
        Err(err) => return HttpError::from(err).into_response(),
    };
    let following = match state.follow.is_following(viewer.as_ref(), &feed.author).await {
        Ok(following) => following,
        Err(err) => return HttpError::from(err).into_response(),
    };
    Json(profile_page(feed, following)).into_response()
}

async fn post_detail(State(state): State<HttpState>, Path(raw_id): Path<String>) -> Response {
    let post_id = match parse_post_id(&raw_id) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };
    match state.posts.detail(post_id).await {
        Ok(detail) => Json(PostDetailView::from(detail)).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

/// Post ids in paths are integers; anything else names no post.
pub(super) fn parse_post_id(raw: &str) -> Result<i64, HttpError> {
    raw.parse::<i64>().map_err(|_| {
        HttpError::not_found(
            "infra::http::public::parse_post_id",
            format!("`{raw}` is not a post id"),
        )
    })
}

async fn serve_media(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.upload_storage.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => {
            HttpError::not_found(SOURCE, "The requested file is not available").into_response()
        }
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => {
            HttpError::not_found(SOURCE, "The requested file is not available").into_response()
        }
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored image"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read stored file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}

async fn not_found(request: Request<Body>) -> Response {
    HttpError::not_found(
        "infra::http::public::not_found",
        format!("no route for {}", request.uri().path()),
    )
    .into_response()
}
