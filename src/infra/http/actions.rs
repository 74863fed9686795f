//! Handlers that require a signed-in caller.
//!
//! The [`SignedIn`] extractor runs before any body extractor, so anonymous
//! requests are redirected before the payload is read.

use axum::{
    Form, Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::application::{
    error::HttpError,
    follow::{FollowError, FollowOutcome, UnfollowOutcome},
    posts::PostError,
};

use super::{
    HttpState, post_path, profile_path,
    auth::SignedIn,
    forms::{CommentFields, PostSubmission},
    public::{PageNumber, parse_post_id},
    views::{FOLLOW_TITLE, FormValuesView, GroupView, PostFormView, feed_page},
};

const SOURCE: &str = "infra::http::actions";
const INDEX_PATH: &str = "/";

pub(super) async fn create_form(
    State(state): State<HttpState>,
    SignedIn(_viewer): SignedIn,
) -> Response {
    match form_view(&state, None).await {
        Ok(view) => Json(view).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(super) async fn create_post(
    State(state): State<HttpState>,
    SignedIn(viewer): SignedIn,
    PostSubmission(form): PostSubmission,
) -> Response {
    match state.posts.create(&viewer, form).await {
        Ok(_) => Redirect::to(&profile_path(&viewer.username)).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    SignedIn(viewer): SignedIn,
    Path(raw_id): Path<String>,
) -> Response {
    let post_id = match parse_post_id(&raw_id) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };
    let values = match state.posts.edit_form(&viewer, post_id).await {
        Ok(values) => values,
        Err(PostError::NotAuthor { .. }) => return Redirect::to(&post_path(post_id)).into_response(),
        Err(err) => return HttpError::from(err).into_response(),
    };
    match form_view(&state, Some(FormValuesView::from(values))).await {
        Ok(view) => Json(view).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(super) async fn edit_post(
    State(state): State<HttpState>,
    SignedIn(viewer): SignedIn,
    Path(raw_id): Path<String>,
    PostSubmission(form): PostSubmission,
) -> Response {
    let post_id = match parse_post_id(&raw_id) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };
    match state.posts.edit(&viewer, post_id, form).await {
        Ok(_) | Err(PostError::NotAuthor { .. }) => Redirect::to(&post_path(post_id)).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    SignedIn(viewer): SignedIn,
    Path(raw_id): Path<String>,
    Form(fields): Form<CommentFields>,
) -> Response {
    let post_id = match parse_post_id(&raw_id) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };
    match state.posts.add_comment(&viewer, post_id, &fields.text).await {
        Ok(_) => Redirect::to(&post_path(post_id)).into_response(),
        Err(PostError::Invalid(errors)) => {
            debug!(target = SOURCE, post_id, %errors, "Ignored blank comment");
            Redirect::to(&post_path(post_id)).into_response()
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn follow_index(
    State(state): State<HttpState>,
    SignedIn(viewer): SignedIn,
    PageNumber(page): PageNumber,
) -> Response {
    match state.feed.follower_feed(&viewer, page).await {
        Ok(page) => Json(feed_page(FOLLOW_TITLE, page)).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn profile_follow(
    State(state): State<HttpState>,
    SignedIn(viewer): SignedIn,
    Path(username): Path<String>,
) -> Response {
    match state.follow.follow(&viewer, &username).await {
        Ok(FollowOutcome::Followed) | Err(FollowError::SelfFollow) => {
            Redirect::to(&profile_path(&username)).into_response()
        }
        Ok(FollowOutcome::AlreadyFollowing) => Redirect::to(INDEX_PATH).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn profile_unfollow(
    State(state): State<HttpState>,
    SignedIn(viewer): SignedIn,
    Path(username): Path<String>,
) -> Response {
    match state.follow.unfollow(&viewer, &username).await {
        Ok(UnfollowOutcome::Unfollowed | UnfollowOutcome::NotFollowing) => {
            Redirect::to(&profile_path(&username)).into_response()
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn form_view(
    state: &HttpState,
    values: Option<FormValuesView>,
) -> Result<PostFormView, HttpError> {
    let groups = state.groups.list().await?;
    Ok(PostFormView {
        is_edit: values.is_some(),
        groups: groups.into_iter().map(GroupView::from).collect(),
        values,
    })
}
