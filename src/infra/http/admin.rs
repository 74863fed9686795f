//! Operator endpoints, served on their own listener.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::application::repos::HealthRepo;
use crate::cache::CacheState;

use super::db_health_response;
use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct AdminState {
    pub health: Arc<dyn HealthRepo>,
    pub cache: CacheState,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/_health/db", get(admin_health))
        .route("/cache/clear", post(clear_cache))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn admin_health(State(state): State<AdminState>) -> Response {
    db_health_response(state.health.ping().await)
}

async fn clear_cache(State(state): State<AdminState>) -> Response {
    state.cache.clear();
    StatusCode::NO_CONTENT.into_response()
}
