//! Index response cache middleware.
//!
//! Serves stored `GET` responses until their TTL runs out. New posts are not
//! pushed into the cache; they show up once the entry expires or the cache is
//! cleared.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::{debug, info, instrument};

use super::{CacheConfig, keys::ResponseKey, store::CachedResponse, store::ResponseStore};

const MAX_CACHED_BODY_BYTES: usize = 1024 * 1024;

/// Shared cache state injected through router state.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<ResponseStore>,
}

impl CacheState {
    pub fn new(config: CacheConfig) -> Self {
        let store = Arc::new(ResponseStore::new(&config));
        Self { config, store }
    }

    /// Drop every stored response.
    pub fn clear(&self) {
        let dropped = self.store.len();
        self.store.invalidate_all();
        info!(target = "murmur::cache", dropped, "Cleared response cache");
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn index_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = ResponseKey::from_uri(request.uri());

    if let Some(cached) = cache.store.get(&key) {
        counter!("murmur_index_cache_hit_total").increment(1);
        debug!(cache = "index", outcome = "hit", "serving cached response");
        return build_response(cached);
    }

    counter!("murmur_index_cache_miss_total").increment(1);
    debug!(cache = "index", outcome = "miss", "cache miss, executing handler");

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
    };
    if cache.store.set(key, cached).is_some() {
        counter!("murmur_index_cache_evict_total").increment(1);
    }
    counter!("murmur_index_cache_store_total").increment(1);

    Response::from_parts(parts, Body::from(bytes))
}

fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
