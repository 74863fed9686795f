//! Response cache keys.

use axum::http::Uri;

/// Identifies one cached response: the request path plus its raw query string.
/// Responses never vary per user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    pub path: String,
    pub query: String,
}

impl ResponseKey {
    pub fn from_uri(uri: &Uri) -> Self {
        Self {
            path: uri.path().to_string(),
            query: uri.query().unwrap_or("").to_string(),
        }
    }
}
