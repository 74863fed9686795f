use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderValue, Request, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use metrics::counter;
use tracing::warn;

use crate::application::accounts::Viewer;

use super::HttpState;

pub(crate) const LOGIN_PATH: &str = "/auth/login/";

/// Caller identity resolved for the current request. `None` is anonymous.
#[derive(Debug, Clone, Default)]
pub(crate) struct CurrentViewer(pub Option<Viewer>);

/// Resolve the bearer token, if any. Bad tokens downgrade the request to
/// anonymous instead of failing it.
pub(crate) async fn resolve_viewer(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = extract_token(request.headers().get(AUTHORIZATION)).map(str::to_owned);
    let viewer = match token {
        Some(token) => match state.accounts.authenticate(&token).await {
            Ok(viewer) => Some(viewer),
            Err(err) => {
                counter!("murmur_auth_rejected_total").increment(1);
                warn!(
                    target = "murmur::auth",
                    path = %request.uri().path(),
                    error = %err,
                    "Rejected access token"
                );
                None
            }
        },
        None => None,
    };

    let current = CurrentViewer(viewer);
    request.extensions_mut().insert(current.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(current);
    response
}

fn extract_token(header: Option<&HeaderValue>) -> Option<&str> {
    let raw = header?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Optional caller identity.
#[derive(Debug, Clone)]
pub(crate) struct MaybeViewer(pub Option<Viewer>);

impl<S> FromRequestParts<S> for MaybeViewer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let viewer = parts
            .extensions
            .get::<CurrentViewer>()
            .and_then(|current| current.0.clone());
        Ok(Self(viewer))
    }
}

/// A signed-in caller. Anonymous requests are redirected to the login page
/// before the handler runs.
#[derive(Debug, Clone)]
pub(crate) struct SignedIn(pub Viewer);

impl<S> FromRequestParts<S> for SignedIn
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts
            .extensions
            .get::<CurrentViewer>()
            .and_then(|current| current.0.clone())
        {
            Some(viewer) => Ok(Self(viewer)),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|value| value.as_str())
                    .unwrap_or("/");
                Err(login_redirect(next).into_response())
            }
        }
    }
}

pub(crate) fn login_redirect(next: &str) -> Redirect {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    Redirect::to(&format!("{LOGIN_PATH}?next={encoded}"))
}
