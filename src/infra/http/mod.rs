mod actions;
mod admin;
mod auth;
mod forms;
mod middleware;
mod public;
mod views;

pub use admin::{AdminState, build_admin_router};
pub use public::{HttpState, build_router};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Path of a profile page, safe to place in a `Location` header.
pub(crate) fn profile_path(username: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(username.as_bytes()).collect();
    format!("/profile/{encoded}/")
}

pub(crate) fn post_path(post_id: i64) -> String {
    format!("/posts/{post_id}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_path_escapes_reserved_characters() {
        assert_eq!(profile_path("leo"), "/profile/leo/");
        assert_eq!(profile_path("leo@home"), "/profile/leo%40home/");
        assert_eq!(profile_path("лев"), "/profile/%D0%BB%D0%B5%D0%B2/");
    }

    #[test]
    fn failed_health_check_attaches_report() {
        let response = db_health_response(Err(RepoError::Timeout));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let report = response.extensions().get::<ErrorReport>().expect("report");
        assert_eq!(report.messages, vec!["database timeout".to_string()]);
    }
}
