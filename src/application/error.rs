use std::collections::BTreeMap;
use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::{
    application::{
        accounts::AccountError, feed::FeedError, follow::FollowError, groups::GroupError,
        posts::PostError, repos::RepoError,
    },
    domain::error::DomainError,
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Per-field validation messages, serialized as `{ "errors": { field: [msg] } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    errors: BTreeMap<&'static str, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.entry(field).or_default().push(message.into());
    }

    pub fn record(&mut self, error: DomainError) {
        match error {
            DomainError::Validation { field, message } => self.push(field, message),
            other => self.push("__all__", other.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.errors.keys().copied()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl From<DomainError> for FieldErrors {
    fn from(error: DomainError) -> Self {
        let mut errors = Self::new();
        errors.record(error);
        errors
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    fields: Option<FieldErrors>,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            fields: None,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            fields: None,
            report,
        }
    }

    pub fn validation(source: &'static str, fields: FieldErrors) -> Self {
        let report = ErrorReport::from_message(source, StatusCode::BAD_REQUEST, fields.to_string());
        Self {
            status: StatusCode::BAD_REQUEST,
            public_message: "Request could not be processed",
            fields: Some(fields),
            report,
        }
    }

    pub fn not_found(source: &'static str, detail: impl Into<String>) -> Self {
        Self::new(source, StatusCode::NOT_FOUND, "Not found", detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn internal(source: &'static str, error: &dyn StdError) -> Self {
        Self::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            error,
        )
    }

    /// Map a repository failure onto a consistent status code.
    pub fn from_repo(source: &'static str, err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { constraint } => {
                HttpError::new(source, StatusCode::CONFLICT, "Duplicate record", constraint)
            }
            RepoError::NotFound => HttpError::new(
                source,
                StatusCode::NOT_FOUND,
                "Not found",
                "resource not found",
            ),
            RepoError::InvalidInput { message } => {
                HttpError::new(source, StatusCode::BAD_REQUEST, "Invalid input", message)
            }
            RepoError::Integrity { message } => HttpError::new(
                source,
                StatusCode::CONFLICT,
                "Integrity constraint violated",
                message,
            ),
            RepoError::Timeout => HttpError::new(
                source,
                StatusCode::SERVICE_UNAVAILABLE,
                "Database timeout",
                "Database timeout",
            ),
            RepoError::Persistence(message) => HttpError::new(
                source,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                message,
            ),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = match self.fields {
            Some(fields) => json!(fields),
            None => json!({ "error": self.public_message }),
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<FeedError> for HttpError {
    fn from(error: FeedError) -> Self {
        const SOURCE: &str = "infra::http::feed_error_to_http_error";
        match error {
            FeedError::UnknownGroup(_) | FeedError::UnknownAuthor(_) => {
                HttpError::not_found(SOURCE, error.to_string())
            }
            FeedError::Repo(err) => HttpError::from_repo(SOURCE, err),
        }
    }
}

impl From<FollowError> for HttpError {
    fn from(error: FollowError) -> Self {
        const SOURCE: &str = "infra::http::follow_error_to_http_error";
        match error {
            FollowError::UnknownAuthor(_) => HttpError::not_found(SOURCE, error.to_string()),
            FollowError::SelfFollow => HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Cannot follow yourself",
                error.to_string(),
            ),
            FollowError::Repo(err) => HttpError::from_repo(SOURCE, err),
        }
    }
}

impl From<PostError> for HttpError {
    fn from(error: PostError) -> Self {
        const SOURCE: &str = "infra::http::post_error_to_http_error";
        match error {
            PostError::NotFound(_) => HttpError::not_found(SOURCE, error.to_string()),
            PostError::NotAuthor { .. } => HttpError::new(
                SOURCE,
                StatusCode::FORBIDDEN,
                "Only the author may change this post",
                error.to_string(),
            ),
            PostError::Invalid(fields) => HttpError::validation(SOURCE, fields),
            PostError::Upload(err) => HttpError::internal(SOURCE, &err),
            PostError::Repo(err) => HttpError::from_repo(SOURCE, err),
        }
    }
}

impl From<AccountError> for HttpError {
    fn from(error: AccountError) -> Self {
        const SOURCE: &str = "infra::http::account_error_to_http_error";
        match error {
            AccountError::Invalid(err) => HttpError::validation(SOURCE, FieldErrors::from(err)),
            AccountError::Duplicate(_) => HttpError::new(
                SOURCE,
                StatusCode::CONFLICT,
                "Username already taken",
                error.to_string(),
            ),
            AccountError::InvalidToken => HttpError::new(
                SOURCE,
                StatusCode::UNAUTHORIZED,
                "Invalid access token",
                error.to_string(),
            ),
            AccountError::Repo(err) => HttpError::from_repo(SOURCE, err),
        }
    }
}

impl From<GroupError> for HttpError {
    fn from(error: GroupError) -> Self {
        const SOURCE: &str = "infra::http::group_error_to_http_error";
        match error {
            GroupError::Invalid(err) => HttpError::validation(SOURCE, FieldErrors::from(err)),
            GroupError::Duplicate(_) => HttpError::new(
                SOURCE,
                StatusCode::CONFLICT,
                "Group slug already taken",
                error.to_string(),
            ),
            GroupError::Repo(err) => HttpError::from_repo(SOURCE, err),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
