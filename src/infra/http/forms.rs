//! Form payloads accepted by the write endpoints.

use axum::{
    Form,
    extract::{FromRequest, Request},
    http::{StatusCode, header::CONTENT_TYPE},
};
use axum_extra::extract::Multipart;
use bytes::Bytes;
use serde::Deserialize;
use tracing::error;

use crate::application::{
    error::HttpError,
    posts::{ImageUpload, PostForm},
};

const SOURCE: &str = "infra::http::forms";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostFields {
    text: String,
    group: Option<String>,
}

/// A post submission, either `multipart/form-data` (with an optional `image`
/// file) or urlencoded text fields.
#[derive(Debug)]
pub(crate) struct PostSubmission(pub PostForm);

impl<S> FromRequest<S> for PostSubmission
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_multipart(&request) {
            let multipart = Multipart::from_request(request, state)
                .await
                .map_err(|err| bad_form(err.to_string()))?;
            return read_multipart(multipart).await.map(Self);
        }

        let Form(fields) = Form::<PostFields>::from_request(request, state)
            .await
            .map_err(|err| bad_form(err.body_text()))?;
        Ok(Self(PostForm {
            text: fields.text,
            group: fields.group,
            image: None,
        }))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CommentFields {
    pub text: String,
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

async fn read_multipart(mut multipart: Multipart) -> Result<PostForm, HttpError> {
    let mut form = PostForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                let status = err.status();
                error!(
                    target = SOURCE,
                    status = status.as_u16(),
                    error = %err,
                    "failed to read multipart payload"
                );
                return Err(match status {
                    StatusCode::PAYLOAD_TOO_LARGE => HttpError::new(
                        SOURCE,
                        StatusCode::PAYLOAD_TOO_LARGE,
                        "Upload is too large",
                        err.to_string(),
                    ),
                    _ => bad_form(err.to_string()),
                });
            }
        };

        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("text") => {
                form.text = field.text().await.map_err(|err| bad_form(err.to_string()))?;
            }
            Some("group") => {
                let value = field.text().await.map_err(|err| bad_form(err.to_string()))?;
                form.group = Some(value);
            }
            Some("image") => {
                let file_name = field
                    .file_name()
                    .map(|value| value.trim().to_string())
                    .unwrap_or_default();
                let data: Bytes = field.bytes().await.map_err(|err| bad_form(err.to_string()))?;
                form.image = Some(ImageUpload { file_name, data });
            }
            _ => continue,
        }
    }

    Ok(form)
}

fn bad_form(detail: String) -> HttpError {
    HttpError::new(
        SOURCE,
        StatusCode::BAD_REQUEST,
        "Form data was invalid",
        detail,
    )
}
