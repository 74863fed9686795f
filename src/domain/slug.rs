//! Group slug derivation and validation.
//!
//! Slugs are the public identifier of a group (`/group/{slug}/`), so they are
//! restricted to ASCII letters, digits, underscores and hyphens.

use slug::slugify;
use thiserror::Error;

pub const MAX_SLUG_LEN: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug may only contain letters, digits, underscores and hyphens")]
    InvalidCharacters,
    #[error("slug exceeds {MAX_SLUG_LEN} characters")]
    TooLong,
}

/// Derive a slug from a human-readable title.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let mut candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    if candidate.len() > MAX_SLUG_LEN {
        candidate.truncate(MAX_SLUG_LEN);
        while candidate.ends_with('-') {
            candidate.pop();
        }
    }

    Ok(candidate)
}

/// Check an explicitly supplied slug.
pub fn validate_slug(input: &str) -> Result<(), SlugError> {
    if input.is_empty() {
        return Err(SlugError::EmptyInput);
    }
    if input.len() > MAX_SLUG_LEN {
        return Err(SlugError::TooLong);
    }
    if !input
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(SlugError::InvalidCharacters);
    }
    Ok(())
}
