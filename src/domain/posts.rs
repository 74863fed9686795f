//! Post and comment rules shared by every storage backend.

use std::cmp::Ordering;

use super::entities::{CommentRecord, PostRecord};
use super::error::DomainError;

/// Which posts a listing covers. Every scope is ordered with [`newest_first`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    All,
    Group(i64),
    Author(i64),
    /// Posts whose author is followed by the given user.
    FollowedBy(i64),
}

/// Reverse-chronological order; later insertion wins a timestamp tie.
pub fn newest_first(a: &PostRecord, b: &PostRecord) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Comments read top to bottom in the order they were written.
pub fn oldest_comment_first(a: &CommentRecord, b: &CommentRecord) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Normalize a submitted text body. Surrounding whitespace is dropped and the
/// remainder must not be empty.
pub fn clean_text(field: &'static str, raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "this field is required"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;
    use time::macros::datetime;

    use super::*;

    fn post(id: i64, created_at: OffsetDateTime) -> PostRecord {
        PostRecord {
            id,
            author_id: 1,
            author_username: "author".to_string(),
            group: None,
            text: format!("post {id}"),
            image: None,
            created_at,
        }
    }

    #[test]
    fn newest_first_orders_by_timestamp_then_id() {
        let mut posts = vec![
            post(1, datetime!(2024-01-01 00:00 UTC)),
            post(3, datetime!(2024-01-02 00:00 UTC)),
            post(2, datetime!(2024-01-02 00:00 UTC)),
        ];
        posts.sort_by(newest_first);

        let ids: Vec<i64> = posts.iter().map(|post| post.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn clean_text_trims_and_rejects_blank() {
        assert_eq!(clean_text("text", "  hello \n").unwrap(), "hello");

        let err = clean_text("text", " \t\n").expect_err("blank text rejected");
        assert!(matches!(err, DomainError::Validation { field: "text", .. }));
    }
}
