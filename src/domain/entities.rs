//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub token_prefix: String,
    #[serde(skip)]
    pub token_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRecord {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
}

/// Group columns joined onto a post row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostGroup {
    pub id: i64,
    pub slug: String,
    pub title: String,
}

impl From<&GroupRecord> for PostGroup {
    fn from(group: &GroupRecord) -> Self {
        Self {
            id: group.id,
            slug: group.slug.clone(),
            title: group.title.clone(),
        }
    }
}

/// A post with its author and group pre-joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    pub id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub group: Option<PostGroup>,
    pub text: String,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRecord {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub text: String,
    pub created_at: OffsetDateTime,
}
