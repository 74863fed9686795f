use async_trait::async_trait;

use crate::application::repos::{CommentsRepo, CreateCommentParams, RepoError};
use crate::domain::entities::CommentRecord;

use super::types::CommentRow;
use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            "SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.text, c.created_at \
             FROM comments c \
             INNER JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = $1 \
             ORDER BY c.created_at ASC, c.id ASC",
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(
            "WITH c AS (\
                INSERT INTO comments (post_id, author_id, text, created_at) \
                VALUES ($1, $2, $3, $4) RETURNING *\
             ) \
             SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.text, c.created_at \
             FROM c INNER JOIN users u ON u.id = c.author_id",
        )
        .bind(params.post_id)
        .bind(params.author_id)
        .bind(&params.text)
        .bind(params.created_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(CommentRecord::from(row))
    }
}
