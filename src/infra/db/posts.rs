use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use crate::application::pagination::PageWindow;
use crate::application::repos::{
    CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;
use crate::domain::posts::PostScope;

use super::types::PostRow;
use super::{PostgresRepositories, map_sqlx_error};

/// Post columns joined with author and group, read from `relation` aliased `p`.
fn post_select(relation: &str) -> String {
    format!(
        "SELECT p.id, p.author_id, u.username AS author_username, \
         p.group_id, g.slug AS group_slug, g.title AS group_title, \
         p.text, p.image, p.created_at \
         FROM {relation} \
         INNER JOIN users u ON u.id = p.author_id \
         LEFT JOIN groups g ON g.id = p.group_id"
    )
}

fn bind_size(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        scope: PostScope,
        window: &PageWindow,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(post_select("posts p"));
        qb.push(" WHERE 1=1");
        Self::apply_scope_conditions(&mut qb, scope);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        qb.push_bind(bind_size(window.limit));
        qb.push(" OFFSET ");
        qb.push_bind(bind_size(window.offset));

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p WHERE 1=1");
        Self::apply_scope_conditions(&mut qb, scope);

        let total: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(total)
    }

    async fn find_post_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let sql = format!("{} WHERE p.id = $1", post_select("posts p"));
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(PostRecord::from))
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let sql = format!(
            "WITH p AS (\
                INSERT INTO posts (author_id, group_id, text, image, created_at) \
                VALUES ($1, $2, $3, $4, $5) RETURNING *\
            ) {}",
            post_select("p")
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(params.author_id)
            .bind(params.group_id)
            .bind(&params.text)
            .bind(params.image.as_deref())
            .bind(params.created_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let sql = format!(
            "WITH p AS (\
                UPDATE posts SET group_id = $2, text = $3, image = COALESCE($4, image) \
                WHERE id = $1 RETURNING *\
            ) {}",
            post_select("p")
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(params.id)
            .bind(params.group_id)
            .bind(&params.text)
            .bind(params.image.as_deref())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.map(PostRecord::from).ok_or(RepoError::NotFound)
    }
}
