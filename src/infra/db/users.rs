use async_trait::async_trait;

use crate::application::repos::{CreateUserParams, RepoError, UsersRepo, UsersWriteRepo};
use crate::domain::entities::UserRecord;

use super::types::UserRow;
use super::{PostgresRepositories, map_sqlx_error};

const USER_COLUMNS: &str = "id, username, token_prefix, token_hash, created_at";

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(UserRecord::from))
    }

    async fn find_user_by_token_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE token_prefix = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(prefix)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(UserRecord::from))
    }
}

#[async_trait]
impl UsersWriteRepo for PostgresRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let sql = format!(
            "INSERT INTO users (username, token_prefix, token_hash, created_at) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&params.username)
            .bind(&params.token_prefix)
            .bind(&params.token_hash)
            .bind(params.created_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(UserRecord::from(row))
    }
}
