//! User registration and access-token authentication.
//!
//! Tokens look like `mu_<prefix>_<secret>`. Only the prefix and a SHA-256
//! digest of the secret are stored; the full token is shown once at
//! registration.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{CreateUserParams, RepoError, UsersRepo, UsersWriteRepo};
use crate::domain::entities::UserRecord;
use crate::domain::error::DomainError;
use crate::domain::users::validate_username;

const TOKEN_TAG: &str = "mu";
const PREFIX_LEN: usize = 12;
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Invalid(DomainError),
    #[error("username `{0}` is already taken")]
    Duplicate(String),
    #[error("invalid access token")]
    InvalidToken,
    #[error(transparent)]
    Repo(RepoError),
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: i64,
    pub username: String,
}

impl From<&UserRecord> for Viewer {
    fn from(user: &UserRecord) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub user: UserRecord,
    pub token: String,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    writer: Arc<dyn UsersWriteRepo>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UsersRepo>, writer: Arc<dyn UsersWriteRepo>) -> Self {
        Self { users, writer }
    }

    pub async fn register(&self, username: &str) -> Result<Registration, AccountError> {
        let username = validate_username(username).map_err(AccountError::Invalid)?;

        if self
            .users
            .find_user_by_username(&username)
            .await
            .map_err(AccountError::Repo)?
            .is_some()
        {
            return Err(AccountError::Duplicate(username));
        }

        let prefix = generate_prefix();
        let secret = generate_secret();
        let token = format!("{TOKEN_TAG}_{prefix}_{secret}");

        let user = self
            .writer
            .create_user(CreateUserParams {
                username: username.clone(),
                token_prefix: prefix,
                token_hash: hash_secret(&secret),
                created_at: OffsetDateTime::now_utc(),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AccountError::Duplicate(username.clone()),
                other => AccountError::Repo(other),
            })?;

        info!(
            target = "murmur::accounts",
            user_id = user.id,
            username = %user.username,
            "Registered user"
        );

        Ok(Registration { user, token })
    }

    pub async fn authenticate(&self, token: &str) -> Result<Viewer, AccountError> {
        let parsed = parse_token(token).ok_or(AccountError::InvalidToken)?;
        let user = self
            .users
            .find_user_by_token_prefix(&parsed.prefix)
            .await
            .map_err(AccountError::Repo)?
            .ok_or(AccountError::InvalidToken)?;

        let hashed_input = hash_secret(&parsed.secret);
        if user.token_hash.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(AccountError::InvalidToken);
        }

        Ok(Viewer::from(&user))
    }
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

fn generate_prefix() -> String {
    Uuid::new_v4().simple().to_string()[..PREFIX_LEN].to_string()
}

fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

struct ParsedToken {
    prefix: String,
    secret: String,
}

fn parse_token(token: &str) -> Option<ParsedToken> {
    let mut parts = token.trim().splitn(3, '_');
    if parts.next()? != TOKEN_TAG {
        return None;
    }
    let prefix = parts.next()?;
    let secret = parts.next()?;
    if prefix.is_empty() || secret.len() < MIN_SECRET_LEN {
        return None;
    }
    Some(ParsedToken {
        prefix: prefix.to_string(),
        secret: secret.to_string(),
    })
}
