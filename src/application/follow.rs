//! Directed follow edges between users.
//!
//! Per (viewer, author) pair the state is either following or not; both
//! transitions are idempotent and a user can never follow themselves.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::accounts::Viewer;
use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("no user named `{0}`")]
    UnknownAuthor(String),
    #[error("users cannot follow themselves")]
    SelfFollow,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Unfollowed,
    NotFollowing,
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    pub async fn follow(&self, viewer: &Viewer, username: &str) -> Result<FollowOutcome, FollowError> {
        let author = self.author(username).await?;
        if author.id == viewer.user_id {
            return Err(FollowError::SelfFollow);
        }

        let outcome = if self.follows.insert_follow(viewer.user_id, author.id).await? {
            FollowOutcome::Followed
        } else {
            FollowOutcome::AlreadyFollowing
        };

        info!(
            target = "murmur::follow",
            follower = %viewer.username,
            author = %author.username,
            ?outcome,
            "Follow requested"
        );
        Ok(outcome)
    }

    pub async fn unfollow(
        &self,
        viewer: &Viewer,
        username: &str,
    ) -> Result<UnfollowOutcome, FollowError> {
        let author = self.author(username).await?;

        let outcome = if self.follows.delete_follow(viewer.user_id, author.id).await? {
            UnfollowOutcome::Unfollowed
        } else {
            UnfollowOutcome::NotFollowing
        };

        info!(
            target = "murmur::follow",
            follower = %viewer.username,
            author = %author.username,
            ?outcome,
            "Unfollow requested"
        );
        Ok(outcome)
    }

    /// Anonymous callers follow nobody; the store is not consulted for them.
    pub async fn is_following(
        &self,
        viewer: Option<&Viewer>,
        author: &UserRecord,
    ) -> Result<bool, FollowError> {
        match viewer {
            None => Ok(false),
            Some(viewer) if viewer.user_id == author.id => Ok(false),
            Some(viewer) => Ok(self.follows.follow_exists(viewer.user_id, author.id).await?),
        }
    }

    async fn author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor(username.to_string()))
    }
}
