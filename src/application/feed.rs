use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::accounts::Viewer;
use crate::application::pagination::{Page, PageWindow};
use crate::application::repos::{GroupsRepo, PostsRepo, RepoError, UsersRepo};
use crate::domain::entities::{GroupRecord, PostRecord, UserRecord};
use crate::domain::posts::PostScope;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no group with slug `{0}`")]
    UnknownGroup(String),
    #[error("no user named `{0}`")]
    UnknownAuthor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: Page<PostRecord>,
}

#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: UserRecord,
    /// All posts by the author, not just the ones on this page.
    pub post_count: u64,
    pub page: Page<PostRecord>,
}

/// Read-only post listings. Every listing is newest first.
#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
        }
    }

    pub async fn global_feed(&self, requested_page: i64) -> Result<Page<PostRecord>, FeedError> {
        self.load_page(PostScope::All, requested_page).await
    }

    pub async fn group_feed(&self, slug: &str, requested_page: i64) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or_else(|| FeedError::UnknownGroup(slug.to_string()))?;

        let page = self
            .load_page(PostScope::Group(group.id), requested_page)
            .await?;

        Ok(GroupFeed { group, page })
    }

    pub async fn profile_feed(
        &self,
        username: &str,
        requested_page: i64,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| FeedError::UnknownAuthor(username.to_string()))?;

        let page = self
            .load_page(PostScope::Author(author.id), requested_page)
            .await?;
        let post_count = page.window.total as u64;

        Ok(ProfileFeed {
            author,
            post_count,
            page,
        })
    }

    /// Posts by every author the viewer follows.
    pub async fn follower_feed(
        &self,
        viewer: &Viewer,
        requested_page: i64,
    ) -> Result<Page<PostRecord>, FeedError> {
        self.load_page(PostScope::FollowedBy(viewer.user_id), requested_page)
            .await
    }

    async fn load_page(
        &self,
        scope: PostScope,
        requested_page: i64,
    ) -> Result<Page<PostRecord>, FeedError> {
        let total = self.posts.count_posts(scope).await?;
        let total = usize::try_from(total)
            .map_err(|_| RepoError::from_persistence("post count exceeds supported range"))?;
        let window = PageWindow::resolve(total, requested_page);

        let items = if window.limit == 0 {
            Vec::new()
        } else {
            self.posts.list_posts(scope, &window).await?
        };

        debug!(
            target = "murmur::feed",
            ?scope,
            page = window.number,
            page_count = window.page_count,
            total,
            "Loaded feed page"
        );

        Ok(Page::new(items, window))
    }
}
