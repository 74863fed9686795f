//! Composition root: wires repositories into services and router state.

use std::sync::Arc;

use crate::application::{
    accounts::AccountService,
    feed::FeedService,
    follow::FollowService,
    groups::GroupService,
    posts::PostService,
    repos::{
        CommentsRepo, FollowsRepo, GroupsRepo, GroupsWriteRepo, HealthRepo, PostsRepo,
        PostsWriteRepo, UsersRepo, UsersWriteRepo,
    },
};
use crate::cache::{CacheConfig, CacheState};
use crate::infra::{
    http::{AdminState, HttpState},
    uploads::UploadStorage,
};

/// Every repository seam, backed by one storage adapter.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UsersRepo>,
    pub users_write: Arc<dyn UsersWriteRepo>,
    pub groups: Arc<dyn GroupsRepo>,
    pub groups_write: Arc<dyn GroupsWriteRepo>,
    pub posts: Arc<dyn PostsRepo>,
    pub posts_write: Arc<dyn PostsWriteRepo>,
    pub comments: Arc<dyn CommentsRepo>,
    pub follows: Arc<dyn FollowsRepo>,
    pub health: Arc<dyn HealthRepo>,
}

impl Repositories {
    pub fn from_backend<R>(backend: Arc<R>) -> Self
    where
        R: UsersRepo
            + UsersWriteRepo
            + GroupsRepo
            + GroupsWriteRepo
            + PostsRepo
            + PostsWriteRepo
            + CommentsRepo
            + FollowsRepo
            + HealthRepo
            + 'static,
    {
        Self {
            users: backend.clone(),
            users_write: backend.clone(),
            groups: backend.clone(),
            groups_write: backend.clone(),
            posts: backend.clone(),
            posts_write: backend.clone(),
            comments: backend.clone(),
            follows: backend.clone(),
            health: backend,
        }
    }

    pub fn accounts(&self) -> AccountService {
        AccountService::new(self.users.clone(), self.users_write.clone())
    }

    pub fn groups_service(&self) -> GroupService {
        GroupService::new(self.groups.clone(), self.groups_write.clone())
    }
}

pub struct ApplicationContext {
    pub http_state: HttpState,
    pub admin_state: AdminState,
}

pub fn build_application_context(
    repositories: &Repositories,
    upload_storage: Arc<UploadStorage>,
    cache_config: CacheConfig,
    max_request_bytes: usize,
) -> ApplicationContext {
    let feed = Arc::new(FeedService::new(
        repositories.posts.clone(),
        repositories.groups.clone(),
        repositories.users.clone(),
    ));
    let posts = Arc::new(PostService::new(
        repositories.posts.clone(),
        repositories.posts_write.clone(),
        repositories.comments.clone(),
        repositories.groups.clone(),
        upload_storage.clone(),
    ));
    let follow = Arc::new(FollowService::new(
        repositories.users.clone(),
        repositories.follows.clone(),
    ));
    let cache = CacheState::new(cache_config);

    let http_state = HttpState {
        feed,
        posts,
        follow,
        groups: Arc::new(repositories.groups_service()),
        accounts: Arc::new(repositories.accounts()),
        health: repositories.health.clone(),
        upload_storage,
        cache: cache.clone(),
        max_request_bytes,
    };
    let admin_state = AdminState {
        health: repositories.health.clone(),
        cache,
    };

    ApplicationContext {
        http_state,
        admin_state,
    }
}
