//! In-process repositories used when no database is configured.
//!
//! Rows live in plain vectors behind one lock. Constraint checks mirror the
//! Postgres schema so both backends reject the same writes.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::application::pagination::PageWindow;
use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams, CreateUserParams,
    FollowsRepo, GroupsRepo, GroupsWriteRepo, HealthRepo, PostsRepo, PostsWriteRepo, RepoError,
    UpdatePostParams, UsersRepo, UsersWriteRepo,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostGroup, PostRecord, UserRecord};
use crate::domain::posts::{PostScope, newest_first, oldest_comment_first};

#[derive(Debug, Clone)]
struct StoredPost {
    id: i64,
    author_id: i64,
    group_id: Option<i64>,
    text: String,
    image: Option<String>,
    created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
struct StoredComment {
    id: i64,
    post_id: i64,
    author_id: i64,
    text: String,
    created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FollowEdge {
    user_id: i64,
    author_id: i64,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<StoredPost>,
    comments: Vec<StoredComment>,
    follows: Vec<FollowEdge>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user(&self, id: i64) -> Option<&UserRecord> {
        self.users.iter().find(|user| user.id == id)
    }

    fn group(&self, id: i64) -> Option<&GroupRecord> {
        self.groups.iter().find(|group| group.id == id)
    }

    fn require_user(&self, id: i64) -> Result<&UserRecord, RepoError> {
        self.user(id).ok_or_else(|| RepoError::InvalidInput {
            message: format!("user {id} does not exist"),
        })
    }

    fn require_group(&self, group_id: Option<i64>) -> Result<(), RepoError> {
        match group_id {
            Some(id) if self.group(id).is_none() => Err(RepoError::InvalidInput {
                message: format!("group {id} does not exist"),
            }),
            _ => Ok(()),
        }
    }

    fn join_post(&self, post: &StoredPost) -> Result<PostRecord, RepoError> {
        let author = self.require_user(post.author_id)?;
        Ok(PostRecord {
            id: post.id,
            author_id: post.author_id,
            author_username: author.username.clone(),
            group: post.group_id.and_then(|id| self.group(id)).map(PostGroup::from),
            text: post.text.clone(),
            image: post.image.clone(),
            created_at: post.created_at,
        })
    }

    fn join_comment(&self, comment: &StoredComment) -> Result<CommentRecord, RepoError> {
        let author = self.require_user(comment.author_id)?;
        Ok(CommentRecord {
            id: comment.id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            author_username: author.username.clone(),
            text: comment.text.clone(),
            created_at: comment.created_at,
        })
    }

    fn in_scope(&self, post: &StoredPost, scope: PostScope) -> bool {
        match scope {
            PostScope::All => true,
            PostScope::Group(group_id) => post.group_id == Some(group_id),
            PostScope::Author(author_id) => post.author_id == author_id,
            PostScope::FollowedBy(user_id) => self.follows.contains(&FollowEdge {
                user_id,
                author_id: post.author_id,
            }),
        }
    }
}

/// Shared handle; clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepositories {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }
}

fn require_text(text: &str) -> Result<(), RepoError> {
    if text.trim().is_empty() {
        return Err(RepoError::Integrity {
            message: "text must not be blank".to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl UsersRepo for MemoryRepositories {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_user_by_token_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .find(|user| user.token_prefix == prefix)
            .cloned())
    }
}

#[async_trait]
impl UsersWriteRepo for MemoryRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.write().await;
        if state.users.iter().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        if state
            .users
            .iter()
            .any(|user| user.token_prefix == params.token_prefix)
        {
            return Err(RepoError::Duplicate {
                constraint: "users_token_prefix_key".to_string(),
            });
        }

        let user = UserRecord {
            id: state.allocate_id(),
            username: params.username,
            token_prefix: params.token_prefix,
            token_hash: params.token_hash,
            created_at: params.created_at,
        };
        state.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl GroupsRepo for MemoryRepositories {
    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.groups.iter().find(|group| group.slug == slug).cloned())
    }

    async fn find_group_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.group(id).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let state = self.state.read().await;
        let mut groups = state.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(groups)
    }
}

#[async_trait]
impl GroupsWriteRepo for MemoryRepositories {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut state = self.state.write().await;
        if state.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            });
        }

        let group = GroupRecord {
            id: state.allocate_id(),
            slug: params.slug,
            title: params.title,
            description: params.description,
        };
        state.groups.push(group.clone());
        Ok(group)
    }
}

#[async_trait]
impl PostsRepo for MemoryRepositories {
    async fn list_posts(
        &self,
        scope: PostScope,
        window: &PageWindow,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let state = self.state.read().await;
        let mut posts = state
            .posts
            .iter()
            .filter(|post| state.in_scope(post, scope))
            .map(|post| state.join_post(post))
            .collect::<Result<Vec<_>, _>>()?;
        posts.sort_by(newest_first);
        Ok(window.slice(&posts))
    }

    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        let count = state
            .posts
            .iter()
            .filter(|post| state.in_scope(post, scope))
            .count();
        u64::try_from(count).map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }

    async fn find_post_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let state = self.state.read().await;
        state
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| state.join_post(post))
            .transpose()
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        require_text(&params.text)?;
        let mut state = self.state.write().await;
        state.require_user(params.author_id)?;
        state.require_group(params.group_id)?;

        let post = StoredPost {
            id: state.allocate_id(),
            author_id: params.author_id,
            group_id: params.group_id,
            text: params.text,
            image: params.image,
            created_at: params.created_at,
        };
        let record = state.join_post(&post)?;
        state.posts.push(post);
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        require_text(&params.text)?;
        let mut state = self.state.write().await;
        state.require_group(params.group_id)?;

        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.group_id = params.group_id;
        post.text = params.text;
        if let Some(image) = params.image {
            post.image = Some(image);
        }
        let updated = post.clone();
        state.join_post(&updated)
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepositories {
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError> {
        let state = self.state.read().await;
        let mut comments = state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .map(|comment| state.join_comment(comment))
            .collect::<Result<Vec<_>, _>>()?;
        comments.sort_by(oldest_comment_first);
        Ok(comments)
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        require_text(&params.text)?;
        let mut state = self.state.write().await;
        state.require_user(params.author_id)?;
        if !state.posts.iter().any(|post| post.id == params.post_id) {
            return Err(RepoError::InvalidInput {
                message: format!("post {} does not exist", params.post_id),
            });
        }

        let comment = StoredComment {
            id: state.allocate_id(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at: params.created_at,
        };
        let record = state.join_comment(&comment)?;
        state.comments.push(comment);
        Ok(record)
    }
}

#[async_trait]
impl FollowsRepo for MemoryRepositories {
    async fn insert_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        if user_id == author_id {
            return Err(RepoError::Integrity {
                message: "follows_no_self_follow".to_string(),
            });
        }
        let mut state = self.state.write().await;
        state.require_user(user_id)?;
        state.require_user(author_id)?;

        let edge = FollowEdge { user_id, author_id };
        if state.follows.contains(&edge) {
            return Ok(false);
        }
        state.follows.push(edge);
        Ok(true)
    }

    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|edge| !(edge.user_id == user_id && edge.author_id == author_id));
        Ok(state.follows.len() < before)
    }

    async fn follow_exists(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let state = self.state.read().await;
        Ok(state.follows.contains(&FollowEdge { user_id, author_id }))
    }
}

#[async_trait]
impl HealthRepo for MemoryRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;
    use time::macros::datetime;

    use super::*;

    async fn user(repos: &MemoryRepositories, name: &str) -> UserRecord {
        repos
            .create_user(CreateUserParams {
                username: name.to_string(),
                token_prefix: format!("{name}-prefix"),
                token_hash: vec![0; 32],
                created_at: datetime!(2026-01-01 00:00 UTC),
            })
            .await
            .expect("create user")
    }

    async fn post(repos: &MemoryRepositories, author: i64, minute: i64) -> PostRecord {
        repos
            .create_post(CreatePostParams {
                author_id: author,
                group_id: None,
                text: format!("post at {minute}"),
                image: None,
                created_at: datetime!(2026-01-01 00:00 UTC) + Duration::minutes(minute),
            })
            .await
            .expect("create post")
    }

    #[tokio::test]
    async fn listings_are_newest_first_and_windowed() {
        let repos = MemoryRepositories::new();
        let author = user(&repos, "leo").await;
        for minute in 0..12 {
            post(&repos, author.id, minute).await;
        }

        let window = PageWindow::resolve(12, 2);
        let page = repos
            .list_posts(PostScope::All, &window)
            .await
            .expect("list");
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].text, "post at 1");
        assert_eq!(page[1].text, "post at 0");
        assert_eq!(repos.count_posts(PostScope::All).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn follow_edges_are_unique_and_scope_the_feed() {
        let repos = MemoryRepositories::new();
        let reader = user(&repos, "reader").await;
        let author = user(&repos, "author").await;
        let other = user(&repos, "other").await;
        post(&repos, author.id, 1).await;
        post(&repos, other.id, 2).await;

        assert!(repos.insert_follow(reader.id, author.id).await.unwrap());
        assert!(!repos.insert_follow(reader.id, author.id).await.unwrap());
        assert!(matches!(
            repos.insert_follow(reader.id, reader.id).await,
            Err(RepoError::Integrity { .. })
        ));

        let scope = PostScope::FollowedBy(reader.id);
        assert_eq!(repos.count_posts(scope).await.unwrap(), 1);

        assert!(repos.delete_follow(reader.id, author.id).await.unwrap());
        assert!(!repos.delete_follow(reader.id, author.id).await.unwrap());
        assert_eq!(repos.count_posts(scope).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rejects_duplicates_and_dangling_references() {
        let repos = MemoryRepositories::new();
        let author = user(&repos, "leo").await;

        let duplicate = repos
            .create_user(CreateUserParams {
                username: "leo".to_string(),
                token_prefix: "fresh".to_string(),
                token_hash: vec![],
                created_at: datetime!(2026-01-01 00:00 UTC),
            })
            .await;
        assert!(matches!(duplicate, Err(RepoError::Duplicate { .. })));

        let dangling = repos
            .create_post(CreatePostParams {
                author_id: author.id,
                group_id: Some(999),
                text: "hello".to_string(),
                image: None,
                created_at: datetime!(2026-01-01 00:00 UTC),
            })
            .await;
        assert!(matches!(dangling, Err(RepoError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn update_keeps_image_when_none_given() {
        let repos = MemoryRepositories::new();
        let author = user(&repos, "leo").await;
        let created = repos
            .create_post(CreatePostParams {
                author_id: author.id,
                group_id: None,
                text: "with image".to_string(),
                image: Some("posts/a.gif".to_string()),
                created_at: datetime!(2026-01-01 00:00 UTC),
            })
            .await
            .unwrap();

        let updated = repos
            .update_post(UpdatePostParams {
                id: created.id,
                group_id: None,
                text: "edited".to_string(),
                image: None,
            })
            .await
            .unwrap();
        assert_eq!(updated.text, "edited");
        assert_eq!(updated.image.as_deref(), Some("posts/a.gif"));
    }
}
