//! Post detail, authoring and comments.
//!
//! Every write validates the whole submission first and touches storage only
//! when every field is valid.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::application::accounts::Viewer;
use crate::application::error::FieldErrors;
use crate::application::images::read_image_size;
use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo,
    RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentRecord, PostRecord};
use crate::domain::posts::clean_text;
use crate::infra::uploads::{UploadStorage, UploadStorageError};

#[derive(Debug, Error)]
pub enum PostError {
    #[error("no post with id {0}")]
    NotFound(i64),
    #[error("post {post_id} belongs to another author")]
    NotAuthor { post_id: i64 },
    #[error("invalid submission: {0}")]
    Invalid(FieldErrors),
    #[error(transparent)]
    Upload(#[from] UploadStorageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// An image file taken from a form submission.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub data: Bytes,
}

/// Raw post form fields as submitted.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub text: String,
    /// Group id; empty means "no group".
    pub group: Option<String>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    pub comments: Vec<CommentRecord>,
}

/// Current values of a post, as shown to its author for editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFormValues {
    pub post_id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

struct ValidPost {
    text: String,
    group_id: Option<i64>,
    image: Option<ImageUpload>,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    comments: Arc<dyn CommentsRepo>,
    groups: Arc<dyn GroupsRepo>,
    storage: Arc<UploadStorage>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        comments: Arc<dyn CommentsRepo>,
        groups: Arc<dyn GroupsRepo>,
        storage: Arc<UploadStorage>,
    ) -> Self {
        Self {
            posts,
            writer,
            comments,
            groups,
            storage,
        }
    }

    pub async fn detail(&self, post_id: i64) -> Result<PostDetail, PostError> {
        let post = self.load(post_id).await?;
        let comments = self.comments.list_comments(post.id).await?;
        Ok(PostDetail { post, comments })
    }

    pub async fn create(&self, viewer: &Viewer, form: PostForm) -> Result<PostRecord, PostError> {
        let valid = self.validate(form).await?;
        let stored_image = self.store_image(valid.image).await?;

        let result = self
            .writer
            .create_post(CreatePostParams {
                author_id: viewer.user_id,
                group_id: valid.group_id,
                text: valid.text,
                image: stored_image.clone(),
                created_at: OffsetDateTime::now_utc(),
            })
            .await;

        let post = self.discard_image_on_error(result, stored_image).await?;
        info!(
            target = "murmur::posts",
            post_id = post.id,
            author = %viewer.username,
            "Created post"
        );
        Ok(post)
    }

    pub async fn edit_form(
        &self,
        viewer: &Viewer,
        post_id: i64,
    ) -> Result<PostFormValues, PostError> {
        let post = self.load_for_author(viewer, post_id).await?;
        Ok(PostFormValues {
            post_id: post.id,
            text: post.text,
            group_id: post.group.map(|group| group.id),
            image: post.image,
        })
    }

    pub async fn edit(
        &self,
        viewer: &Viewer,
        post_id: i64,
        form: PostForm,
    ) -> Result<PostRecord, PostError> {
        let post = self.load_for_author(viewer, post_id).await?;
        let valid = self.validate(form).await?;
        let stored_image = self.store_image(valid.image).await?;

        let result = self
            .writer
            .update_post(UpdatePostParams {
                id: post.id,
                group_id: valid.group_id,
                text: valid.text,
                image: stored_image.clone(),
            })
            .await;

        let updated = self.discard_image_on_error(result, stored_image).await?;
        info!(
            target = "murmur::posts",
            post_id = updated.id,
            author = %viewer.username,
            "Edited post"
        );
        Ok(updated)
    }

    pub async fn add_comment(
        &self,
        viewer: &Viewer,
        post_id: i64,
        text: &str,
    ) -> Result<CommentRecord, PostError> {
        let post = self.load(post_id).await?;
        let text = clean_text("text", text).map_err(|err| PostError::Invalid(err.into()))?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: viewer.user_id,
                text,
                created_at: OffsetDateTime::now_utc(),
            })
            .await?;

        info!(
            target = "murmur::posts",
            post_id = post.id,
            comment_id = comment.id,
            author = %viewer.username,
            "Added comment"
        );
        Ok(comment)
    }

    async fn load(&self, post_id: i64) -> Result<PostRecord, PostError> {
        self.posts
            .find_post_by_id(post_id)
            .await?
            .ok_or(PostError::NotFound(post_id))
    }

    async fn load_for_author(&self, viewer: &Viewer, post_id: i64) -> Result<PostRecord, PostError> {
        let post = self.load(post_id).await?;
        if post.author_id != viewer.user_id {
            return Err(PostError::NotAuthor { post_id });
        }
        Ok(post)
    }

    async fn validate(&self, form: PostForm) -> Result<ValidPost, PostError> {
        let mut errors = FieldErrors::new();

        let text = match clean_text("text", &form.text) {
            Ok(text) => Some(text),
            Err(err) => {
                errors.record(err);
                None
            }
        };

        let group_id = match form.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let found = match raw.parse::<i64>() {
                    Ok(id) => self.groups.find_group_by_id(id).await?.map(|group| group.id),
                    Err(_) => None,
                };
                if found.is_none() {
                    errors.push(
                        "group",
                        "select a valid choice; that choice is not one of the available choices",
                    );
                }
                found
            }
        };

        let image = match form.image {
            Some(upload) if upload.data.is_empty() && upload.file_name.is_empty() => None,
            Some(upload) => match read_image_size(&upload.data) {
                Ok(_) => Some(upload),
                Err(err) => {
                    errors.push("image", err.to_string());
                    None
                }
            },
            None => None,
        };

        errors.into_result().map_err(PostError::Invalid)?;
        Ok(ValidPost {
            text: text.unwrap_or_default(),
            group_id,
            image,
        })
    }

    async fn store_image(&self, image: Option<ImageUpload>) -> Result<Option<String>, PostError> {
        match image {
            Some(upload) => {
                let stored_path = self.storage.store(&upload.file_name, upload.data).await?;
                Ok(Some(stored_path))
            }
            None => Ok(None),
        }
    }

    async fn discard_image_on_error(
        &self,
        result: Result<PostRecord, RepoError>,
        stored_image: Option<String>,
    ) -> Result<PostRecord, PostError> {
        match result {
            Ok(post) => Ok(post),
            Err(err) => {
                if let Some(path) = stored_image {
                    if let Err(cleanup) = self.storage.delete(&path).await {
                        warn!(
                            target = "murmur::posts",
                            stored_path = %path,
                            error = %cleanup,
                            "Failed to remove image after rejected write"
                        );
                    }
                }
                Err(err.into())
            }
        }
    }
}
