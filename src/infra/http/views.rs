//! JSON documents served by the public router.

use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::application::{
    feed::{GroupFeed, ProfileFeed},
    pagination::{Page, PageMeta},
    posts::{PostDetail, PostFormValues},
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostGroup, PostRecord};

pub(crate) const INDEX_TITLE: &str = "Latest updates";
pub(crate) const FOLLOW_TITLE: &str = "Posts by followed authors";
const DETAIL_TITLE_CHARS: usize = 30;

#[derive(Debug, Serialize)]
pub(crate) struct GroupRef {
    pub slug: String,
    pub title: String,
}

impl From<PostGroup> for GroupRef {
    fn from(group: PostGroup) -> Self {
        Self {
            slug: group.slug,
            title: group.title,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PostView {
    pub id: i64,
    pub text: String,
    pub author: String,
    pub group: Option<GroupRef>,
    pub image: Option<String>,
    pub created_at: String,
}

impl From<PostRecord> for PostView {
    fn from(post: PostRecord) -> Self {
        Self {
            id: post.id,
            text: post.text,
            author: post.author_username,
            group: post.group.map(GroupRef::from),
            image: post.image.as_deref().map(media_url),
            created_at: format_timestamp(post.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CommentView {
    pub id: i64,
    pub author: String,
    pub text: String,
    pub created_at: String,
}

impl From<CommentRecord> for CommentView {
    fn from(comment: CommentRecord) -> Self {
        Self {
            id: comment.id,
            author: comment.author_username,
            text: comment.text,
            created_at: format_timestamp(comment.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GroupView {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
}

impl From<GroupRecord> for GroupView {
    fn from(group: GroupRecord) -> Self {
        Self {
            id: group.id,
            slug: group.slug,
            title: group.title,
            description: group.description,
        }
    }
}

/// A feed page; `extra` carries the view-specific fields.
#[derive(Debug, Serialize)]
pub(crate) struct FeedPageView<E: Serialize> {
    pub title: String,
    pub posts: Vec<PostView>,
    pub page: PageMeta,
    #[serde(flatten)]
    pub extra: E,
}

#[derive(Debug, Serialize)]
pub(crate) struct NoExtra {}

#[derive(Debug, Serialize)]
pub(crate) struct GroupExtra {
    pub group: GroupView,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProfileExtra {
    pub author: String,
    pub post_count: u64,
    pub following: bool,
}

pub(crate) fn feed_page(title: impl Into<String>, page: Page<PostRecord>) -> FeedPageView<NoExtra> {
    page_view(title.into(), page, NoExtra {})
}

pub(crate) fn group_page(feed: GroupFeed) -> FeedPageView<GroupExtra> {
    let title = format!("Posts of group {}", feed.group.slug);
    page_view(
        title,
        feed.page,
        GroupExtra {
            group: GroupView::from(feed.group),
        },
    )
}

pub(crate) fn profile_page(feed: ProfileFeed, following: bool) -> FeedPageView<ProfileExtra> {
    let title = format!("Profile of {}", feed.author.username);
    page_view(
        title,
        feed.page,
        ProfileExtra {
            author: feed.author.username,
            post_count: feed.post_count,
            following,
        },
    )
}

fn page_view<E: Serialize>(title: String, page: Page<PostRecord>, extra: E) -> FeedPageView<E> {
    let meta = page.meta();
    FeedPageView {
        title,
        posts: page.items.into_iter().map(PostView::from).collect(),
        page: meta,
        extra,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PostDetailView {
    pub title: String,
    pub post: PostView,
    pub comments: Vec<CommentView>,
}

impl From<PostDetail> for PostDetailView {
    fn from(detail: PostDetail) -> Self {
        let title: String = detail.post.text.chars().take(DETAIL_TITLE_CHARS).collect();
        Self {
            title,
            post: PostView::from(detail.post),
            comments: detail.comments.into_iter().map(CommentView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct FormValuesView {
    pub post_id: i64,
    pub text: String,
    pub group: Option<i64>,
    pub image: Option<String>,
}

impl From<PostFormValues> for FormValuesView {
    fn from(values: PostFormValues) -> Self {
        Self {
            post_id: values.post_id,
            text: values.text,
            group: values.group_id,
            image: values.image.as_deref().map(media_url),
        }
    }
}

/// Context for the create and edit forms.
#[derive(Debug, Serialize)]
pub(crate) struct PostFormView {
    pub is_edit: bool,
    pub groups: Vec<GroupView>,
    pub values: Option<FormValuesView>,
}

pub(crate) fn media_url(stored_path: &str) -> String {
    format!("/media/{stored_path}")
}

fn format_timestamp(value: OffsetDateTime) -> String {
    value
        .format(&Rfc3339)
        .unwrap_or_else(|_| value.unix_timestamp().to_string())
}
