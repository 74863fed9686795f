use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateGroupParams, GroupsRepo, GroupsWriteRepo, RepoError};
use crate::domain::entities::GroupRecord;
use crate::domain::error::DomainError;
use crate::domain::slug::{derive_slug, validate_slug};

pub const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error(transparent)]
    Invalid(DomainError),
    #[error("group slug `{0}` is already taken")]
    Duplicate(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct CreateGroupCommand {
    pub title: String,
    /// Derived from the title when absent.
    pub slug: Option<String>,
    pub description: String,
}

#[derive(Clone)]
pub struct GroupService {
    reader: Arc<dyn GroupsRepo>,
    writer: Arc<dyn GroupsWriteRepo>,
}

impl GroupService {
    pub fn new(reader: Arc<dyn GroupsRepo>, writer: Arc<dyn GroupsWriteRepo>) -> Self {
        Self { reader, writer }
    }

    pub async fn list(&self) -> Result<Vec<GroupRecord>, GroupError> {
        Ok(self.reader.list_groups().await?)
    }

    pub async fn create(&self, command: CreateGroupCommand) -> Result<GroupRecord, GroupError> {
        let title = command.title.trim().to_string();
        if title.is_empty() {
            return Err(GroupError::Invalid(DomainError::validation(
                "title",
                "this field is required",
            )));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(GroupError::Invalid(DomainError::validation(
                "title",
                format!("must be at most {MAX_TITLE_LEN} characters"),
            )));
        }

        let slug = match command.slug.as_deref().map(str::trim) {
            Some(explicit) if !explicit.is_empty() => {
                validate_slug(explicit)
                    .map_err(|err| GroupError::Invalid(DomainError::validation("slug", err.to_string())))?;
                explicit.to_string()
            }
            _ => derive_slug(&title)
                .map_err(|err| GroupError::Invalid(DomainError::validation("slug", err.to_string())))?,
        };

        if self.reader.find_group_by_slug(&slug).await?.is_some() {
            return Err(GroupError::Duplicate(slug));
        }

        let group = self
            .writer
            .create_group(CreateGroupParams {
                slug: slug.clone(),
                title,
                description: command.description.trim().to_string(),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => GroupError::Duplicate(slug.clone()),
                other => GroupError::Repo(other),
            })?;

        info!(
            target = "murmur::groups",
            group_id = group.id,
            slug = %group.slug,
            "Created group"
        );

        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::MemoryRepositories;

    fn service() -> GroupService {
        let store = Arc::new(MemoryRepositories::new());
        GroupService::new(store.clone(), store)
    }

    #[tokio::test]
    async fn derives_slug_from_title_when_absent() {
        let groups = service();
        let group = groups
            .create(CreateGroupCommand {
                title: "  Night Owls ".to_string(),
                ..CreateGroupCommand::default()
            })
            .await
            .expect("group created");

        assert_eq!(group.title, "Night Owls");
        assert_eq!(group.slug, "night-owls");
    }

    #[tokio::test]
    async fn rejects_taken_and_malformed_slugs() {
        let groups = service();
        let command = CreateGroupCommand {
            title: "Cats".to_string(),
            slug: Some("cats".to_string()),
            description: String::new(),
        };
        groups.create(command.clone()).await.expect("first group");

        let duplicate = groups.create(command).await;
        assert!(matches!(duplicate, Err(GroupError::Duplicate(slug)) if slug == "cats"));

        let malformed = groups
            .create(CreateGroupCommand {
                title: "Dogs".to_string(),
                slug: Some("dogs and more".to_string()),
                description: String::new(),
            })
            .await;
        assert!(matches!(malformed, Err(GroupError::Invalid(_))));
    }

    #[tokio::test]
    async fn lists_groups_by_title() {
        let groups = service();
        for title in ["Zebras", "Apes", "Moles"] {
            groups
                .create(CreateGroupCommand {
                    title: title.to_string(),
                    ..CreateGroupCommand::default()
                })
                .await
                .expect("group created");
        }

        let titles: Vec<_> = groups
            .list()
            .await
            .expect("groups listed")
            .into_iter()
            .map(|group| group.title)
            .collect();
        assert_eq!(titles, vec!["Apes", "Moles", "Zebras"]);
    }
}
