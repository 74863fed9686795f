//! Filesystem storage for post images.
//!
//! Every image lands under `posts/` inside the configured media root and is
//! addressed afterwards by its relative stored path.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

const POSTS_DIRECTORY: &str = "posts";

#[derive(Debug, Error)]
pub enum UploadStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file is empty")]
    EmptyPayload,
}

#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    /// Storage rooted at `root`, created if missing.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(root.join(POSTS_DIRECTORY))?;
        Ok(Self { root })
    }

    /// Write `data` under `posts/` and return its stored path.
    pub async fn store(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<String, UploadStorageError> {
        if data.is_empty() {
            return Err(UploadStorageError::EmptyPayload);
        }

        let stored_path = build_stored_path(original_name);
        let absolute = self.resolve(&stored_path)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        if let Err(err) = file.write_all(&data).await {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(err.into());
        }
        file.flush().await?;

        debug!(
            target = "murmur::uploads",
            stored_path = %stored_path,
            size_bytes = data.len(),
            "Stored upload"
        );

        Ok(stored_path)
    }

    pub async fn read(&self, stored_path: &str) -> Result<Bytes, UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Remove a stored file. Missing files count as removed.
    pub async fn delete(&self, stored_path: &str) -> Result<(), UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        match fs::remove_file(&absolute).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(UploadStorageError::Io(err)),
        }
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, UploadStorageError> {
        let relative = Path::new(stored_path);
        if stored_path.is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(UploadStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

fn build_stored_path(original_name: &str) -> String {
    let identifier = Uuid::new_v4().simple();
    let filename = sanitize_filename(original_name);
    format!("{POSTS_DIRECTORY}/{identifier}-{filename}")
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("image");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "image".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty() && value.chars().all(|ch| ch.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_read_and_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");

        let stored = storage
            .store("Small Picture.GIF", Bytes::from_static(b"GIF89a-bytes"))
            .await
            .expect("store");
        assert!(stored.starts_with("posts/"));
        assert!(stored.ends_with("-small-picture.gif"));

        let data = storage.read(&stored).await.expect("read");
        assert_eq!(&data[..], b"GIF89a-bytes");

        storage.delete(&stored).await.expect("delete");
        assert!(!dir.path().join(&stored).exists());
        storage
            .delete(&stored)
            .await
            .expect("deleting twice is fine");
    }

    #[tokio::test]
    async fn rejects_traversal_and_empty_payloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");

        assert!(matches!(
            storage.read("../etc/passwd").await,
            Err(UploadStorageError::InvalidPath)
        ));
        assert!(matches!(
            storage.read("/etc/passwd").await,
            Err(UploadStorageError::InvalidPath)
        ));
        assert!(matches!(
            storage.store("empty.png", Bytes::new()).await,
            Err(UploadStorageError::EmptyPayload)
        ));
    }

    #[test]
    fn sanitize_filename_falls_back_for_odd_names() {
        assert_eq!(sanitize_filename("???.png"), "image.png");
        assert_eq!(sanitize_filename("photo"), "photo");
        assert_eq!(sanitize_filename("a.b/../c.jpg"), "c.jpg");
    }
}
