use crate::entities::media_variants::VariantKind;
use crate::services::storage::StorageService;
use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub const UNATTACHED_BASE: &str = "media/unattached";

/// Owner-scoped layout of variant files on top of a `StorageService`.
///
/// Layout: `{base}/{kind}/{yyyy}/{mm}/{dd}/{uuid}.{ext}` where `base` is
/// `galleries/{id}` for owned media and `media/unattached` otherwise.
#[derive(Clone)]
pub struct VariantStore {
    storage: Arc<dyn StorageService>,
}

pub fn base_path(owner_id: Option<&str>) -> String {
    match owner_id {
        Some(id) => format!("galleries/{}", id),
        None => UNATTACHED_BASE.to_string(),
    }
}

pub fn build_path(
    owner_id: Option<&str>,
    kind: VariantKind,
    date: DateTime<Utc>,
    extension: &str,
) -> String {
    format!(
        "{}/{}/{:04}/{:02}/{:02}/{}.{}",
        base_path(owner_id),
        kind.folder(),
        date.year(),
        date.month(),
        date.day(),
        Uuid::new_v4(),
        extension
    )
}

/// Swaps the owner prefix of a stored path, keeping kind, date and file name.
/// Returns `None` for paths outside the known layout.
pub fn rebase_path(path: &str, new_owner_id: Option<&str>) -> Option<String> {
    let rest = if let Some(rest) = path.strip_prefix(&format!("{}/", UNATTACHED_BASE)) {
        rest
    } else {
        let rest = path.strip_prefix("galleries/")?;
        let (_, rest) = rest.split_once('/')?;
        rest
    };
    Some(format!("{}/{}", base_path(new_owner_id), rest))
}

fn parent_dir(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(dir, _)| dir)
}

impl VariantStore {
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self { storage }
    }

    /// Idempotent
    pub async fn make_directory(&self, path: &str) -> Result<()> {
        self.storage.make_directory(path).await
    }

    pub async fn put(&self, path: &str, bytes: Vec<u8>, mime_type: &str) -> Result<()> {
        if let Some(dir) = parent_dir(path) {
            self.make_directory(dir).await?;
        }
        self.storage.upload_file(path, bytes, mime_type).await
    }

    pub async fn exists(&self, path: &str) -> Result<bool> {
        self.storage.file_exists(path).await
    }

    pub async fn size(&self, path: &str) -> Result<u64> {
        self.storage.file_size(path).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.storage.delete_file(path).await
    }

    pub async fn move_to(&self, from: &str, to: &str) -> Result<()> {
        if let Some(dir) = parent_dir(to) {
            self.make_directory(dir).await?;
        }
        self.storage.move_object(from, to).await
    }

    /// Deletes every path, logging failures instead of returning them
    pub async fn discard_all(&self, paths: &[String]) {
        for path in paths {
            if let Err(e) = self.delete(path).await {
                tracing::error!("Failed to clean up stored variant {}: {}", path, e);
            }
        }
    }

    pub fn public_url(&self, path: &str) -> String {
        self.storage.public_url(path)
    }
}
