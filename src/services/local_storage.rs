use crate::services::storage::StorageService;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Filesystem backend rooted at a directory. Files are served under `/storage`.
pub struct LocalStorageService {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStorageService {
    pub fn new(root: impl Into<PathBuf>, public_base_url: String) -> Self {
        Self {
            root: root.into(),
            public_base_url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rejects absolute keys and any `..` segment
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        if key.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(anyhow!("Invalid storage key: {}", key));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl StorageService for LocalStorageService {
    async fn upload_file(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn get_file(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::read(path).await?)
    }

    async fn delete_file(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn move_object(&self, source_key: &str, dest_key: &str) -> Result<()> {
        let from = self.resolve(source_key)?;
        let to = self.resolve(dest_key)?;
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(&from, &to).await?;
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> Result<bool> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::try_exists(path).await?)
    }

    async fn file_size(&self, key: &str) -> Result<u64> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::metadata(path).await?.len())
    }

    async fn make_directory(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        tokio::fs::create_dir_all(path).await?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/{}",
            self.public_base_url.trim_end_matches('/'),
            key
        )
    }
}
