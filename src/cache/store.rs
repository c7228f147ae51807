use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Metadata kept alongside each durable blob
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub key: String,
    pub size: usize,
    pub stored_at: DateTime<Utc>,
}

/// Durable key-value blob store behind the in-memory cache tier.
#[async_trait::async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Insert or overwrite
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    async fn entries(&self) -> Result<Vec<StoredEntry>>;
}

/// Directory of `<sha256(key)>.bin` blobs with `.json` sidecars.
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
        debug!("Disk cache at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn paths(&self, key: &str) -> (PathBuf, PathBuf) {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        (
            self.dir.join(format!("{digest}.bin")),
            self.dir.join(format!("{digest}.json")),
        )
    }
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

#[async_trait::async_trait]
impl DurableStore for DiskStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let (blob, _) = self.paths(key);
        match tokio::fs::read(&blob).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", blob.display())),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let (blob, meta) = self.paths(key);

        // Write then rename so a reader never sees a half-written blob.
        let staging = blob.with_extension("bin.tmp");
        tokio::fs::write(&staging, value)
            .await
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        tokio::fs::rename(&staging, &blob)
            .await
            .with_context(|| format!("Failed to move {} into place", blob.display()))?;

        let entry = StoredEntry {
            key: key.to_string(),
            size: value.len(),
            stored_at: Utc::now(),
        };
        tokio::fs::write(&meta, serde_json::to_vec(&entry)?)
            .await
            .with_context(|| format!("Failed to write {}", meta.display()))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let (blob, meta) = self.paths(key);
        remove_if_present(&blob).await?;
        remove_if_present(&meta).await
    }

    async fn clear(&self) -> Result<()> {
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            let ours = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| matches!(e, "bin" | "json" | "tmp"));
            if ours {
                remove_if_present(&path).await?;
            }
        }
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<StoredEntry>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = tokio::fs::read(&path)
                .await
                .map_err(anyhow::Error::from)
                .and_then(|bytes| Ok(serde_json::from_slice::<StoredEntry>(&bytes)?));
            match parsed {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping unreadable cache sidecar {}: {:#}", path.display(), e),
            }
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}
