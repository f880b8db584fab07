//! Save flow
//!
//! Destinations for downloaded attachment content.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Name used when the stored file name is unusable
const FALLBACK_FILE_NAME: &str = "attachment";

/// Decoded attachment content ready to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadBlob {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

/// Client-side save flow
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Persist the blob under its file name
    async fn save(&self, blob: DownloadBlob) -> std::io::Result<()>;
}

/// Writes downloads into a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Target path for a file name; only the last path segment is kept
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        let name = file_name
            .rsplit(['/', '\\'])
            .next()
            .map(str::trim)
            .unwrap_or_default();

        let name = match name {
            "" | "." | ".." => FALLBACK_FILE_NAME,
            other => other,
        };

        self.root.join(name)
    }
}

#[async_trait]
impl DownloadSink for DirectorySink {
    #[instrument(skip(self, blob), fields(file_name = %blob.file_name, size = blob.bytes.len()))]
    async fn save(&self, blob: DownloadBlob) -> std::io::Result<()> {
        fs::create_dir_all(&self.root).await?;

        let path = self.path_for(&blob.file_name);
        let mut file = fs::File::create(&path).await?;
        file.write_all(&blob.bytes).await?;
        file.sync_all().await?;

        debug!(path = ?path, "Download saved");
        Ok(())
    }
}

/// Keeps downloads in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: RwLock<Vec<DownloadBlob>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything saved so far, oldest first
    pub async fn saved(&self) -> Vec<DownloadBlob> {
        self.saved.read().await.clone()
    }
}

#[async_trait]
impl DownloadSink for MemorySink {
    async fn save(&self, blob: DownloadBlob) -> std::io::Result<()> {
        self.saved.write().await.push(blob);
        Ok(())
    }
}
