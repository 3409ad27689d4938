// File: crates/metasaver-core/src/gateway.rs

use crate::MetaSaverError;
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Outcome of a download. Statuses of 400 and above leave nothing on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadResult {
    pub status_code: u16,
}

/// Scoped access to device storage.
#[async_trait]
pub trait FileGateway: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    /// Size in bytes of an existing file.
    async fn file_size(&self, path: &Path) -> Result<u64, MetaSaverError>;

    /// Creates the directory and its parents. Succeeds if it already exists.
    async fn mkdir(&self, path: &Path) -> Result<(), MetaSaverError>;

    async fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), MetaSaverError>;

    /// Renames `src` to `dst`, replacing `dst` if it exists.
    async fn move_file(&self, src: &Path, dst: &Path) -> Result<(), MetaSaverError>;

    /// Up to `len` bytes from the start of a file.
    async fn read_head(&self, path: &Path, len: usize) -> Result<Vec<u8>, MetaSaverError>;

    /// Fetches `from_url` into `to_file`. Any scheme the gateway can resolve
    /// is accepted, not only HTTP.
    async fn download_file(
        &self,
        from_url: &str,
        to_file: &Path,
    ) -> Result<DownloadResult, MetaSaverError>;
}

/// [`FileGateway`] over the local filesystem, with HTTP(S) downloads.
#[derive(Debug, Clone, Default)]
pub struct LocalFs {
    client: reqwest::Client,
}

impl LocalFs {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileGateway for LocalFs {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn file_size(&self, path: &Path) -> Result<u64, MetaSaverError> {
        Ok(tokio::fs::metadata(path).await?.len())
    }

    async fn mkdir(&self, path: &Path) -> Result<(), MetaSaverError> {
        tokio::fs::create_dir_all(path).await?;
        Ok(())
    }

    async fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), MetaSaverError> {
        let bytes = tokio::fs::copy(src, dst).await?;
        debug!(src = %src.display(), dst = %dst.display(), bytes, "copied file");
        Ok(())
    }

    async fn move_file(&self, src: &Path, dst: &Path) -> Result<(), MetaSaverError> {
        tokio::fs::rename(src, dst).await?;
        Ok(())
    }

    async fn read_head(&self, path: &Path, len: usize) -> Result<Vec<u8>, MetaSaverError> {
        let file = tokio::fs::File::open(path).await?;
        let mut head = Vec::with_capacity(len);
        file.take(len as u64).read_to_end(&mut head).await?;
        Ok(head)
    }

    async fn download_file(
        &self,
        from_url: &str,
        to_file: &Path,
    ) -> Result<DownloadResult, MetaSaverError> {
        let response = self.client.get(from_url).send().await?;
        let status_code = response.status().as_u16();
        if status_code >= 400 {
            return Ok(DownloadResult { status_code });
        }

        let body = response.bytes().await?;
        tokio::fs::write(to_file, &body).await?;
        debug!(url = from_url, dst = %to_file.display(), bytes = body.len(), "downloaded file");
        Ok(DownloadResult { status_code })
    }
}
