//! Uniform downloader contract (§4.6): `Send`/`Status`/`Test`, the same
//! shape regardless of which backend answers.

use async_trait::async_trait;
use f1w_core::error::DownloaderError;

/// Opaque identifier a downloader hands back for a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AcquisitionId(pub String);

impl AcquisitionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AcquisitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Queued,
    Downloading,
    Completed,
    Failed,
    Unknown,
}

#[async_trait]
pub trait DownloaderAdapter: Send + Sync {
    async fn send(
        &self,
        url: &str,
        title: &str,
        category: &str,
        priority: i32,
    ) -> Result<AcquisitionId, DownloaderError>;

    async fn status(&self, id: &AcquisitionId) -> Result<DownloadStatus, DownloaderError>;

    async fn test(&self) -> Result<(), DownloaderError>;
}
