use crate::common::error::Result;
use async_trait::async_trait;

/// Where the spreadsheet export comes from.
#[async_trait]
pub trait SourcePort: Send + Sync {
    async fn fetch_csv(&self) -> Result<String>;

    /// Human-readable origin for logs.
    fn describe(&self) -> String;
}

/// Current version of the published file as stored remotely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFile {
    /// Content hash required to update the file.
    pub sha: String,
    pub content: String,
}

/// Remote store holding the published JSON document.
#[async_trait]
pub trait PublisherPort: Send + Sync {
    /// `Ok(None)` when the path does not exist yet.
    async fn get_file(&self, path: &str) -> Result<Option<RemoteFile>>;

    async fn create_file(&self, path: &str, message: &str, content: &str) -> Result<()>;

    /// Replace the file; fails with a conflict when `sha` is no longer current.
    async fn update_file(&self, path: &str, message: &str, content: &str, sha: &str) -> Result<()>;
}
