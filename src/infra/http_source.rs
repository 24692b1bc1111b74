use crate::app::ports::SourcePort;
use crate::common::error::{Result, SyncError};
use crate::observability::metrics::{self, MetricName};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Downloads the published spreadsheet export over HTTP.
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    fn fetch_error(&self, status: Option<u16>, message: impl Into<String>) -> SyncError {
        metrics::increment(MetricName::SourceFetchError, 1);
        SyncError::Fetch {
            url: self.url.clone(),
            status,
            message: message.into(),
        }
    }
}

#[async_trait]
impl SourcePort for HttpSource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_csv(&self) -> Result<String> {
        let t0 = Instant::now();
        let resp = self.client.get(&self.url).send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("timed out: {e}")
            } else {
                e.to_string()
            };
            self.fetch_error(None, message)
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(self.fetch_error(Some(status.as_u16()), format!("status {}", status.as_u16())));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| self.fetch_error(Some(status.as_u16()), e.to_string()))?;

        let dur = t0.elapsed().as_secs_f64();
        metrics::increment(MetricName::SourceFetchSuccess, 1);
        metrics::observe(MetricName::SourceFetchDuration, dur);
        metrics::observe(MetricName::SourcePayloadBytes, body.len() as f64);
        info!(bytes = body.len(), duration_secs = dur, "Downloaded source CSV");
        Ok(body)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Reads a CSV export from disk, for offline runs.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SourcePort for FileSource {
    async fn fetch_csv(&self) -> Result<String> {
        debug!(path = %self.path.display(), "Reading local CSV");
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
