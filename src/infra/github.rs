use crate::app::ports::{PublisherPort, RemoteFile};
use crate::common::error::{Result, SyncError};
use crate::config::Config;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

const API_VERSION: &str = "2022-11-28";

/// GitHub repository contents API client.
pub struct GithubPublisher {
    client: reqwest::Client,
    api_base_url: String,
    repository: String,
    branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

impl GithubPublisher {
    pub fn new(
        api_base_url: impl Into<String>,
        repository: impl Into<String>,
        branch: Option<String>,
        token: &str,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| SyncError::Config("access token contains invalid characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .user_agent(concat!("doadores-sync/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            repository: repository.into(),
            branch,
        })
    }

    pub fn from_config(config: &Config, token: &str) -> Result<Self> {
        Self::new(
            config.api_base_url.clone(),
            config.repository.clone(),
            config.branch.clone(),
            token,
        )
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base_url,
            self.repository,
            path.trim_start_matches('/')
        )
    }

    async fn put(&self, path: &str, message: &str, content: &str, sha: Option<&str>) -> Result<()> {
        let body = PutContentsRequest {
            message,
            content: STANDARD.encode(content.as_bytes()),
            sha,
            branch: self.branch.as_deref(),
        };
        let resp = self
            .client
            .put(self.contents_url(path))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let status = resp.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "Contents write accepted");
            return Ok(());
        }

        let message = error_message(resp).await;
        let stale_sha = status == StatusCode::UNPROCESSABLE_ENTITY && message.contains("sha");
        if status == StatusCode::CONFLICT || stale_sha {
            return Err(SyncError::RemoteWriteConflict {
                path: path.to_string(),
                message,
            });
        }
        Err(SyncError::RemoteAccess {
            status: Some(status.as_u16()),
            message,
        })
    }
}

fn transport_error(e: reqwest::Error) -> SyncError {
    SyncError::RemoteAccess {
        status: None,
        message: e.to_string(),
    }
}

async fn error_message(resp: Response) -> String {
    let status = resp.status();
    match resp.json::<ApiErrorBody>().await {
        Ok(body) if !body.message.is_empty() => body.message,
        _ => status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string(),
    }
}

fn decode_content(encoded: &str) -> Result<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact).map_err(|e| SyncError::RemoteAccess {
        status: None,
        message: format!("remote content is not valid base64: {e}"),
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[async_trait]
impl PublisherPort for GithubPublisher {
    #[instrument(skip(self), fields(repo = %self.repository))]
    async fn get_file(&self, path: &str) -> Result<Option<RemoteFile>> {
        let mut req = self.client.get(self.contents_url(path));
        if let Some(branch) = &self.branch {
            req = req.query(&[("ref", branch)]);
        }
        let resp = req.send().await.map_err(transport_error)?;
        let status = resp.status();

        if status == StatusCode::NOT_FOUND {
            debug!("Remote file does not exist yet");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SyncError::RemoteAccess {
                status: Some(status.as_u16()),
                message: error_message(resp).await,
            });
        }

        let body: ContentsResponse = resp.json().await.map_err(|e| SyncError::RemoteAccess {
            status: Some(status.as_u16()),
            message: format!("'{path}' is not a file: {e}"),
        })?;
        let content = match body.content.as_deref() {
            Some(encoded) => decode_content(encoded)?,
            None => String::new(),
        };
        Ok(Some(RemoteFile {
            sha: body.sha,
            content,
        }))
    }

    #[instrument(skip(self, content), fields(repo = %self.repository))]
    async fn create_file(&self, path: &str, message: &str, content: &str) -> Result<()> {
        self.put(path, message, content, None).await?;
        info!("Created remote file");
        Ok(())
    }

    #[instrument(skip(self, content), fields(repo = %self.repository))]
    async fn update_file(&self, path: &str, message: &str, content: &str, sha: &str) -> Result<()> {
        self.put(path, message, content, Some(sha)).await?;
        info!("Updated remote file");
        Ok(())
    }
}
