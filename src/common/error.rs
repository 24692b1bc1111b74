use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("failed to download source CSV from {url}: {message}")]
    Fetch {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("source table is missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("source table has no usable rows")]
    EmptyData,

    #[error("access token not found in environment variable '{var}'")]
    Credential { var: String },

    #[error("remote file '{path}' changed since it was read: {message}")]
    RemoteWriteConflict { path: String, message: String },

    #[error("remote repository request failed{}: {message}", status_suffix(.status))]
    RemoteAccess { status: Option<u16>, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("output document does not match schema: {}", .0.join("; "))]
    OutputSchema(Vec<String>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Short failure category printed in front of the diagnostic line.
    pub fn category(&self) -> &'static str {
        match self {
            SyncError::Fetch { .. } => "fetch",
            SyncError::Schema { .. } => "schema",
            SyncError::EmptyData => "empty-data",
            SyncError::Credential { .. } => "credential",
            SyncError::RemoteWriteConflict { .. } => "remote-conflict",
            SyncError::RemoteAccess { .. } => "remote-access",
            SyncError::Http(_) => "http",
            SyncError::Config(_) | SyncError::Toml(_) => "config",
            SyncError::Csv(_) => "csv",
            SyncError::Json(_) => "json",
            SyncError::OutputSchema(_) => "output-schema",
            SyncError::Io(_) => "io",
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, SyncError>;
