//! Publishes masked equipment-donor records from a spreadsheet to a GitHub repository.

pub mod app;
pub mod common;
pub mod config;
pub mod infra;
pub mod observability;
pub mod pipeline;

// Re-export commonly used types
pub use app::sync_use_case::{PublishOutcome, SyncReport, SyncUseCase};
pub use common::error::{Result, SyncError};
pub use config::{Config, Profile};
pub use pipeline::DonorRecord;
