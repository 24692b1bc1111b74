//! Run metrics for the donor sync.
//!
//! Metrics are recorded through the `metrics` facade into a Prometheus
//! recorder. A batch job has no scrape endpoint, so when
//! `DOADORES_PUSHGATEWAY_URL` is set the snapshot is pushed once at the end
//! of the run.

use crate::common::constants::ENV_PUSHGATEWAY_URL;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::fmt;
use tracing::{info, warn};

/// All metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    SourceFetchSuccess,
    SourceFetchError,
    SourceFetchDuration,
    SourcePayloadBytes,
    RowsValidated,
    RecordsEmitted,
    BlankSlotsSkipped,
    InvalidTaxIds,
    PublishCreated,
    PublishUpdated,
    PublishUnchanged,
    PublishError,
    RunFailures,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::SourceFetchSuccess => "doadores_source_fetch_success_total",
            MetricName::SourceFetchError => "doadores_source_fetch_error_total",
            MetricName::SourceFetchDuration => "doadores_source_fetch_duration_seconds",
            MetricName::SourcePayloadBytes => "doadores_source_payload_bytes",
            MetricName::RowsValidated => "doadores_rows_validated_total",
            MetricName::RecordsEmitted => "doadores_records_emitted_total",
            MetricName::BlankSlotsSkipped => "doadores_blank_slots_skipped_total",
            MetricName::InvalidTaxIds => "doadores_invalid_tax_ids_total",
            MetricName::PublishCreated => "doadores_publish_created_total",
            MetricName::PublishUpdated => "doadores_publish_updated_total",
            MetricName::PublishUnchanged => "doadores_publish_unchanged_total",
            MetricName::PublishError => "doadores_publish_error_total",
            MetricName::RunFailures => "doadores_run_failures_total",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MetricName::SourceFetchSuccess => "Successful spreadsheet downloads",
            MetricName::SourceFetchError => "Failed spreadsheet downloads",
            MetricName::SourceFetchDuration => "Spreadsheet download duration",
            MetricName::SourcePayloadBytes => "Spreadsheet payload size",
            MetricName::RowsValidated => "Rows accepted by the schema validator",
            MetricName::RecordsEmitted => "Donor records emitted",
            MetricName::BlankSlotsSkipped => "Blank equipment slots skipped",
            MetricName::InvalidTaxIds => "Rows whose CPF is not 11 digits",
            MetricName::PublishCreated => "Published file created",
            MetricName::PublishUpdated => "Published file updated",
            MetricName::PublishUnchanged => "Publish skipped because content was unchanged",
            MetricName::PublishError => "Failed publish attempts",
            MetricName::RunFailures => "Runs that ended with an error",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            SourceFetchSuccess,
            SourceFetchError,
            SourceFetchDuration,
            SourcePayloadBytes,
            RowsValidated,
            RecordsEmitted,
            BlankSlotsSkipped,
            InvalidTaxIds,
            PublishCreated,
            PublishUpdated,
            PublishUnchanged,
            PublishError,
            RunFailures,
        ]
        .into_iter()
    }

    fn is_histogram(&self) -> bool {
        matches!(
            self,
            MetricName::SourceFetchDuration | MetricName::SourcePayloadBytes
        )
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder and register metric descriptions.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    HANDLE.set(handle).ok();

    for metric in MetricName::all_metrics() {
        if metric.is_histogram() {
            describe_histogram!(metric.as_str(), metric.description());
        } else {
            describe_counter!(metric.as_str(), metric.description());
        }
    }
    Ok(())
}

pub fn increment(metric: MetricName, by: u64) {
    counter!(metric.as_str()).increment(by);
}

pub fn observe(metric: MetricName, value: f64) {
    histogram!(metric.as_str()).record(value);
}

/// Push the current snapshot to a Pushgateway when one is configured.
/// Failures are logged and never fail the run.
pub async fn push_if_configured() {
    let base = match std::env::var(ENV_PUSHGATEWAY_URL) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => return,
    };
    let Some(handle) = HANDLE.get() else {
        warn!("Metrics recorder not installed; skipping push");
        return;
    };

    let push_url = format!(
        "{}/metrics/job/{}",
        base.trim_end_matches('/'),
        "doadores_sync"
    );
    let res = reqwest::Client::new()
        .post(&push_url)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(handle.render())
        .send()
        .await;

    match res {
        Ok(r) if r.status().is_success() => info!("Pushed metrics to Pushgateway"),
        Ok(r) => warn!(
            "Pushgateway push responded with status {}",
            r.status().as_u16()
        ),
        Err(e) => warn!("Pushgateway push failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn metric_names_are_unique_and_prefixed() {
        let names: HashSet<&str> = MetricName::all_metrics().map(|m| m.as_str()).collect();
        assert_eq!(names.len(), MetricName::all_metrics().count());
        assert!(names.iter().all(|n| n.starts_with("doadores_")));
    }

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        increment(MetricName::RecordsEmitted, 3);
        observe(MetricName::SourceFetchDuration, 0.25);
    }
}
