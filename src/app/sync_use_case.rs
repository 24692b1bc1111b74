use crate::app::ports::{PublisherPort, SourcePort};
use crate::common::error::Result;
use crate::config::Config;
use crate::observability::metrics::{self, MetricName};
use crate::pipeline::schema::{self, InputRow};
use crate::pipeline::serialize;
use crate::pipeline::transform::{self, DonorRecord, TransformOptions};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// What happened to the remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishOutcome {
    Created,
    Updated,
    Unchanged,
    DryRun,
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PublishOutcome::Created => "created",
            PublishOutcome::Updated => "updated",
            PublishOutcome::Unchanged => "unchanged",
            PublishOutcome::DryRun => "dry-run",
        };
        f.write_str(s)
    }
}

/// Result of a complete sync run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub rows: usize,
    pub records: usize,
    pub invalid_tax_ids: usize,
    pub output_path: String,
    pub outcome: PublishOutcome,
    /// Rendered document, kept so a dry run can print or save it.
    #[serde(skip)]
    pub document: String,
}

/// Fetch, validate, transform, render and publish the donor list.
///
/// Nothing is written remotely unless every earlier step succeeded.
pub struct SyncUseCase {
    source: Box<dyn SourcePort>,
    publisher: Option<Box<dyn PublisherPort>>,
    config: Config,
}

impl SyncUseCase {
    pub fn new(
        source: Box<dyn SourcePort>,
        publisher: Box<dyn PublisherPort>,
        config: Config,
    ) -> Self {
        Self {
            source,
            publisher: Some(publisher),
            config,
        }
    }

    /// A use case that stops after rendering and never touches the remote store.
    pub fn dry_run(source: Box<dyn SourcePort>, config: Config) -> Self {
        Self {
            source,
            publisher: None,
            config,
        }
    }

    /// Fetch and validate only.
    pub async fn check(&self) -> Result<Vec<InputRow>> {
        let csv_text = self.source.fetch_csv().await?;
        let table = schema::parse_table(&csv_text)?;
        let validated = schema::validate(&table, &self.config)?;
        Ok(validated.rows)
    }

    /// Build the JSON document for the current source without publishing.
    pub async fn build_document(&self) -> Result<(Vec<InputRow>, Vec<DonorRecord>, String)> {
        info!(source = %self.source.describe(), "Fetching donor spreadsheet");
        let rows = self.check().await?;
        metrics::increment(MetricName::RowsValidated, rows.len() as u64);

        let records = transform::transform(&rows, &TransformOptions::from(&self.config));
        let blank_slots = rows.len() * self.config.columns.equipment.len()
            - rows.iter().map(transform::count_filled_slots).sum::<usize>();
        metrics::increment(MetricName::RecordsEmitted, records.len() as u64);
        metrics::increment(MetricName::BlankSlotsSkipped, blank_slots as u64);
        debug!(?records, "Processed donor records");

        if records.is_empty() {
            warn!("No donor records produced; publishing the empty notice");
        }
        let document = serialize::render(&records, &self.config.empty_message)?;
        serialize::validate_output(&document)?;
        Ok((rows, records, document))
    }

    #[instrument(skip(self), fields(path = %self.config.output_path))]
    pub async fn execute(&self) -> Result<SyncReport> {
        let (rows, records, document) = self.build_document().await?;

        let invalid_tax_ids = rows
            .iter()
            .filter(|r| !transform::mask_tax_id(r.tax_id.as_deref()).is_valid())
            .count();
        metrics::increment(MetricName::InvalidTaxIds, invalid_tax_ids as u64);

        let outcome = match &self.publisher {
            Some(publisher) => self.publish(publisher.as_ref(), &document).await?,
            None => PublishOutcome::DryRun,
        };

        let report = SyncReport {
            rows: rows.len(),
            records: records.len(),
            invalid_tax_ids,
            output_path: self.config.output_path.clone(),
            outcome,
            document,
        };
        info!(
            rows = report.rows,
            records = report.records,
            outcome = %report.outcome,
            "Sync finished"
        );
        Ok(report)
    }

    async fn publish(&self, publisher: &dyn PublisherPort, document: &str) -> Result<PublishOutcome> {
        let path = &self.config.output_path;
        let result = match publisher.get_file(path).await {
            Ok(Some(existing)) if self.config.skip_unchanged && existing.content == document => {
                info!("Remote file already up to date");
                Ok(PublishOutcome::Unchanged)
            }
            Ok(Some(existing)) => publisher
                .update_file(path, &self.config.commit_message_update, document, &existing.sha)
                .await
                .map(|_| PublishOutcome::Updated),
            Ok(None) => publisher
                .create_file(path, &self.config.commit_message_create, document)
                .await
                .map(|_| PublishOutcome::Created),
            Err(e) => Err(e),
        };

        match &result {
            Ok(PublishOutcome::Created) => metrics::increment(MetricName::PublishCreated, 1),
            Ok(PublishOutcome::Updated) => metrics::increment(MetricName::PublishUpdated, 1),
            Ok(PublishOutcome::Unchanged) => metrics::increment(MetricName::PublishUnchanged, 1),
            Ok(PublishOutcome::DryRun) => {}
            Err(_) => metrics::increment(MetricName::PublishError, 1),
        }
        result
    }
}
