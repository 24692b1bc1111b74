use crate::common::error::{Result, SyncError};
use crate::pipeline::transform::DonorRecord;
use jsonschema::JSONSchema;
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value;

const OUTPUT_SCHEMA_SOURCE: &str = include_str!("../../schemas/doadores.v1.json");

static OUTPUT_SCHEMA: OnceCell<Value> = OnceCell::new();

/// Placeholder element published when no donor produced a record.
#[derive(Debug, Serialize)]
struct EmptyNotice<'a> {
    message: &'a str,
}

/// Serialize records to the published JSON array.
///
/// An empty run still yields a one-element array holding `empty_message`.
/// Non-ASCII text is written as-is.
pub fn render(records: &[DonorRecord], empty_message: &str) -> Result<String> {
    if records.is_empty() {
        return Ok(serde_json::to_string(&[EmptyNotice {
            message: empty_message,
        }])?);
    }
    Ok(serde_json::to_string(records)?)
}

/// Check a rendered document against the bundled output schema.
pub fn validate_output(document: &str) -> Result<()> {
    let schema = OUTPUT_SCHEMA.get_or_try_init(|| serde_json::from_str(OUTPUT_SCHEMA_SOURCE))?;
    let compiled = JSONSchema::compile(schema)
        .map_err(|e| SyncError::OutputSchema(vec![format!("invalid bundled schema: {e}")]))?;

    let instance: Value = serde_json::from_str(document)?;
    if let Err(errors) = compiled.validate(&instance) {
        let messages = errors
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect::<Vec<_>>();
        return Err(SyncError::OutputSchema(messages));
    }
    Ok(())
}
