use crate::common::constants::MAX_EQUIPMENT_SLOTS;
use crate::common::error::{Result, SyncError};
use crate::config::Config;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Raw spreadsheet export: trimmed header names plus string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// One spreadsheet row with every cell resolved by column name.
///
/// `None` means the column is absent, the cell is missing, or it is blank
/// after trimming. Present values are trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRow {
    pub timestamp: Option<String>,
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub shirt_size: Option<String>,
    pub equipment: [Option<String>; MAX_EQUIPMENT_SLOTS],
    /// Count columns kept by the sheet itself; recomputed, never trusted.
    pub declared_total_equipment: Option<String>,
    pub declared_unique_donors: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTable {
    pub rows: Vec<InputRow>,
}

/// Parse CSV text into a [`Table`]. Every cell is kept as text so identifiers
/// with leading zeros are not reinterpreted as numbers.
pub fn parse_table(csv_text: &str) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table { headers, rows })
}

/// Check the header row against the configured required columns and build
/// typed rows. Fails before any row is processed.
#[instrument(skip_all, fields(columns = table.headers.len(), rows = table.rows.len()))]
pub fn validate(table: &Table, config: &Config) -> Result<ValidatedTable> {
    let index: HashMap<&str, usize> = table
        .headers
        .iter()
        .enumerate()
        .rev()
        .map(|(i, h)| (h.as_str(), i))
        .collect();

    let mut missing: Vec<String> = Vec::new();
    for column in config.required_columns() {
        if !index.contains_key(column.as_str()) && !missing.contains(&column) {
            missing.push(column);
        }
    }
    if !missing.is_empty() {
        return Err(SyncError::Schema { missing });
    }

    let columns = &config.columns;
    let rows: Vec<InputRow> = table
        .rows
        .iter()
        .filter(|cells| cells.iter().any(|c| !c.trim().is_empty()))
        .map(|cells| {
            let cell = |column: &str| -> Option<String> {
                index
                    .get(column)
                    .and_then(|&i| cells.get(i))
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            };

            let mut equipment: [Option<String>; MAX_EQUIPMENT_SLOTS] = Default::default();
            for (slot, column) in equipment.iter_mut().zip(&columns.equipment) {
                *slot = cell(column);
            }

            InputRow {
                timestamp: cell(&columns.timestamp),
                name: cell(&columns.name),
                tax_id: cell(&columns.tax_id),
                phone: cell(&columns.phone),
                address: cell(&columns.address),
                city: cell(&columns.city),
                state: cell(&columns.state),
                postal_code: cell(&columns.postal_code),
                shirt_size: cell(&columns.shirt_size),
                equipment,
                declared_total_equipment: cell(&columns.total_equipment),
                declared_unique_donors: cell(&columns.unique_donors),
            }
        })
        .collect();

    if rows.is_empty() {
        return Err(SyncError::EmptyData);
    }

    for (i, row) in rows.iter().take(5).enumerate() {
        debug!(index = i, ?row, "Source row preview");
    }
    info!("Validated {} source rows", rows.len());

    Ok(ValidatedTable { rows })
}
