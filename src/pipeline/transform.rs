use crate::common::constants::{
    EQUIPMENT_KEEP_CHARS, EQUIPMENT_MASK_THRESHOLD, MASK, TAX_ID_DIGITS, UNKNOWN_NAME,
};
use crate::config::Config;
use crate::pipeline::schema::InputRow;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// One published entry: a single equipment item and the masked identity of
/// the donor who gave it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorRecord {
    pub formatted_name: String,
    #[serde(rename = "cpf")]
    pub masked_tax_id: String,
    /// Always exactly one item; the list shape is what downstream readers expect.
    #[serde(rename = "celulares")]
    pub equipment_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_count_this_row: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_equipment_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_donor_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxId {
    Masked(String),
    Invalid,
}

impl TaxId {
    pub fn render(&self, invalid_marker: &str) -> String {
        match self {
            TaxId::Masked(m) => m.clone(),
            TaxId::Invalid => invalid_marker.to_string(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, TaxId::Masked(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    pub include_aggregates: bool,
    pub invalid_tax_id_marker: String,
}

impl From<&Config> for TransformOptions {
    fn from(config: &Config) -> Self {
        Self {
            include_aggregates: config.include_aggregates(),
            invalid_tax_id_marker: config.invalid_tax_id_marker.clone(),
        }
    }
}

/// Run-level totals, identical on every record of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Aggregates {
    pub total_equipment_count: usize,
    pub unique_donor_count: usize,
}

impl Aggregates {
    pub fn compute(rows: &[InputRow]) -> Self {
        let total_equipment_count = rows.iter().map(count_filled_slots).sum();
        let unique_donor_count = rows
            .iter()
            .filter_map(|r| r.tax_id.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<HashSet<_>>()
            .len();

        Self {
            total_equipment_count,
            unique_donor_count,
        }
    }
}

/// "MARIA SILVA SOUZA" -> "MARIA***SOUZA"; single tokens are only uppercased.
pub fn format_name(name: Option<&str>) -> String {
    let upper = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(UNKNOWN_NAME)
        .to_uppercase();

    let parts: Vec<&str> = upper.split_whitespace().collect();
    match parts.as_slice() {
        [first, .., last] => format!("{first}{MASK}{last}"),
        [only] => only.to_string(),
        [] => UNKNOWN_NAME.to_string(),
    }
}

/// Mask a CPF to its first three and last two digits. Anything that does not
/// reduce to exactly eleven digits is reported as invalid.
pub fn mask_tax_id(raw: Option<&str>) -> TaxId {
    let digits: String = raw
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();

    if digits.len() != TAX_ID_DIGITS {
        return TaxId::Invalid;
    }
    TaxId::Masked(format!(
        "{}{MASK}{}",
        &digits[..3],
        &digits[TAX_ID_DIGITS - 2..]
    ))
}

pub fn mask_equipment(raw: Option<&str>) -> String {
    let upper = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_uppercase(),
        _ => return String::new(),
    };

    let chars: Vec<char> = upper.chars().collect();
    if chars.len() <= EQUIPMENT_MASK_THRESHOLD {
        return upper;
    }
    let head: String = chars[..EQUIPMENT_KEEP_CHARS].iter().collect();
    let tail: String = chars[chars.len() - EQUIPMENT_KEEP_CHARS..].iter().collect();
    format!("{head}{MASK}{tail}")
}

pub fn is_blank_slot(slot: Option<&str>) -> bool {
    slot.map_or(true, |s| s.trim().is_empty())
}

pub fn count_filled_slots(row: &InputRow) -> usize {
    row.equipment
        .iter()
        .filter(|s| !is_blank_slot(s.as_deref()))
        .count()
}

/// Map validated rows to donor records: one record per filled equipment slot,
/// in row order and then slot order.
pub fn transform(rows: &[InputRow], options: &TransformOptions) -> Vec<DonorRecord> {
    let aggregates = options.include_aggregates.then(|| {
        let computed = Aggregates::compute(rows);
        warn_on_declared_mismatch(rows, &computed);
        computed
    });

    let mut records = Vec::new();
    for row in rows {
        let formatted_name = format_name(row.name.as_deref());
        let tax_id = mask_tax_id(row.tax_id.as_deref());
        if !tax_id.is_valid() {
            debug!(name = %formatted_name, "Tax id does not have {} digits", TAX_ID_DIGITS);
        }
        let masked_tax_id = tax_id.render(&options.invalid_tax_id_marker);
        let filled = count_filled_slots(row);

        for slot in &row.equipment {
            if is_blank_slot(slot.as_deref()) {
                continue;
            }
            let mut record = DonorRecord {
                formatted_name: formatted_name.clone(),
                masked_tax_id: masked_tax_id.clone(),
                equipment_list: vec![mask_equipment(slot.as_deref())],
                phone: None,
                address: None,
                equipment_count_this_row: None,
                total_equipment_count: None,
                unique_donor_count: None,
            };
            if let Some(agg) = aggregates {
                record.phone = row.phone.clone();
                record.address = row.address.clone();
                record.equipment_count_this_row = Some(filled);
                record.total_equipment_count = Some(agg.total_equipment_count);
                record.unique_donor_count = Some(agg.unique_donor_count);
            }
            records.push(record);
        }
    }
    records
}

fn warn_on_declared_mismatch(rows: &[InputRow], computed: &Aggregates) {
    let parse = |v: &str| v.parse::<f64>().ok();

    let declared_total = rows
        .iter()
        .filter_map(|r| r.declared_total_equipment.as_deref())
        .find_map(parse);
    if let Some(total) = declared_total {
        if total != computed.total_equipment_count as f64 {
            warn!(
                declared = total,
                computed = computed.total_equipment_count,
                "Sheet equipment total disagrees with recomputed value"
            );
        }
    }

    let declared_unique = rows
        .iter()
        .filter_map(|r| r.declared_unique_donors.as_deref())
        .find_map(parse);
    if let Some(unique) = declared_unique {
        if unique != computed.unique_donor_count as f64 {
            warn!(
                declared = unique,
                computed = computed.unique_donor_count,
                "Sheet unique donor count disagrees with recomputed value"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, cpf: &str, equipment: [&str; 3]) -> InputRow {
        let opt = |s: &str| {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        };
        InputRow {
            name: opt(name),
            tax_id: opt(cpf),
            equipment: equipment.map(opt),
            ..InputRow::default()
        }
    }

    fn minimal() -> TransformOptions {
        TransformOptions::from(&Config::default())
    }

    #[test]
    fn formats_multi_token_names() {
        assert_eq!(format_name(Some("Maria Silva Souza")), "MARIA***SOUZA");
        assert_eq!(format_name(Some("  joão   da  conceição ")), "JOÃO***CONCEIÇÃO");
        assert_eq!(format_name(Some("ana maria")), "ANA***MARIA");
    }

    #[test]
    fn single_token_names_are_only_uppercased() {
        assert_eq!(format_name(Some("Pelé")), "PELÉ");
    }

    #[test]
    fn missing_name_falls_back_to_sentinel() {
        assert_eq!(format_name(None), "DESCONHECIDO");
        assert_eq!(format_name(Some("   ")), "DESCONHECIDO");
    }

    #[test]
    fn masks_eleven_digit_tax_ids() {
        assert_eq!(
            mask_tax_id(Some("123.456.789-09")),
            TaxId::Masked("123***09".to_string())
        );
        assert_eq!(
            mask_tax_id(Some("01234567890")),
            TaxId::Masked("012***90".to_string())
        );
    }

    #[test]
    fn other_digit_counts_are_invalid() {
        for raw in ["1234567890", "123456789012", "abc", "", "12.345.678/0001-90"] {
            assert_eq!(mask_tax_id(Some(raw)), TaxId::Invalid, "{raw}");
        }
        assert_eq!(mask_tax_id(None), TaxId::Invalid);
        assert_eq!(TaxId::Invalid.render("CPF INVALIDO"), "CPF INVALIDO");
    }

    #[test]
    fn short_equipment_passes_through_uppercased() {
        assert_eq!(mask_equipment(Some(" Mouse ")), "MOUSE");
        assert_eq!(mask_equipment(Some("iphone 11x")), "IPHONE 11X");
    }

    #[test]
    fn long_equipment_is_masked() {
        assert_eq!(mask_equipment(Some("Notebook Dell XPS 13")), "NOTEB***PS 13");
        assert_eq!(mask_equipment(Some("Samsung A10s")), "SAMSU*** A10S");
        assert_eq!(mask_equipment(Some("Câmera digital")), "CÂMER***GITAL");
    }

    #[test]
    fn missing_equipment_is_empty() {
        assert_eq!(mask_equipment(None), "");
        assert_eq!(mask_equipment(Some("   ")), "");
        assert!(is_blank_slot(Some(" \t")));
        assert!(is_blank_slot(None));
        assert!(!is_blank_slot(Some("x")));
    }

    #[test]
    fn one_record_per_filled_slot() {
        let rows = vec![
            row("Maria Silva Souza", "123.456.789-09", ["Notebook Dell XPS 13", "", "Mouse"]),
            row("Ana", "11122233344", ["", "", ""]),
            row("Caio Prado", "1", ["Tablet", "Radio", "Teclado"]),
        ];
        let records = transform(&rows, &minimal());

        let filled: usize = rows.iter().map(count_filled_slots).sum();
        assert_eq!(records.len(), filled);
        assert_eq!(records.len(), 5);

        assert_eq!(records[0].formatted_name, "MARIA***SOUZA");
        assert_eq!(records[0].masked_tax_id, "123***09");
        assert_eq!(records[0].equipment_list, vec!["NOTEB***PS 13"]);
        assert_eq!(records[1].equipment_list, vec!["MOUSE"]);
        assert_eq!(records[2].masked_tax_id, "CPF INVALIDO");
        assert_eq!(records[4].equipment_list, vec!["TECLADO"]);
        assert!(records.iter().all(|r| r.total_equipment_count.is_none()));
    }

    #[test]
    fn extended_records_carry_run_totals() {
        let mut first = row("Maria Souza", "123.456.789-09", ["Mouse", "Radio", ""]);
        first.phone = Some("(11) 99999-0000".to_string());
        first.address = Some("Rua das Flores, 10".to_string());
        let rows = vec![
            first,
            row("Maria Souza", "123.456.789-09", ["Tablet", "", ""]),
            row("Caio", "", ["Monitor", "", ""]),
        ];
        let options = TransformOptions {
            include_aggregates: true,
            invalid_tax_id_marker: "INVALIDO".to_string(),
        };

        let records = transform(&rows, &options);
        assert_eq!(records.len(), 4);
        for r in &records {
            assert_eq!(r.total_equipment_count, Some(4));
            assert_eq!(r.unique_donor_count, Some(1));
        }
        assert_eq!(records[0].equipment_count_this_row, Some(2));
        assert_eq!(records[2].equipment_count_this_row, Some(1));
        assert_eq!(records[0].phone.as_deref(), Some("(11) 99999-0000"));
        assert_eq!(records[3].masked_tax_id, "INVALIDO");
    }

    #[test]
    fn aggregates_ignore_missing_tax_ids() {
        let rows = vec![
            row("A", "111", ["x", "y", ""]),
            row("B", "111", ["z", "", ""]),
            row("C", "", ["w", "", ""]),
            row("D", "222", ["", "", ""]),
        ];
        assert_eq!(
            Aggregates::compute(&rows),
            Aggregates {
                total_equipment_count: 4,
                unique_donor_count: 2,
            }
        );
    }

    #[test]
    fn transform_is_deterministic() {
        let rows = vec![row("Maria Silva", "123.456.789-09", ["Mouse", "Notebook Lenovo", ""])];
        assert_eq!(transform(&rows, &minimal()), transform(&rows, &minimal()));
    }
}
