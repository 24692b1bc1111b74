// Data pipeline: validate the source table, build donor records, render JSON

pub mod schema;
pub mod serialize;
pub mod transform;

// Re-export key types and functions from each stage
pub use schema::{parse_table, validate, InputRow, Table, ValidatedTable};
pub use serialize::{render, validate_output};
pub use transform::{transform, Aggregates, DonorRecord, TaxId, TransformOptions};
