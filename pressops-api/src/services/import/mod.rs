//! Bulk import pipeline
//!
//! Three record kinds share one shape: an ordered list of row maps plus
//! a column-name-to-field mapping. Rows are processed independently and
//! in input order; one row's failure never aborts or rolls back another
//! row's success. Every execute run persists one `ImportBatch` summary.
//!
//! Reported row numbers are 1-based source line numbers assuming a
//! header row, so the first data row is row 2.

pub mod books;
pub mod sales;
pub mod users;

use chrono::Utc;
use pressops_common::db::models::ImportBatch;
use pressops_common::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

/// One parsed input row: column name (or field name) to raw value.
pub type Row = HashMap<String, String>;

/// Column-name-to-field mapping. An empty mapping means row keys are
/// already field names.
pub type Mapping = HashMap<String, String>;

/// Supported import types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportType {
    Users,
    Books,
    Sales,
}

impl ImportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportType::Users => "users",
            ImportType::Books => "books",
            ImportType::Sales => "sales",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "users" => Some(ImportType::Users),
            "books" => Some(ImportType::Books),
            "sales" => Some(ImportType::Sales),
            _ => None,
        }
    }
}

/// One per-row problem, tagged with its source row number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowIssue {
    pub row: usize,
    pub message: String,
}

/// Dry-run result: what execute would do, without writing anything
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub valid_count: usize,
    pub warnings: Vec<RowIssue>,
    pub errors: Vec<RowIssue>,
}

/// Per-row outcomes of an execute run plus the persisted batch id
#[derive(Debug, Serialize)]
pub struct ExecutionReport {
    pub batch_id: String,
    pub success_count: usize,
    pub skipped_count: usize,
    pub error_count: usize,
    pub success: Vec<serde_json::Value>,
    pub skipped: Vec<RowIssue>,
    pub errors: Vec<RowIssue>,
    /// Royalty rows generated as a side effect of sales rows
    pub royalties_generated: usize,
}

/// Validate rows without writing. Same required-field and existence
/// checks as execute.
pub async fn validate(
    pool: &SqlitePool,
    import_type: ImportType,
    rows: &[Row],
    mapping: &Mapping,
) -> Result<ValidationReport> {
    match import_type {
        ImportType::Users => users::validate(pool, rows, mapping).await,
        ImportType::Books => books::validate(pool, rows, mapping).await,
        ImportType::Sales => sales::validate(pool, rows, mapping).await,
    }
}

/// Execute an import row by row and persist the batch summary.
pub async fn execute(
    pool: &SqlitePool,
    import_type: ImportType,
    rows: &[Row],
    mapping: &Mapping,
) -> Result<ExecutionReport> {
    let mut report = match import_type {
        ImportType::Users => users::execute(pool, rows, mapping).await?,
        ImportType::Books => books::execute(pool, rows, mapping).await?,
        ImportType::Sales => sales::execute(pool, rows, mapping).await?,
    };

    let now = Utc::now();
    let batch = ImportBatch {
        id: Uuid::new_v4().to_string(),
        import_type: import_type.as_str().to_string(),
        total_rows: rows.len() as i64,
        success_count: report.success_count as i64,
        skipped_count: report.skipped_count as i64,
        error_count: report.error_count as i64,
        row_detail: json!({
            "skipped": report.skipped,
            "errors": report.errors,
        })
        .to_string(),
        status: "completed".to_string(),
        created_at: now,
        completed_at: Some(now),
    };
    crate::db::imports::insert_batch(pool, &batch).await?;
    report.batch_id = batch.id;

    tracing::info!(
        import_type = %import_type.as_str(),
        total = rows.len(),
        success = report.success_count,
        skipped = report.skipped_count,
        errors = report.error_count,
        "Import batch completed"
    );

    Ok(report)
}

/// Parse raw CSV text into rows keyed by header names.
pub fn parse_csv(text: &str) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::Validation(format!("Invalid CSV header: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::Validation(format!("Invalid CSV row: {}", e)))?;
        let mut row = Row::new();
        for (i, value) in record.iter().enumerate() {
            if let Some(header) = headers.get(i) {
                row.insert(header.clone(), value.to_string());
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Project a raw row through the column mapping onto canonical field
/// names. Empty mapping passes the row through unchanged.
pub(crate) fn apply_mapping(row: &Row, mapping: &Mapping) -> Row {
    if mapping.is_empty() {
        return row.clone();
    }
    let mut out = Row::new();
    for (column, field) in mapping {
        if let Some(value) = row.get(column) {
            out.insert(field.clone(), value.clone());
        }
    }
    out
}

/// Non-empty field value, trimmed
pub(crate) fn field<'a>(row: &'a Row, name: &str) -> Option<&'a str> {
    row.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Displayed source row number for data row index `i`
pub(crate) fn row_number(i: usize) -> usize {
    i + 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_parse_keys_rows_by_header() {
        let rows = parse_csv("email,name\n jane@x.com , Jane Doe \nbob@x.com,Bob").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["email"], "jane@x.com");
        assert_eq!(rows[0]["name"], "Jane Doe");
        assert_eq!(rows[1]["name"], "Bob");
    }

    #[test]
    fn mapping_projects_columns_onto_fields() {
        let mut row = Row::new();
        row.insert("E-Mail".to_string(), "a@x.com".to_string());
        row.insert("Full Name".to_string(), "A".to_string());

        let mut mapping = Mapping::new();
        mapping.insert("E-Mail".to_string(), "email".to_string());
        mapping.insert("Full Name".to_string(), "name".to_string());

        let mapped = apply_mapping(&row, &mapping);
        assert_eq!(mapped["email"], "a@x.com");
        assert_eq!(mapped["name"], "A");

        // Empty mapping is pass-through
        let passthrough = apply_mapping(&row, &Mapping::new());
        assert_eq!(passthrough, row);
    }

    #[test]
    fn row_numbers_account_for_header() {
        assert_eq!(row_number(0), 2);
        assert_eq!(row_number(4), 6);
    }
}
