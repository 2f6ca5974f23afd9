use std::io::Write;

use passbook_core::ClassifiedTransaction;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One output line: the normalized record followed by its labels.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    date: String,
    description: &'a str,
    reference_type: Option<&'a str>,
    reference_number: Option<&'a str>,
    amount: String,
    balance: String,
    direction: Option<String>,
    name: &'a str,
    brand: &'a str,
    category: &'a str,
    payment_method: &'a str,
}

impl<'a> From<&'a ClassifiedTransaction> for ExportRow<'a> {
    fn from(row: &'a ClassifiedTransaction) -> Self {
        let record = &row.record;
        ExportRow {
            date: record.date.format("%d-%m-%Y").to_string(),
            description: &record.description,
            reference_type: record.reference_type.as_deref(),
            reference_number: record.reference_number.as_deref(),
            amount: record.amount.to_string(),
            balance: record.balance.to_string(),
            direction: record.direction.map(|d| d.to_string()),
            name: &row.labels.name,
            brand: &row.labels.brand,
            category: &row.labels.category,
            payment_method: &row.labels.payment_method,
        }
    }
}

/// Writes classified rows as CSV with a header line.
pub fn export_csv<W: Write>(writer: W, rows: &[ClassifiedTransaction]) -> Result<(), ExportError> {
    let mut out = csv::Writer::from_writer(writer);
    for row in rows {
        out.serialize(ExportRow::from(row))?;
    }
    out.flush()?;
    Ok(())
}

/// Writes classified rows as a pretty-printed JSON array.
pub fn export_json<W: Write>(mut writer: W, rows: &[ClassifiedTransaction]) -> Result<(), ExportError> {
    let rows: Vec<ExportRow<'_>> = rows.iter().map(ExportRow::from).collect();
    serde_json::to_writer_pretty(&mut writer, &rows)?;
    writeln!(writer)?;
    Ok(())
}
