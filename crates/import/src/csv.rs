use chrono::NaiveDate;
use passbook_core::{Direction, Money, TransactionRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Header names of the statement columns the importer reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementColumns {
    pub date: String,
    pub description: String,
    pub reference: Option<String>,
    pub amount: String,
    pub direction: Option<String>,
    pub balance: Option<String>,
}

impl Default for StatementColumns {
    fn default() -> Self {
        Self {
            date: "Txn Date".to_string(),
            description: "Description".to_string(),
            reference: Some("Ref No./Cheque No.".to_string()),
            amount: "Amount".to_string(),
            direction: Some("Dr / Cr".to_string()),
            balance: Some("Balance".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementProfile {
    pub name: String,
    pub columns: StatementColumns,
    /// Applied after `/` has been rewritten to `-`.
    pub date_format: String,
    pub delimiter: String,
    /// Splits e.g. `UPI-401512345678` into type and number.
    pub reference_separator: String,
}

impl Default for StatementProfile {
    fn default() -> Self {
        Self {
            name: "Savings account export".to_string(),
            columns: StatementColumns::default(),
            date_format: "%d-%m-%Y".to_string(),
            delimiter: ",".to_string(),
            reference_separator: "-".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Invalid amount on line {line}: {value}")]
    InvalidAmount { line: u64, value: String },
    #[error("No data rows")]
    NoDataRows,
}

/// Field positions resolved from the header row.
struct ColumnIndex {
    date: usize,
    description: usize,
    reference: Option<usize>,
    amount: usize,
    direction: Option<usize>,
    balance: Option<usize>,
}

impl ColumnIndex {
    fn find(header: &csv::StringRecord, name: &str) -> Option<usize> {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
    }

    /// Banks prepend account details above the header; the header is the
    /// first row naming both the date and the description columns.
    fn is_header(record: &csv::StringRecord, columns: &StatementColumns) -> bool {
        Self::find(record, &columns.date).is_some()
            && Self::find(record, &columns.description).is_some()
    }

    fn locate(header: &csv::StringRecord, columns: &StatementColumns) -> Result<Self, ImportError> {
        let required = |name: &str| {
            Self::find(header, name).ok_or_else(|| ImportError::MissingColumn(name.to_string()))
        };
        let optional = |name: &Option<String>| name.as_deref().map(required).transpose();

        Ok(ColumnIndex {
            date: required(columns.date.as_str())?,
            description: required(columns.description.as_str())?,
            reference: optional(&columns.reference)?,
            amount: required(columns.amount.as_str())?,
            direction: optional(&columns.direction)?,
            balance: optional(&columns.balance)?,
        })
    }
}

fn read_records<R: Read>(
    reader: &mut csv::Reader<R>,
    profile: &StatementProfile,
) -> Result<Vec<TransactionRecord>, ImportError> {
    let columns = &profile.columns;
    let mut index: Option<ColumnIndex> = None;
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for result in reader.records() {
        let record = result?;

        let Some(idx) = index.as_ref() else {
            if ColumnIndex::is_header(&record, columns) {
                index = Some(ColumnIndex::locate(&record, columns)?);
            }
            continue;
        };

        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let date_cell = record.get(idx.date).unwrap_or_default().trim();
        if date_cell.is_empty() {
            continue;
        }
        let Some(date) = parse_date(date_cell, &profile.date_format) else {
            // Footer rows ("Total", "Closing balance") land here.
            tracing::warn!(line, value = date_cell, "skipping row with unparseable date");
            skipped += 1;
            continue;
        };

        let (reference_type, reference_number) = idx
            .reference
            .and_then(|col| record.get(col))
            .map(|cell| split_reference(cell, &profile.reference_separator))
            .unwrap_or((None, None));

        let amount_cell = record.get(idx.amount).unwrap_or_default();
        let (amount, suffix_direction) =
            parse_amount(amount_cell).ok_or_else(|| ImportError::InvalidAmount {
                line,
                value: amount_cell.to_string(),
            })?;

        let direction = idx
            .direction
            .and_then(|col| record.get(col))
            .and_then(Direction::from_code)
            .or(suffix_direction);

        let balance = match idx.balance.and_then(|col| record.get(col)) {
            Some(cell) => {
                parse_amount(cell)
                    .ok_or_else(|| ImportError::InvalidAmount {
                        line,
                        value: cell.to_string(),
                    })?
                    .0
            }
            None => Money::zero(),
        };

        records.push(TransactionRecord {
            date,
            description: record.get(idx.description).unwrap_or_default().trim().to_string(),
            reference_type,
            reference_number,
            amount,
            balance,
            direction,
        });
    }

    if index.is_none() {
        return Err(ImportError::MissingColumn(columns.date.clone()));
    }
    if records.is_empty() {
        return Err(ImportError::NoDataRows);
    }

    tracing::info!(profile = %profile.name, rows = records.len(), skipped, "imported statement");
    Ok(records)
}

fn parse_date(s: &str, format: &str) -> Option<NaiveDate> {
    let s = s.trim().replace('/', "-");

    if let Ok(date) = NaiveDate::parse_from_str(&s, format) {
        return Some(date);
    }

    ["%d-%b-%Y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&s, fmt).ok())
}

/// `"UPI-4015"` -> `(Some("UPI"), Some("4015"))`; no separator keeps the whole
/// value as the number.
fn split_reference(raw: &str, separator: &str) -> (Option<String>, Option<String>) {
    let non_empty = |s: &str| Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_string);

    let raw = raw.trim();
    if raw.is_empty() {
        return (None, None);
    }
    match raw.split_once(separator).filter(|_| !separator.is_empty()) {
        Some((kind, number)) => (non_empty(kind), non_empty(number)),
        None => (None, Some(raw.to_string())),
    }
}

/// Strips a trailing `Cr`/`Dr` marker, e.g. `"1,234.00 Cr"`.
fn split_direction_suffix(s: &str) -> (&str, Option<Direction>) {
    if let Some((head, tail)) = s.rsplit_once(char::is_whitespace) {
        if let Some(direction) = Direction::from_code(tail) {
            return (head, Some(direction));
        }
    }
    (s, None)
}

/// Non-negative amount plus any direction marker found in the cell. Blank
/// cells are zero; `None` means the cell is not a number.
fn parse_amount(s: &str) -> Option<(Money, Option<Direction>)> {
    let (s, direction) = split_direction_suffix(s.trim());
    let s = s.trim();
    let s = s
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(s);
    let s = s.trim_start_matches("INR").trim_start_matches("Rs.");
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '\u{20b9}' | '$'))
        .collect();

    if cleaned.is_empty() {
        return Some((Money::zero(), direction));
    }
    let dec = Decimal::from_str(&cleaned).ok()?;
    Some((Money::from_decimal(dec.abs()), direction))
}

pub fn import_statement<R: Read>(
    data: R,
    profile: &StatementProfile,
) -> Result<Vec<TransactionRecord>, ImportError> {
    let delimiter = profile
        .delimiter
        .as_bytes()
        .first()
        .copied()
        .unwrap_or(b',');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(data);

    read_records(&mut reader, profile)
}

pub fn import_statement_file(
    path: &Path,
    profile: &StatementProfile,
) -> Result<Vec<TransactionRecord>, ImportError> {
    let file = std::fs::File::open(path)?;
    import_statement(std::io::BufReader::new(file), profile)
}
