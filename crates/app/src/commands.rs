use anyhow::{Context, Result};
use passbook_classify::{Classifier, RuleKind, RuleSet, Summary};
use passbook_core::{ClassifiedTransaction, TransactionRecord};
use passbook_import::{export_csv, export_json, import_statement_file};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::config::AppConfig;
use crate::filter::RowFilter;
use crate::report;
use crate::{FilterArgs, OutputFormat};

pub fn load_rules(config: &AppConfig) -> Result<RuleSet> {
    match &config.rules {
        Some(path) => {
            RuleSet::from_path(path).with_context(|| format!("load rules from {}", path.display()))
        }
        None => RuleSet::builtin().context("compile bundled rules"),
    }
}

pub fn load_classifier(config: &AppConfig) -> Result<Classifier> {
    Ok(Classifier::new(load_rules(config)?).with_options(config.classifier_options()))
}

pub fn load_records(config: &AppConfig, statement: &Path) -> Result<Vec<TransactionRecord>> {
    import_statement_file(statement, &config.statement)
        .with_context(|| format!("import {}", statement.display()))
}

/// Import, classify and filter one statement.
pub fn classify_statement(
    config: &AppConfig,
    statement: &Path,
    filter: &FilterArgs,
) -> Result<Vec<ClassifiedTransaction>> {
    let classifier = load_classifier(config)?;
    let records = load_records(config, statement)?;
    let classified = classifier.classify_all_parallel(&records, config.workers());
    let kept = RowFilter::from_args(filter).apply(classified);
    info!(imported = records.len(), kept = kept.len(), "classified statement");
    Ok(kept)
}

fn write_rows<W: Write>(mut out: W, rows: &[ClassifiedTransaction], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => writeln!(out, "{}", report::format_transactions(rows))?,
        OutputFormat::Csv => export_csv(&mut out, rows)?,
        OutputFormat::Json => export_json(&mut out, rows)?,
    }
    out.flush()?;
    Ok(())
}

pub fn run_classify(
    config: &AppConfig,
    statement: &Path,
    filter: &FilterArgs,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let rows = classify_statement(config, statement, filter)?;
    match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
            write_rows(BufWriter::new(file), &rows, format)?;
            info!(path = %path.display(), rows = rows.len(), "wrote output");
        }
        None => write_rows(io::stdout().lock(), &rows, format)?,
    }

    let unclassified = rows.iter().filter(|r| r.labels.is_unclassified()).count();
    if unclassified > 0 {
        eprintln!("{unclassified} of {} rows unclassified", rows.len());
    }
    Ok(())
}

pub fn run_summary(config: &AppConfig, statement: &Path, filter: &FilterArgs, top: usize) -> Result<()> {
    let rows = classify_statement(config, statement, filter)?;
    let summary = Summary::from_classified(&rows);
    print!("{}", report::format_summary(&summary, top));
    Ok(())
}

pub fn run_rules_check(config: &AppConfig) -> Result<()> {
    let rules = load_rules(config)?;
    let source = config
        .rules
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "bundled rules".to_string());
    println!("{source}: ok");
    for kind in RuleKind::ALL {
        println!("  {kind:<15} {:>4} rules", rules.table(kind).len());
    }
    Ok(())
}

pub fn run_rules_show(config: &AppConfig, kind: RuleKind) -> Result<()> {
    let rules = load_rules(config)?;
    println!("{}", report::format_rule_table(rules.table(kind)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use passbook_classify::PaymentStyle;
    use std::io::Write as _;

    const STATEMENT: &str = "\
Account Statement
Txn Date,Description,Ref No./Cheque No.,Amount,Dr / Cr,Balance
15-01-2024,UPI/JOHN DOE/1234567890/Payment,UPI-4015,\"1,500.00\",DR,\"24,500.00\"
16-01-2024,IMPS-CR-RENT PAYMENT-BHUPESH JINGAR,,12000,CR,36500
17-01-2024,RANDOM UNMATCHED TEXT 42,,1,DR,36499
";

    fn statement_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(STATEMENT.as_bytes()).unwrap();
        file
    }

    #[test]
    fn classifies_statement_file() {
        let file = statement_file();
        let rows = classify_statement(&AppConfig::default(), file.path(), &FilterArgs::default()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].labels.name, "John Doe");
        assert_eq!(rows[1].labels.category, "House Rent");
        assert!(rows[2].labels.is_unclassified());
    }

    #[test]
    fn filters_apply_after_classification() {
        let file = statement_file();
        let filter = FilterArgs { unclassified: true, ..Default::default() };
        let rows = classify_statement(&AppConfig::default(), file.path(), &filter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.description, "RANDOM UNMATCHED TEXT 42");
    }

    #[test]
    fn payment_style_from_config() {
        let file = statement_file();
        let config = AppConfig { payment_style: PaymentStyle::Code, ..Default::default() };
        let rows = classify_statement(&config, file.path(), &FilterArgs::default()).unwrap();
        assert_eq!(rows[0].labels.payment_method, "UPI");
        assert_eq!(rows[1].labels.payment_method, "IMPS");
    }

    #[test]
    fn custom_rule_file_replaces_bundled_tables() {
        let mut rules = tempfile::NamedTempFile::new().unwrap();
        writeln!(rules, "[[category]]\nlabel = \"Misc\"\npattern = \"random\"").unwrap();
        let config = AppConfig { rules: Some(rules.path().to_path_buf()), ..Default::default() };
        let loaded = load_rules(&config).unwrap();
        assert_eq!(loaded.categories.len(), 1);
        assert!(loaded.names.is_empty());
    }

    #[test]
    fn invalid_rule_file_is_reported() {
        let mut rules = tempfile::NamedTempFile::new().unwrap();
        writeln!(rules, "[[name]]\nlabel = \"Bad\"\npattern = \"(unclosed\"").unwrap();
        let config = AppConfig { rules: Some(rules.path().to_path_buf()), ..Default::default() };
        let err = load_classifier(&config).unwrap_err();
        assert!(format!("{err:#}").contains("Bad"));
    }

    #[test]
    fn writes_csv_output_file() {
        let file = statement_file();
        let out = tempfile::NamedTempFile::new().unwrap();
        run_classify(
            &AppConfig::default(),
            file.path(),
            &FilterArgs::default(),
            OutputFormat::Csv,
            Some(out.path()),
        )
        .unwrap();
        let text = std::fs::read_to_string(out.path()).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.starts_with("date,description,"));
    }

    #[test]
    fn missing_statement_errors() {
        let err = load_records(&AppConfig::default(), Path::new("/no/such/statement.csv")).unwrap_err();
        assert!(err.to_string().contains("import"));
    }
}
