use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use passbook_classify::{CategorySource, PaymentStyle, RuleKind};
use passbook_core::Direction;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod filter;
mod report;

#[derive(Parser, Debug)]
#[command(
    name = "passbook",
    version,
    about = "Label bank statement rows with counterparty, category and payment channel"
)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Rule file replacing the bundled tables
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// Match categories against the resolved name or the raw description
    #[arg(long, global = true, value_name = "name|description")]
    category_source: Option<CategorySource>,

    /// Print payment channels as full labels or short codes
    #[arg(long, global = true, value_name = "label|code")]
    payment_style: Option<PaymentStyle>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify every row of a statement
    Classify {
        statement: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Totals per category, counterparty and payment channel
    Summary {
        statement: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,

        /// Number of counterparties to list (default: 10)
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Inspect the active rule tables
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum RulesCommand {
    /// Compile every table and report the rule counts
    Check,

    /// List one table in match order
    Show {
        /// vendor, name, brand, category, payment_method or payment_code
        kind: RuleKind,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Earliest transaction date (dd-mm-yyyy)
    #[arg(long, value_parser = parse_cli_date)]
    pub from: Option<NaiveDate>,

    /// Latest transaction date (dd-mm-yyyy)
    #[arg(long, value_parser = parse_cli_date)]
    pub to: Option<NaiveDate>,

    /// Financial year starting April of YEAR
    #[arg(long, value_name = "YEAR", conflicts_with_all = ["from", "to"])]
    pub fy: Option<u16>,

    /// credit or debit
    #[arg(long)]
    pub direction: Option<Direction>,

    /// Keep only these categories (repeatable)
    #[arg(long = "category", value_name = "LABEL")]
    pub categories: Vec<String>,

    /// Keep only rows with neither a name nor a category
    #[arg(long)]
    pub unclassified: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

fn parse_cli_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%d-%m-%Y")
        .map_err(|_| format!("expected dd-mm-yyyy, got '{s}'"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,passbook=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(rules) = cli.rules {
        config.rules = Some(rules);
    }
    if let Some(source) = cli.category_source {
        config.category_source = source;
    }
    if let Some(style) = cli.payment_style {
        config.payment_style = style;
    }

    match cli.command {
        Command::Classify {
            statement,
            filter,
            format,
            output,
        } => commands::run_classify(&config, &statement, &filter, format, output.as_deref()),
        Command::Summary {
            statement,
            filter,
            top,
        } => commands::run_summary(&config, &statement, &filter, top),
        Command::Rules { command } => match command {
            RulesCommand::Check => commands::run_rules_check(&config),
            RulesCommand::Show { kind } => commands::run_rules_show(&config, kind),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_classify_with_filters() {
        let cli = Cli::try_parse_from([
            "passbook",
            "--payment-style",
            "code",
            "classify",
            "stmt.csv",
            "--from",
            "01-04-2024",
            "--direction",
            "debit",
            "--category",
            "Food",
            "--category",
            "Fuel",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.payment_style, Some(PaymentStyle::Code));
        match cli.command {
            Command::Classify { statement, filter, format, output } => {
                assert_eq!(statement, PathBuf::from("stmt.csv"));
                assert_eq!(filter.from, NaiveDate::from_ymd_opt(2024, 4, 1));
                assert_eq!(filter.direction, Some(Direction::Debit));
                assert_eq!(filter.categories, vec!["Food", "Fuel"]);
                assert_eq!(format, OutputFormat::Json);
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn fy_conflicts_with_explicit_dates() {
        let err = Cli::try_parse_from(["passbook", "summary", "s.csv", "--fy", "2024", "--to", "01-01-2025"]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_iso_dates() {
        assert!(parse_cli_date("2024-04-01").is_err());
        assert_eq!(parse_cli_date("31-03-2025"), Ok(NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["passbook", "rules", "show", "payment-code", "--category-source", "description"])
            .unwrap();
        assert_eq!(cli.category_source, Some(CategorySource::Description));
        assert!(matches!(
            cli.command,
            Command::Rules { command: RulesCommand::Show { kind: RuleKind::PaymentCode } }
        ));
    }
}
