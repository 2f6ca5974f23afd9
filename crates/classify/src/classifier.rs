use std::fmt;
use std::str::FromStr;

use passbook_core::{ClassificationResult, ClassifiedTransaction, TransactionRecord, OTHER};
use serde::{Deserialize, Serialize};

use crate::extract::EntityExtractor;
use crate::normalize::collapse_whitespace;
use crate::rules::{RuleError, RuleSet};

/// Which text the category table is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    /// The counterparty label produced by `classify_name`.
    #[default]
    #[serde(alias = "name")]
    ResolvedName,
    /// The raw statement description.
    Description,
}

impl FromStr for CategorySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" | "resolved_name" | "resolved-name" => Ok(CategorySource::ResolvedName),
            "description" => Ok(CategorySource::Description),
            other => Err(format!("Unknown category source: '{other}'")),
        }
    }
}

impl fmt::Display for CategorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategorySource::ResolvedName => write!(f, "name"),
            CategorySource::Description => write!(f, "description"),
        }
    }
}

/// Selects between the two parallel payment-channel tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStyle {
    /// "Unified Payments Interface [UPI]"
    #[default]
    Label,
    /// "UPI"
    Code,
}

impl FromStr for PaymentStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "label" => Ok(PaymentStyle::Label),
            "code" => Ok(PaymentStyle::Code),
            other => Err(format!("Unknown payment style: '{other}'")),
        }
    }
}

impl fmt::Display for PaymentStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStyle::Label => write!(f, "label"),
            PaymentStyle::Code => write!(f, "code"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierOptions {
    pub category_source: CategorySource,
    pub payment_style: PaymentStyle,
}

/// Assigns counterparty, brand, category and payment-method labels to
/// statement descriptions. Holds only read-only tables, so one instance can
/// be shared across threads.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: RuleSet,
    extractor: EntityExtractor,
    options: ClassifierOptions,
}

impl Classifier {
    pub fn new(rules: RuleSet) -> Self {
        let extractor = EntityExtractor::new(rules.vendors.clone());
        Self {
            rules,
            extractor,
            options: ClassifierOptions::default(),
        }
    }

    /// A classifier over the bundled rule tables.
    pub fn builtin() -> Result<Self, RuleError> {
        Ok(Self::new(RuleSet::builtin()?))
    }

    pub fn with_options(mut self, options: ClassifierOptions) -> Self {
        self.options = options;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn resolve_name<'a>(&'a self, text: &str) -> &'a str {
        self.rules.names.resolve(text)
    }

    pub fn resolve_brand<'a>(&'a self, text: &str) -> &'a str {
        self.rules.brands.resolve(text)
    }

    pub fn resolve_category<'a>(&'a self, text: &str) -> &'a str {
        self.rules.categories.resolve(text)
    }

    pub fn resolve_payment_method<'a>(&'a self, text: &str, style: PaymentStyle) -> &'a str {
        match style {
            PaymentStyle::Label => self.rules.payment_methods.resolve(text),
            PaymentStyle::Code => self.rules.payment_codes.resolve(text),
        }
    }

    /// Structural guess first (a known name beats the raw substring), then
    /// the name table over the description, then the brand table.
    pub fn classify_name(&self, description: &str) -> String {
        self.name_for(&collapse_whitespace(description))
    }

    fn name_for(&self, description: &str) -> String {
        let guess = self.extractor.extract(description);
        if guess != OTHER {
            return match self.resolve_name(&guess) {
                OTHER => guess,
                known => known.to_string(),
            };
        }
        match self.resolve_name(description) {
            OTHER => self.resolve_brand(description).to_string(),
            known => known.to_string(),
        }
    }

    /// Runs of whitespace in `description` are collapsed before any table
    /// sees it, so padded narrations match the same rules.
    pub fn classify(&self, description: &str) -> ClassificationResult {
        let normalized = collapse_whitespace(description);
        let description = normalized.as_str();
        let name = self.name_for(description);
        let category_input = match self.options.category_source {
            CategorySource::ResolvedName => name.as_str(),
            CategorySource::Description => description,
        };
        let result = ClassificationResult {
            brand: self.resolve_brand(description).to_string(),
            category: self.resolve_category(category_input).to_string(),
            payment_method: self
                .resolve_payment_method(description, self.options.payment_style)
                .to_string(),
            name,
        };
        tracing::trace!(
            description,
            name = %result.name,
            category = %result.category,
            payment_method = %result.payment_method,
            "classified"
        );
        result
    }

    pub fn classify_record(&self, record: &TransactionRecord) -> ClassifiedTransaction {
        ClassifiedTransaction {
            labels: self.classify(&record.description),
            record: record.clone(),
        }
    }

    /// Classifies every record in input order.
    pub fn classify_all(&self, records: &[TransactionRecord]) -> Vec<ClassifiedTransaction> {
        let classified: Vec<_> = records.iter().map(|r| self.classify_record(r)).collect();
        log_batch(&classified);
        classified
    }

    /// Same output as [`classify_all`](Self::classify_all), split across
    /// `workers` scoped threads. Rows share no state, so no locking is needed.
    pub fn classify_all_parallel(
        &self,
        records: &[TransactionRecord],
        workers: usize,
    ) -> Vec<ClassifiedTransaction> {
        let workers = workers.max(1);
        if workers == 1 || records.len() < 2 {
            return self.classify_all(records);
        }
        let chunk_size = records.len().div_ceil(workers);

        let classified: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = records
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk.iter().map(|r| self.classify_record(r)).collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(rows) => rows,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });
        log_batch(&classified);
        classified
    }
}

fn log_batch(classified: &[ClassifiedTransaction]) {
    let unclassified = classified
        .iter()
        .filter(|c| c.labels.is_unclassified())
        .count();
    tracing::debug!(rows = classified.len(), unclassified, "classified batch");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleDefinition, RuleKind, RuleTable};
    use chrono::NaiveDate;
    use passbook_core::{Direction, Money};

    fn builtin() -> Classifier {
        Classifier::builtin().unwrap()
    }

    fn with_source(source: CategorySource) -> Classifier {
        builtin().with_options(ClassifierOptions {
            category_source: source,
            ..ClassifierOptions::default()
        })
    }

    fn record(desc: &str) -> TransactionRecord {
        TransactionRecord::new(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            desc,
            Money::from_cents(10000),
            Some(Direction::Debit),
        )
    }

    const SAMPLES: &[&str] = &[
        "UPI/JOHN DOE/1234567890/Payment",
        "IMPS-CR-RENT PAYMENT-BHUPESH JINGAR",
        "RANDOM UNMATCHED TEXT 42",
        "POS 4411 INDIAN OIL PETROL PUMP",
        "UPI/AMAZON PAY/amazon@apl/412345",
        "NEFT CR-COGNIZANT TECHNOLOGY SOLUTIONS",
        "ATM CASH WDL 0042 MG ROAD",
        "",
    ];

    // ── End-to-end ────────────────────────────────────────────────────────────

    #[test]
    fn upi_transfer_to_unknown_person() {
        let c = builtin();
        let r = c.classify("UPI/JOHN DOE/1234567890/Payment");
        assert_eq!(r.name, "John Doe");
        assert_eq!(r.payment_method, "Unified Payments Interface [UPI]");
    }

    #[test]
    fn rent_to_known_landlord() {
        for source in [CategorySource::ResolvedName, CategorySource::Description] {
            let r = with_source(source).classify("IMPS-CR-RENT PAYMENT-BHUPESH JINGAR");
            assert_eq!(r.name, "Bhupesh Jingar", "{source}");
            assert_eq!(r.category, "House Rent", "{source}");
            assert_eq!(r.payment_method, "Immediate Payment Service [IMPS]", "{source}");
        }
    }

    #[test]
    fn unmatched_text_is_other_everywhere() {
        let r = builtin().classify("RANDOM UNMATCHED TEXT 42");
        assert_eq!(r, ClassificationResult::unclassified());
    }

    #[test]
    fn empty_description_is_other_everywhere() {
        assert_eq!(builtin().classify(""), ClassificationResult::unclassified());
        assert_eq!(builtin().classify("  \n "), ClassificationResult::unclassified());
    }

    // ── Name resolution ──────────────────────────────────────────────────────

    #[test]
    fn known_label_beats_extracted_substring() {
        let c = builtin();
        assert_eq!(c.classify_name("UPI/HITESH/9876543210/Dinner"), "Hitesh Bhagat");
    }

    #[test]
    fn name_falls_back_to_brand() {
        let c = builtin();
        let r = c.classify("POS 1234 SWIGGY BANGALORE");
        assert_eq!(r.name, "Swiggy");
        assert_eq!(r.brand, "Swiggy");
        assert_eq!(r.category, "Food");
        assert_eq!(r.payment_method, "Card Payment [POS]");
    }

    #[test]
    fn vendor_format_name() {
        let r = builtin().classify("UPI/AMAZON PAY/amazon@apl/412345");
        assert_eq!(r.name, "Amazon");
        assert_eq!(r.category, "Shopping");
    }

    #[test]
    fn brand_is_independent_of_name() {
        let r = builtin().classify("UPI/HITESH BHAGAT/zomato split");
        assert_eq!(r.name, "Hitesh Bhagat");
        assert_eq!(r.brand, "Zomato");
    }

    // ── Options ───────────────────────────────────────────────────────────────

    #[test]
    fn category_source_changes_result() {
        let desc = "POS 4411 INDIAN OIL PETROL PUMP";
        assert_eq!(with_source(CategorySource::ResolvedName).classify(desc).category, OTHER);
        assert_eq!(with_source(CategorySource::Description).classify(desc).category, "Fuel");
    }

    #[test]
    fn payment_style_code() {
        let c = builtin().with_options(ClassifierOptions {
            payment_style: PaymentStyle::Code,
            ..ClassifierOptions::default()
        });
        assert_eq!(c.classify("IMPS-CR-RENT PAYMENT-BHUPESH JINGAR").payment_method, "IMPS");
        assert_eq!(c.resolve_payment_method("NEFT CR SALARY", PaymentStyle::Code), "NEFT");
        assert_eq!(c.resolve_payment_method("NEFT CR SALARY", PaymentStyle::Label), "National Electronic Funds Transfer [NEFT]");
    }

    #[test]
    fn option_parsing() {
        assert_eq!("name".parse::<CategorySource>().unwrap(), CategorySource::ResolvedName);
        assert_eq!("Description".parse::<CategorySource>().unwrap(), CategorySource::Description);
        assert!("both".parse::<CategorySource>().is_err());
        assert_eq!("code".parse::<PaymentStyle>().unwrap(), PaymentStyle::Code);
        assert!("acronym".parse::<PaymentStyle>().is_err());
    }

    // ── Properties ────────────────────────────────────────────────────────────

    #[test]
    fn first_match_priority() {
        let mut rules = RuleSet::empty();
        rules.categories = RuleTable::compile(
            RuleKind::Category,
            vec![RuleDefinition::new("L1", "cash"), RuleDefinition::new("L2", "atm cash")],
        )
        .unwrap();
        let c = Classifier::new(rules).with_options(ClassifierOptions {
            category_source: CategorySource::Description,
            ..ClassifierOptions::default()
        });
        assert_eq!(c.classify("ATM CASH WDL").category, "L1");
    }

    #[test]
    fn every_resolution_is_a_table_label_or_other() {
        let c = builtin();
        for desc in SAMPLES {
            let checks = [
                (c.resolve_name(desc), RuleKind::Name),
                (c.resolve_brand(desc), RuleKind::Brand),
                (c.resolve_category(desc), RuleKind::Category),
                (c.resolve_payment_method(desc, PaymentStyle::Label), RuleKind::PaymentMethod),
                (c.resolve_payment_method(desc, PaymentStyle::Code), RuleKind::PaymentCode),
            ];
            for (label, kind) in checks {
                assert!(
                    label == OTHER || c.rules().table(kind).labels().any(|l| l == label),
                    "{kind} produced unknown label '{label}' for '{desc}'"
                );
            }
        }
    }

    #[test]
    fn classification_is_deterministic() {
        let c = builtin();
        for desc in SAMPLES {
            assert_eq!(c.classify(desc), c.classify(desc));
        }
    }

    #[test]
    fn classify_all_keeps_order() {
        let c = builtin();
        let records: Vec<_> = SAMPLES.iter().map(|d| record(d)).collect();
        let out = c.classify_all(&records);
        assert_eq!(out.len(), SAMPLES.len());
        for (row, desc) in out.iter().zip(SAMPLES) {
            assert_eq!(row.record.description, *desc);
            assert_eq!(row.labels, c.classify(desc));
        }
    }

    #[test]
    fn parallel_matches_sequential() {
        let c = builtin();
        let records: Vec<_> = SAMPLES
            .iter()
            .cycle()
            .take(SAMPLES.len() * 5)
            .map(|d| record(d))
            .collect();
        let sequential = c.classify_all(&records);
        for workers in [0, 1, 3, 8, 100] {
            assert_eq!(c.classify_all_parallel(&records, workers), sequential, "workers={workers}");
        }
        assert!(c.classify_all_parallel(&[], 4).is_empty());
    }

    #[test]
    fn electricity_board_is_a_utility() {
        for source in [CategorySource::ResolvedName, CategorySource::Description] {
            let r = with_source(source).classify("BILLPAY DBHVN 8812345678");
            assert_eq!(r.brand, "DBHVN");
            assert_eq!(r.category, "Utilities", "{source}");
        }
    }

    #[test]
    fn padded_whitespace_classifies_like_single_spaced() {
        let c = builtin();
        let single = c.classify("IMPS-CR-RENT PAYMENT-BHUPESH JINGAR");
        assert_eq!(single.name, "Bhupesh Jingar");
        for padded in [
            "IMPS-CR-RENT PAYMENT-BHUPESH  JINGAR",
            "  IMPS-CR-RENT   PAYMENT-BHUPESH \t JINGAR  ",
        ] {
            assert_eq!(c.classify(padded), single, "{padded:?}");
            assert_eq!(c.classify_name(padded), "Bhupesh Jingar");
        }
        let desc = with_source(CategorySource::Description);
        assert_eq!(
            desc.classify("IMPS-CR-RENT PAYMENT-BHUPESH  JINGAR").category,
            "House Rent"
        );
    }
}
