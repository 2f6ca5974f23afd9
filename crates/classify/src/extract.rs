use std::sync::OnceLock;

use passbook_core::OTHER;
use regex::Regex;

use crate::normalize::{is_blank, title_case};
use crate::rules::RuleTable;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_letters_and_spaces, r"^[A-Za-z ]*[A-Za-z][A-Za-z ]*$");
re!(re_capitalized_run, r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)+\b");

// ── Public extraction API ────────────────────────────────────────────────────

/// Guesses a human-readable counterparty from the shape of a description,
/// without consulting any list of known names.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    vendors: RuleTable,
}

impl EntityExtractor {
    /// `vendors` holds the irregular high-volume formats checked before any
    /// structural strategy.
    pub fn new(vendors: RuleTable) -> Self {
        Self { vendors }
    }

    /// Returns the first strategy's answer, or `"Other"`. Never fails.
    pub fn extract(&self, description: &str) -> String {
        if is_blank(description) {
            return OTHER.to_string();
        }
        // Ordered alternation: the first strategy with an answer ends the search.
        self.extract_vendor(description)
            .or_else(|| Self::extract_delimited(description))
            .or_else(|| Self::extract_capitalized_run(description))
            .unwrap_or_else(|| OTHER.to_string())
    }

    // ── Vendor ────────────────────────────────────────────────────────────────

    fn extract_vendor(&self, text: &str) -> Option<String> {
        self.vendors.first_match(text).map(|rule| rule.label.clone())
    }

    // ── Delimited token ───────────────────────────────────────────────────────

    /// `UPI/JOHN DOE/1234567890/Payment` -> `John Doe`. Only segments with a
    /// `/` on both sides count.
    fn extract_delimited(text: &str) -> Option<String> {
        let segments: Vec<&str> = text.split('/').collect();
        if segments.len() < 3 {
            return None;
        }
        segments[1..segments.len() - 1]
            .iter()
            .find(|segment| re_letters_and_spaces().is_match(segment))
            .map(|segment| title_case(segment))
    }

    // ── Capitalized run ───────────────────────────────────────────────────────

    fn extract_capitalized_run(text: &str) -> Option<String> {
        re_capitalized_run()
            .find(text)
            .map(|m| title_case(m.as_str()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
