use std::fmt;
use std::path::{Path, PathBuf};

use passbook_core::OTHER;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalize::is_blank;

const BUILTIN_RULES: &str = include_str!("../default_rules.toml");

/// Which assignment a table feeds. Each kind has its own section in a rule file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Vendor,
    Name,
    Brand,
    Category,
    PaymentMethod,
    PaymentCode,
}

impl RuleKind {
    pub const ALL: [RuleKind; 6] = [
        RuleKind::Vendor,
        RuleKind::Name,
        RuleKind::Brand,
        RuleKind::Category,
        RuleKind::PaymentMethod,
        RuleKind::PaymentCode,
    ];
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Vendor => write!(f, "vendor"),
            RuleKind::Name => write!(f, "name"),
            RuleKind::Brand => write!(f, "brand"),
            RuleKind::Category => write!(f, "category"),
            RuleKind::PaymentMethod => write!(f, "payment_method"),
            RuleKind::PaymentCode => write!(f, "payment_code"),
        }
    }
}

impl std::str::FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "vendor" => Ok(RuleKind::Vendor),
            "name" => Ok(RuleKind::Name),
            "brand" => Ok(RuleKind::Brand),
            "category" => Ok(RuleKind::Category),
            "payment_method" => Ok(RuleKind::PaymentMethod),
            "payment_code" => Ok(RuleKind::PaymentCode),
            other => Err(format!("Unknown rule kind: '{other}'")),
        }
    }
}

/// A rule as authored in the rule file, before compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    pub label: String,
    pub pattern: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl RuleDefinition {
    pub fn new(label: &str, pattern: &str) -> Self {
        RuleDefinition {
            label: label.to_string(),
            pattern: pattern.to_string(),
            case_sensitive: false,
        }
    }
}

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse rule file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid pattern for {kind} rule '{label}': {source}")]
    InvalidPattern {
        kind: RuleKind,
        label: String,
        #[source]
        source: regex::Error,
    },
    #[error("{kind} rule #{index} has an empty label")]
    EmptyLabel { kind: RuleKind, index: usize },
}

/// A rule paired with its precompiled regex.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub label: String,
    pub pattern: String,
    pub case_sensitive: bool,
    regex: Regex,
}

impl CompiledRule {
    fn compile(kind: RuleKind, index: usize, def: RuleDefinition) -> Result<Self, RuleError> {
        if is_blank(&def.label) {
            return Err(RuleError::EmptyLabel { kind, index });
        }
        let regex = RegexBuilder::new(&def.pattern)
            .case_insensitive(!def.case_sensitive)
            .build()
            .map_err(|source| RuleError::InvalidPattern {
                kind,
                label: def.label.clone(),
                source,
            })?;
        Ok(CompiledRule {
            label: def.label,
            pattern: def.pattern,
            case_sensitive: def.case_sensitive,
            regex,
        })
    }

    /// Unanchored search: the pattern may match anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Ordered rules for one kind. Earlier rules shadow later ones.
#[derive(Debug, Clone)]
pub struct RuleTable {
    kind: RuleKind,
    rules: Vec<CompiledRule>,
}

impl RuleTable {
    pub fn compile(
        kind: RuleKind,
        defs: impl IntoIterator<Item = RuleDefinition>,
    ) -> Result<Self, RuleError> {
        let rules = defs
            .into_iter()
            .enumerate()
            .map(|(index, def)| CompiledRule::compile(kind, index, def))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(%kind, rules = rules.len(), "compiled rule table");
        Ok(RuleTable { kind, rules })
    }

    pub fn empty(kind: RuleKind) -> Self {
        RuleTable { kind, rules: Vec::new() }
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn first_match(&self, text: &str) -> Option<&CompiledRule> {
        self.rules.iter().find(|rule| rule.is_match(text))
    }

    /// Label of the first matching rule, or `"Other"`. Blank text never matches.
    pub fn resolve(&self, text: &str) -> &str {
        if is_blank(text) {
            return OTHER;
        }
        self.first_match(text)
            .map(|rule| rule.label.as_str())
            .unwrap_or(OTHER)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.label.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompiledRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// On-disk layout: one array of tables per kind, in priority order.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFile {
    #[serde(default)]
    vendor: Vec<RuleDefinition>,
    #[serde(default)]
    name: Vec<RuleDefinition>,
    #[serde(default)]
    brand: Vec<RuleDefinition>,
    #[serde(default)]
    category: Vec<RuleDefinition>,
    #[serde(default)]
    payment_method: Vec<RuleDefinition>,
    #[serde(default)]
    payment_code: Vec<RuleDefinition>,
}

/// Every table the classifier needs, compiled once and shared read-only.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub vendors: RuleTable,
    pub names: RuleTable,
    pub brands: RuleTable,
    pub categories: RuleTable,
    pub payment_methods: RuleTable,
    pub payment_codes: RuleTable,
}

impl RuleSet {
    pub fn from_toml(toml_content: &str) -> Result<Self, RuleError> {
        let file: RuleFile = toml::from_str(toml_content)?;
        Ok(RuleSet {
            vendors: RuleTable::compile(RuleKind::Vendor, file.vendor)?,
            names: RuleTable::compile(RuleKind::Name, file.name)?,
            brands: RuleTable::compile(RuleKind::Brand, file.brand)?,
            categories: RuleTable::compile(RuleKind::Category, file.category)?,
            payment_methods: RuleTable::compile(RuleKind::PaymentMethod, file.payment_method)?,
            payment_codes: RuleTable::compile(RuleKind::PaymentCode, file.payment_code)?,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, RuleError> {
        let content = std::fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = Self::from_toml(&content)?;
        tracing::info!(path = %path.display(), "loaded rule file");
        Ok(rules)
    }

    /// The rule tables bundled with the crate.
    pub fn builtin() -> Result<Self, RuleError> {
        Self::from_toml(BUILTIN_RULES)
    }

    pub fn empty() -> Self {
        RuleSet {
            vendors: RuleTable::empty(RuleKind::Vendor),
            names: RuleTable::empty(RuleKind::Name),
            brands: RuleTable::empty(RuleKind::Brand),
            categories: RuleTable::empty(RuleKind::Category),
            payment_methods: RuleTable::empty(RuleKind::PaymentMethod),
            payment_codes: RuleTable::empty(RuleKind::PaymentCode),
        }
    }

    pub fn table(&self, kind: RuleKind) -> &RuleTable {
        match kind {
            RuleKind::Vendor => &self.vendors,
            RuleKind::Name => &self.names,
            RuleKind::Brand => &self.brands,
            RuleKind::Category => &self.categories,
            RuleKind::PaymentMethod => &self.payment_methods,
            RuleKind::PaymentCode => &self.payment_codes,
        }
    }
}
