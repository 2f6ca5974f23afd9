pub mod classifier;
pub mod extract;
pub mod normalize;
pub mod rules;
pub mod summary;

pub use classifier::{CategorySource, Classifier, ClassifierOptions, PaymentStyle};
pub use extract::EntityExtractor;
pub use rules::{CompiledRule, RuleDefinition, RuleError, RuleKind, RuleSet, RuleTable};
pub use summary::{LabelTotals, Summary};
