pub mod money;
pub mod period;
pub mod transaction;

pub use money::Money;
pub use period::{DateRange, FiscalYear};
pub use transaction::{
    ClassificationResult, ClassifiedTransaction, Direction, ParseDirectionError,
    TransactionRecord, OTHER,
};
