use passbook_core::{ClassifiedTransaction, DateRange, Direction, FiscalYear};

use crate::FilterArgs;

/// Row predicate built from the `classify`/`summary` filter flags.
/// All conditions must hold; an empty filter keeps everything.
#[derive(Debug, Clone)]
pub struct RowFilter {
    range: DateRange,
    direction: Option<Direction>,
    categories: Vec<String>,
    unclassified_only: bool,
}

impl RowFilter {
    pub fn from_args(args: &FilterArgs) -> Self {
        let range = match args.fy {
            Some(year) => DateRange::from(FiscalYear::new(year)),
            None => DateRange::between(args.from, args.to),
        };
        RowFilter {
            range,
            direction: args.direction,
            categories: args.categories.iter().map(|c| c.trim().to_lowercase()).collect(),
            unclassified_only: args.unclassified,
        }
    }

    pub fn matches(&self, row: &ClassifiedTransaction) -> bool {
        if !self.range.contains(row.record.date) {
            return false;
        }
        if let Some(direction) = self.direction {
            if row.record.direction != Some(direction) {
                return false;
            }
        }
        if !self.categories.is_empty()
            && !self.categories.contains(&row.labels.category.to_lowercase())
        {
            return false;
        }
        !self.unclassified_only || row.labels.is_unclassified()
    }

    pub fn apply(&self, rows: Vec<ClassifiedTransaction>) -> Vec<ClassifiedTransaction> {
        rows.into_iter().filter(|row| self.matches(row)).collect()
    }
}
