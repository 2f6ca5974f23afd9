use std::collections::BTreeMap;

use passbook_core::{ClassifiedTransaction, Direction, Money};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelTotals {
    pub count: usize,
    pub debit: Money,
    pub credit: Money,
}

impl LabelTotals {
    fn add(&mut self, row: &ClassifiedTransaction) {
        self.count += 1;
        match row.record.direction {
            Some(Direction::Credit) => self.credit = self.credit + row.record.amount,
            Some(Direction::Debit) => self.debit = self.debit + row.record.amount,
            None => {}
        }
    }

    /// Credits minus debits.
    pub fn net(&self) -> Money {
        self.credit - self.debit
    }
}

/// Aggregate counts over a classified dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    /// Rows with neither a counterparty nor a category.
    pub unclassified: usize,
    pub credit_total: Money,
    pub debit_total: Money,
    pub by_category: BTreeMap<String, LabelTotals>,
    pub by_name: BTreeMap<String, LabelTotals>,
    pub by_payment_method: BTreeMap<String, LabelTotals>,
}

impl Summary {
    pub fn from_classified(rows: &[ClassifiedTransaction]) -> Self {
        let mut summary = Summary::default();
        for row in rows {
            summary.total += 1;
            if row.labels.is_unclassified() {
                summary.unclassified += 1;
            }
            match row.record.direction {
                Some(Direction::Credit) => summary.credit_total = summary.credit_total + row.record.amount,
                Some(Direction::Debit) => summary.debit_total = summary.debit_total + row.record.amount,
                None => {}
            }
            summary.by_category.entry(row.labels.category.clone()).or_default().add(row);
            summary.by_name.entry(row.labels.name.clone()).or_default().add(row);
            summary
                .by_payment_method
                .entry(row.labels.payment_method.clone())
                .or_default()
                .add(row);
        }
        summary
    }

    /// Share of rows left unclassified, 0.0 for an empty dataset.
    pub fn unclassified_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.unclassified as f64 / self.total as f64
        }
    }

    /// Labels ordered by debit volume, largest first.
    pub fn top_spending<'a>(map: &'a BTreeMap<String, LabelTotals>, limit: usize) -> Vec<(&'a str, LabelTotals)> {
        let mut entries: Vec<_> = map.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_by(|a, b| b.1.debit.cmp(&a.1.debit).then_with(|| a.0.cmp(b.0)));
        entries.truncate(limit);
        entries
    }
}
