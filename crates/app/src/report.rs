use comfy_table::{Cell, CellAlignment, Table};
use passbook_classify::{LabelTotals, RuleTable, Summary};
use passbook_core::ClassifiedTransaction;

fn amount_cell(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

pub fn format_transactions(rows: &[ClassifiedTransaction]) -> String {
    let mut table = Table::new();
    table.set_header(vec![
        "Date",
        "Description",
        "Amount",
        "Dr/Cr",
        "Name",
        "Brand",
        "Category",
        "Payment Method",
    ]);
    for row in rows {
        let record = &row.record;
        table.add_row(vec![
            Cell::new(record.date.format("%d-%m-%Y")),
            Cell::new(&record.description),
            amount_cell(record.amount),
            Cell::new(record.direction.map(|d| d.to_string()).unwrap_or_default()),
            Cell::new(&row.labels.name),
            Cell::new(&row.labels.brand),
            Cell::new(&row.labels.category),
            Cell::new(&row.labels.payment_method),
        ]);
    }
    table.to_string()
}

fn totals_table(header: &str, entries: &[(&str, LabelTotals)]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header, "Count", "Debit", "Credit", "Net"]);
    for (label, totals) in entries {
        table.add_row(vec![
            Cell::new(label),
            amount_cell(totals.count),
            amount_cell(totals.debit),
            amount_cell(totals.credit),
            amount_cell(totals.net()),
        ]);
    }
    table
}

pub fn format_summary(summary: &Summary, top: usize) -> String {
    let mut out = format!(
        "Transactions: {}  Unclassified: {} ({:.1}%)\nCredits: {}  Debits: {}\n",
        summary.total,
        summary.unclassified,
        summary.unclassified_ratio() * 100.0,
        summary.credit_total,
        summary.debit_total,
    );

    let categories: Vec<_> = summary.by_category.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    out.push_str(&format!("\nBy Category\n{}\n", totals_table("Category", &categories)));

    let names = Summary::top_spending(&summary.by_name, top);
    out.push_str(&format!("\nTop Counterparties\n{}\n", totals_table("Name", &names)));

    let methods: Vec<_> = summary
        .by_payment_method
        .iter()
        .map(|(k, v)| (k.as_str(), *v))
        .collect();
    out.push_str(&format!("\nBy Payment Method\n{}\n", totals_table("Payment Method", &methods)));
    out
}

pub fn format_rule_table(table: &RuleTable) -> String {
    let mut out = Table::new();
    out.set_header(vec!["#", "Label", "Pattern", "Case"]);
    for (i, rule) in table.iter().enumerate() {
        out.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&rule.label),
            Cell::new(&rule.pattern),
            Cell::new(if rule.case_sensitive { "exact" } else { "any" }),
        ]);
    }
    format!("{} rules ({})\n{out}", table.kind(), table.len())
}
