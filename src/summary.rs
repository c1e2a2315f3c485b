// 📊 Expense summaries - grouped totals for charts and reports

use crate::expense::ExpenseRecord;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub label: String,
    pub amount: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseSummary {
    pub total: f64,
    pub expense_count: usize,
    pub by_participant: Vec<GroupTotal>,
    pub by_description: Vec<GroupTotal>,
}

impl ExpenseSummary {
    pub fn from_records(records: &[ExpenseRecord]) -> Self {
        Self {
            total: grand_total(records),
            expense_count: records.len(),
            by_participant: totals_by_participant(records),
            by_description: totals_by_description(records),
        }
    }
}

fn group_by<F>(records: &[ExpenseRecord], key: F) -> Vec<GroupTotal>
where
    F: Fn(&ExpenseRecord) -> &str,
{
    let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(key(record)).or_insert((0.0, 0));
        entry.0 += record.amount;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(label, (amount, count))| GroupTotal {
            label: label.to_string(),
            amount,
            count,
        })
        .collect()
}

/// Total spent per participant, ordered by name
pub fn totals_by_participant(records: &[ExpenseRecord]) -> Vec<GroupTotal> {
    group_by(records, |r| r.participant.as_str())
}

/// Total spent per description, ordered by description
pub fn totals_by_description(records: &[ExpenseRecord]) -> Vec<GroupTotal> {
    group_by(records, |r| r.description.as_str())
}

pub fn grand_total(records: &[ExpenseRecord]) -> f64 {
    records.iter().map(|r| r.amount).sum()
}
