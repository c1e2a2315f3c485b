// CSV import / export for expenses

use crate::error::Result;
use crate::expense::{ExpenseRecord, NewExpense};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One CSV row: `participant,amount,description[,timestamp]`.
/// Extra columns (e.g. `id` from an export) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvExpense {
    pub participant: String,
    pub amount: f64,
    pub description: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl CsvExpense {
    pub fn to_new_expense(&self) -> NewExpense {
        NewExpense::new(&self.participant, self.amount, &self.description)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub duplicates: usize,
}

#[derive(Serialize)]
struct ExportRow<'a> {
    id: &'a str,
    participant: &'a str,
    amount: f64,
    description: &'a str,
    timestamp: DateTime<Utc>,
}

pub fn load_csv(csv_path: &Path) -> Result<Vec<CsvExpense>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)?;

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: CsvExpense = result?;
        rows.push(row);
    }

    tracing::debug!(rows = rows.len(), path = %csv_path.display(), "loaded CSV");
    Ok(rows)
}

pub fn write_csv(csv_path: &Path, records: &[ExpenseRecord]) -> Result<usize> {
    let mut wtr = csv::Writer::from_path(csv_path)?;

    for record in records {
        wtr.serialize(ExportRow {
            id: &record.id,
            participant: &record.participant,
            amount: record.amount,
            description: &record.description,
            timestamp: record.timestamp,
        })?;
    }
    wtr.flush()?;

    Ok(records.len())
}
