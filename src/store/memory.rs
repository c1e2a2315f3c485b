// In-memory expense store for tests and throwaway sessions

use super::ExpenseStore;
use crate::error::{Result, SplitBillError};
use crate::expense::{ExpenseRecord, ExpenseUpdate, NewExpense};
use chrono::Utc;

#[derive(Debug, Default)]
pub struct MemoryExpenseStore {
    records: Vec<ExpenseRecord>,
    roster: Vec<String>,
}

impl MemoryExpenseStore {
    pub fn new(roster: Vec<String>) -> Self {
        Self {
            records: Vec::new(),
            roster,
        }
    }

    /// Seed with existing records (kept in the given order)
    pub fn with_records(roster: Vec<String>, records: Vec<ExpenseRecord>) -> Self {
        Self { records, roster }
    }
}

impl ExpenseStore for MemoryExpenseStore {
    fn create(&mut self, input: NewExpense) -> Result<ExpenseRecord> {
        input.validate(&self.roster)?;
        let record = input.into_record(Utc::now());
        self.records.push(record.clone());
        Ok(record)
    }

    fn list(&self) -> Result<Vec<ExpenseRecord>> {
        Ok(self.records.clone())
    }

    fn get(&self, id: &str) -> Result<Option<ExpenseRecord>> {
        Ok(self.records.iter().find(|r| r.id == id).cloned())
    }

    fn update(&mut self, id: &str, update: ExpenseUpdate) -> Result<ExpenseRecord> {
        update.validate(&self.roster)?;
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| SplitBillError::NotFound(id.to_string()))?;

        let input = update.normalized();
        record.participant = input.participant;
        record.amount = input.amount;
        record.description = input.description;
        Ok(record.clone())
    }

    fn delete(&mut self, id: &str) -> Result<bool> {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        Ok(self.records.len() < before)
    }

    fn delete_all(&mut self) -> Result<usize> {
        let removed = self.records.len();
        self.records.clear();
        Ok(removed)
    }
}
