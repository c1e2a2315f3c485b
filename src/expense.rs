// 🧾 Expense records
// What the store persists and the calculator consumes.

use crate::error::{Result, SplitBillError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A persisted expense. Immutable once handed to the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// Opaque identifier assigned by the store
    pub id: String,

    /// Who paid
    pub participant: String,

    /// Non-negative amount paid
    pub amount: f64,

    /// Free-text label (grouping/reporting only)
    pub description: String,

    /// Creation time, informational only
    pub timestamp: DateTime<Utc>,
}

impl ExpenseRecord {
    /// Build a record outside of any store (tests, CSV round trips, fixtures)
    pub fn new(participant: &str, amount: f64, description: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            participant: participant.to_string(),
            amount,
            description: description.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Hash used to skip duplicate rows on CSV import.
    /// Identity is `id`; this is only for deduplication, so it is not unique.
    pub fn compute_idempotency_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}",
            self.participant,
            self.amount,
            self.description,
            self.timestamp.to_rfc3339()
        ));
        format!("{:x}", hasher.finalize())
    }
}

/// User-supplied fields for creating or replacing an expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub participant: String,
    pub amount: f64,
    pub description: String,
}

/// Updates replace all three user fields; the timestamp is kept.
pub type ExpenseUpdate = NewExpense;

impl NewExpense {
    pub fn new(participant: &str, amount: f64, description: &str) -> Self {
        Self {
            participant: participant.to_string(),
            amount,
            description: description.to_string(),
        }
    }

    /// Trim surrounding whitespace from the text fields
    pub fn normalized(&self) -> Self {
        Self {
            participant: self.participant.trim().to_string(),
            amount: self.amount,
            description: self.description.trim().to_string(),
        }
    }

    /// Reject records before they are persisted.
    ///
    /// An empty `roster` accepts any participant name.
    pub fn validate(&self, roster: &[String]) -> Result<()> {
        let participant = self.participant.trim();
        if participant.is_empty() {
            return Err(SplitBillError::invalid("participant", "Required field is empty"));
        }
        if !roster.is_empty() && !roster.iter().any(|p| p == participant) {
            return Err(SplitBillError::invalid(
                "participant",
                format!("'{}' is not one of: {}", participant, roster.join(", ")),
            ));
        }

        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(SplitBillError::invalid(
                "amount",
                format!("Must be greater than zero, got {}", self.amount),
            ));
        }

        if self.description.trim().is_empty() {
            return Err(SplitBillError::invalid("description", "Required field is empty"));
        }

        Ok(())
    }

    /// Materialize into a record with a fresh id
    pub fn into_record(self, timestamp: DateTime<Utc>) -> ExpenseRecord {
        let input = self.normalized();
        ExpenseRecord {
            id: uuid::Uuid::new_v4().to_string(),
            participant: input.participant,
            amount: input.amount,
            description: input.description,
            timestamp,
        }
    }
}
