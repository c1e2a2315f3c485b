// 🗄️ Expense persistence
// The calculator never talks to storage directly; everything goes through
// `ExpenseStore` so settlement stays testable without a database.

pub mod import;
pub mod memory;
pub mod sqlite;

pub use import::{load_csv, write_csv, CsvExpense, ImportSummary};
pub use memory::MemoryExpenseStore;
pub use sqlite::{Event, SqliteExpenseStore};

use crate::error::Result;
use crate::expense::{ExpenseRecord, ExpenseUpdate, NewExpense};

/// CRUD over expense records, keyed by an opaque id.
pub trait ExpenseStore {
    /// Validate and persist a new expense; the store assigns id and timestamp
    fn create(&mut self, input: NewExpense) -> Result<ExpenseRecord>;

    /// All records, oldest first
    fn list(&self) -> Result<Vec<ExpenseRecord>>;

    fn get(&self, id: &str) -> Result<Option<ExpenseRecord>>;

    /// Replace participant, amount and description. Unknown ids fail with `NotFound`.
    fn update(&mut self, id: &str, update: ExpenseUpdate) -> Result<ExpenseRecord>;

    /// Returns false when nothing matched `id`
    fn delete(&mut self, id: &str) -> Result<bool>;

    /// Returns how many records were removed
    fn delete_all(&mut self) -> Result<usize>;
}
