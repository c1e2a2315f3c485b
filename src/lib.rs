// Split Bill - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod error;
pub mod expense;
pub mod logging;
pub mod search;
pub mod settlement;
pub mod store;
pub mod summary;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, SplitBillError};
pub use expense::{ExpenseRecord, ExpenseUpdate, NewExpense};
pub use search::{
    find_pdfs, PdfLink, PdfSearchProvider, SearchConfig, SearchQuery, SearchResults,
    SubjectCatalog,
};
pub use settlement::{
    compute_balances, compute_transfers, settle, Balances, ParticipantStatus, SettlementReport,
    Transfer,
};
pub use store::{
    load_csv, write_csv, ExpenseStore, ImportSummary, MemoryExpenseStore, SqliteExpenseStore,
};
pub use summary::{totals_by_description, totals_by_participant, ExpenseSummary, GroupTotal};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
