// SQLite-backed expense store (WAL mode + audit trail)

use super::import::{CsvExpense, ImportSummary};
use super::ExpenseStore;
use crate::error::{Result, SplitBillError};
use crate::expense::{ExpenseRecord, ExpenseUpdate, NewExpense};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;

const ACTOR: &str = "split-bill";

/// Audit trail entry, one per change to an expense
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(event_type: &str, entity_id: &str, data: serde_json::Value) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: ACTOR.to_string(),
        }
    }
}

pub struct SqliteExpenseStore {
    conn: Connection,
    roster: Vec<String>,
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    // Fixed width so TEXT ordering matches time ordering
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ExpenseRecord> {
    let timestamp: String = row.get(4)?;
    Ok(ExpenseRecord {
        id: row.get(0)?,
        participant: row.get(1)?,
        amount: row.get(2)?,
        description: row.get(3)?,
        timestamp: parse_ts(4, &timestamp)?,
    })
}

const SELECT_EXPENSES: &str =
    "SELECT expense_id, participant, amount, description, timestamp FROM expenses";

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            expense_id TEXT UNIQUE NOT NULL,
            idempotency_hash TEXT NOT NULL,
            participant TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount >= 0),
            description TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_timestamp ON expenses(timestamp)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_participant ON expenses(participant)",
        [],
    )?;
    // Not unique: edits may legitimately make two rows identical
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_hash ON expenses(idempotency_hash)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_id)",
        [],
    )?;

    Ok(())
}

impl SqliteExpenseStore {
    pub fn open(path: &Path, roster: Vec<String>) -> Result<Self> {
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "opened expense database");
        Self::from_connection(conn, roster)
    }

    pub fn open_in_memory(roster: Vec<String>) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, roster)
    }

    pub fn from_connection(conn: Connection, roster: Vec<String>) -> Result<Self> {
        setup_database(&conn)?;
        Ok(Self { conn, roster })
    }

    pub fn count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))?;
        Ok(count)
    }

    fn contains_hash(&self, hash: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM expenses WHERE idempotency_hash = ?1 LIMIT 1",
                params![hash],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert(&self, record: ExpenseRecord) -> Result<ExpenseRecord> {
        self.conn.execute(
            "INSERT INTO expenses (expense_id, idempotency_hash, participant, amount, description, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.compute_idempotency_hash(),
                record.participant,
                record.amount,
                record.description,
                format_ts(&record.timestamp),
            ],
        )?;
        Ok(record)
    }

    /// Insert CSV rows, skipping ones already present (same participant,
    /// amount, description and timestamp). Rows without a timestamp get "now".
    pub fn import(&mut self, rows: Vec<CsvExpense>) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();

        // All-or-nothing on validation: a bad row aborts before anything is written
        for row in &rows {
            row.to_new_expense().validate(&self.roster)?;
        }

        for row in rows {
            let timestamp = row.timestamp.unwrap_or_else(Utc::now);
            let candidate = row.to_new_expense().into_record(timestamp);

            if self.contains_hash(&candidate.compute_idempotency_hash())? {
                summary.duplicates += 1;
                continue;
            }

            let record = self.insert(candidate)?;
            summary.inserted += 1;
            self.record_event("expense_imported", &record)?;
        }

        tracing::info!(
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            "CSV import finished"
        );
        Ok(summary)
    }

    fn record_event(&self, event_type: &str, record: &ExpenseRecord) -> Result<()> {
        let event = Event::new(event_type, &record.id, serde_json::to_value(record)?);
        self.insert_event(&event)
    }

    pub fn insert_event(&self, event: &Event) -> Result<()> {
        let data_json = serde_json::to_string(&event.data)?;
        self.conn.execute(
            "INSERT INTO events (event_id, timestamp, event_type, entity_id, data, actor)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.event_id,
                format_ts(&event.timestamp),
                event.event_type,
                event.entity_id,
                data_json,
                event.actor,
            ],
        )?;
        Ok(())
    }

    /// Audit events for one expense, newest first
    pub fn events_for(&self, expense_id: &str) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, timestamp, event_type, entity_id, data, actor
             FROM events
             WHERE entity_id = ?1
             ORDER BY timestamp DESC, id DESC",
        )?;

        let events = stmt
            .query_map(params![expense_id], |row| {
                let timestamp: String = row.get(1)?;
                let data_json: String = row.get(4)?;
                Ok(Event {
                    event_id: row.get(0)?,
                    timestamp: parse_ts(1, &timestamp)?,
                    event_type: row.get(2)?,
                    entity_id: row.get(3)?,
                    data: serde_json::from_str(&data_json).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
                    })?,
                    actor: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(events)
    }
}

impl ExpenseStore for SqliteExpenseStore {
    fn create(&mut self, input: NewExpense) -> Result<ExpenseRecord> {
        input.validate(&self.roster)?;
        let record = self.insert(input.into_record(Utc::now()))?;
        self.record_event("expense_added", &record)?;

        tracing::info!(id = %record.id, participant = %record.participant, amount = record.amount, "expense added");
        Ok(record)
    }

    fn list(&self) -> Result<Vec<ExpenseRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY timestamp ASC, id ASC", SELECT_EXPENSES))?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn get(&self, id: &str) -> Result<Option<ExpenseRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("{} WHERE expense_id = ?1", SELECT_EXPENSES),
                params![id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn update(&mut self, id: &str, update: ExpenseUpdate) -> Result<ExpenseRecord> {
        update.validate(&self.roster)?;
        let existing = self
            .get(id)?
            .ok_or_else(|| SplitBillError::NotFound(id.to_string()))?;

        let input = update.normalized();
        let record = ExpenseRecord {
            id: existing.id,
            participant: input.participant,
            amount: input.amount,
            description: input.description,
            timestamp: existing.timestamp,
        };

        self.conn.execute(
            "UPDATE expenses
             SET participant = ?1, amount = ?2, description = ?3, idempotency_hash = ?4
             WHERE expense_id = ?5",
            params![
                record.participant,
                record.amount,
                record.description,
                record.compute_idempotency_hash(),
                record.id,
            ],
        )?;
        self.record_event("expense_updated", &record)?;

        tracing::info!(id = %record.id, "expense updated");
        Ok(record)
    }

    fn delete(&mut self, id: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM expenses WHERE expense_id = ?1", params![id])?;

        if removed > 0 {
            self.insert_event(&Event::new("expense_deleted", id, serde_json::json!({})))?;
            tracing::info!(id, "expense deleted");
        }
        Ok(removed > 0)
    }

    fn delete_all(&mut self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM expenses", [])?;
        self.insert_event(&Event::new(
            "expenses_cleared",
            "*",
            serde_json::json!({ "removed": removed }),
        ))?;

        tracing::warn!(removed, "all expenses deleted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteExpenseStore {
        SqliteExpenseStore::open_in_memory(vec![
            "Kunal".to_string(),
            "Himanshu".to_string(),
            "Aakash".to_string(),
        ])
        .unwrap()
    }

    #[test]
    fn test_create_and_list() {
        let mut store = store();
        let first = store.create(NewExpense::new("Kunal", 300.0, "Rent")).unwrap();
        let second = store.create(NewExpense::new("Aakash", 50.0, "Groceries")).unwrap();

        let records = store.list().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, first.id);
        assert_eq!(records[1].id, second.id);
        assert_eq!(records[0].timestamp, first.timestamp);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_create_rejects_invalid_record() {
        let mut store = store();

        assert!(store.create(NewExpense::new("Kunal", 0.0, "Rent")).is_err());
        assert!(store.create(NewExpense::new("Mallory", 10.0, "Rent")).is_err());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_update_keeps_timestamp() {
        let mut store = store();
        let created = store.create(NewExpense::new("Kunal", 300.0, "Rent")).unwrap();

        let updated = store
            .update(&created.id, NewExpense::new("Himanshu", 120.0, "Electricity"))
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.timestamp, created.timestamp);

        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched.participant, "Himanshu");
        assert_eq!(fetched.amount, 120.0);
        assert_eq!(fetched.description, "Electricity");
    }

    #[test]
    fn test_update_unknown_id() {
        let mut store = store();
        let result = store.update("missing", NewExpense::new("Kunal", 1.0, "x"));
        assert!(matches!(result, Err(SplitBillError::NotFound(_))));
    }

    #[test]
    fn test_delete_and_delete_all() {
        let mut store = store();
        let a = store.create(NewExpense::new("Kunal", 10.0, "a")).unwrap();
        store.create(NewExpense::new("Kunal", 20.0, "b")).unwrap();
        store.create(NewExpense::new("Aakash", 30.0, "c")).unwrap();

        assert!(store.delete(&a.id).unwrap());
        assert!(!store.delete(&a.id).unwrap());
        assert!(store.get(&a.id).unwrap().is_none());

        assert_eq!(store.delete_all().unwrap(), 2);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_event_log() {
        let mut store = store();
        let record = store.create(NewExpense::new("Kunal", 10.0, "Tea")).unwrap();
        store
            .update(&record.id, NewExpense::new("Kunal", 12.0, "Tea"))
            .unwrap();
        store.delete(&record.id).unwrap();

        let events = store.events_for(&record.id).unwrap();
        let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();

        assert_eq!(types, vec!["expense_deleted", "expense_updated", "expense_added"]);
        assert_eq!(events[0].actor, "split-bill");
    }

    #[test]
    fn test_import_twice_is_idempotent() {
        let mut store = store();
        let ts = Utc::now();
        let rows = vec![
            CsvExpense {
                participant: "Kunal".to_string(),
                amount: 300.0,
                description: "Rent".to_string(),
                timestamp: Some(ts),
            },
            CsvExpense {
                participant: "Aakash".to_string(),
                amount: 45.0,
                description: "Groceries".to_string(),
                timestamp: Some(ts),
            },
        ];

        let first = store.import(rows.clone()).unwrap();
        let second = store.import(rows).unwrap();

        assert_eq!(first.inserted, 2);
        assert_eq!(first.duplicates, 0);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 2);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_update_to_match_sibling_row() {
        let mut store = store();
        let ts = Utc::now();
        let row = |participant: &str| CsvExpense {
            participant: participant.to_string(),
            amount: 20.0,
            description: "Tea".to_string(),
            timestamp: Some(ts),
        };

        let summary = store.import(vec![row("Kunal"), row("Aakash")]).unwrap();
        assert_eq!(summary, ImportSummary { inserted: 2, duplicates: 0 });

        let records = store.list().unwrap();
        let aakash = records.iter().find(|r| r.participant == "Aakash").unwrap();

        let updated = store
            .update(&aakash.id, NewExpense::new("Kunal", 20.0, "Tea"))
            .unwrap();
        assert_eq!(updated.participant, "Kunal");
        assert_eq!(store.count().unwrap(), 2);

        // Both rows now match the CSV row, so re-importing it adds nothing
        let again = store.import(vec![row("Kunal")]).unwrap();
        assert_eq!(again, ImportSummary { inserted: 0, duplicates: 1 });
    }

    #[test]
    fn test_import_keeps_sub_paise_amounts_apart() {
        let mut store = store();
        let ts = Utc::now();
        let rows: Vec<CsvExpense> = [10.001, 10.004]
            .into_iter()
            .map(|amount| CsvExpense {
                participant: "Kunal".to_string(),
                amount,
                description: "Tea".to_string(),
                timestamp: Some(ts),
            })
            .collect();

        let summary = store.import(rows).unwrap();
        assert_eq!(summary, ImportSummary { inserted: 2, duplicates: 0 });
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expenses.db");

        {
            let mut store = SqliteExpenseStore::open(&path, Vec::new()).unwrap();
            store.create(NewExpense::new("Anyone", 5.0, "Coffee")).unwrap();
        }

        let store = SqliteExpenseStore::open(&path, Vec::new()).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
