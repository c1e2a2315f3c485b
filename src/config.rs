// ⚙️ Configuration
// Read once at startup, then passed into constructors. Nothing reads the
// environment after this.

use crate::error::{Result, SplitBillError};
use crate::search::SearchConfig;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "split_bill.db";
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_PARTICIPANTS: &[&str] = &["Kunal", "Himanshu", "Aakash"];

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub server_addr: SocketAddr,
    /// Allowed payers. Empty means any name is accepted.
    pub participants: Vec<String>,
    pub search: SearchConfig,
}

impl Config {
    /// Load `.env` (if present) and then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; missing keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path: PathBuf = lookup("SPLIT_BILL_DB")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
            .into();

        let addr = lookup("SPLIT_BILL_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string());
        let server_addr = addr
            .parse::<SocketAddr>()
            .map_err(|e| SplitBillError::Config(format!("SPLIT_BILL_ADDR '{}': {}", addr, e)))?;

        let participants = match lookup("SPLIT_BILL_PARTICIPANTS") {
            Some(raw) => parse_participants(&raw),
            None => DEFAULT_PARTICIPANTS.iter().map(|p| p.to_string()).collect(),
        };

        let search = SearchConfig {
            api_key: lookup("GOOGLE_API_KEY").filter(|v| !v.is_empty()),
            engine_id: lookup("GOOGLE_CSE_ID").filter(|v| !v.is_empty()),
        };

        Ok(Self {
            database_path,
            server_addr,
            participants,
            search,
        })
    }
}

/// Comma separated names; blanks and repeats are dropped
fn parse_participants(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.server_addr.port(), 3000);
        assert_eq!(config.participants, vec!["Kunal", "Himanshu", "Aakash"]);
        assert!(!config.search.is_configured());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("SPLIT_BILL_DB", "/tmp/bills.db"),
            ("SPLIT_BILL_ADDR", "127.0.0.1:8080"),
            ("SPLIT_BILL_PARTICIPANTS", " Ana, Bo ,,Ana"),
            ("GOOGLE_API_KEY", "k"),
            ("GOOGLE_CSE_ID", "cx"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/bills.db"));
        assert_eq!(config.server_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.participants, vec!["Ana", "Bo"]);
        assert!(config.search.is_configured());
    }

    #[test]
    fn test_empty_participant_list_means_open_roster() {
        let config = Config::from_lookup(lookup_from(&[("SPLIT_BILL_PARTICIPANTS", "")])).unwrap();
        assert!(config.participants.is_empty());
    }

    #[test]
    fn test_bad_address() {
        let result = Config::from_lookup(lookup_from(&[("SPLIT_BILL_ADDR", "not-an-addr")]));
        assert!(matches!(result, Err(SplitBillError::Config(_))));
    }
}
