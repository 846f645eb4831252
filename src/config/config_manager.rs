// ==========================================
// Packing Station - configuration manager
// ==========================================
// Storage: config_kv table (key -> value), read with defaults.
// Services take a PackingConfig snapshot at construction so they
// never touch config_kv while holding a write transaction.
// ==========================================

use crate::db::{configure_sqlite_connection, open_shared_connection};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// Config keys
// ==========================================
pub mod config_keys {
    // analytics
    pub const RECOMPUTE_PREVIOUS_OPERATOR: &str = "analytics.recompute_previous_operator";

    // shipping label
    pub const LABEL_TITLE: &str = "label.title";
    pub const LABEL_BARCODE_PLACEHOLDER: &str = "label.barcode_placeholder";

    // bulk import
    pub const IMPORT_CSV_DELIMITER: &str = "import.csv_delimiter";
}

pub const DEFAULT_LABEL_TITLE: &str = "SHIPPING LABEL";
pub const DEFAULT_BARCODE_PLACEHOLDER: &str = "[0000000000]";

/// Settings snapshot handed to the services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingConfig {
    /// On operator reassignment, also recompute the previous operator's scope.
    pub recompute_previous_operator: bool,
    pub label_title: String,
    pub label_barcode_placeholder: String,
    pub csv_delimiter: u8,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            recompute_previous_operator: true,
            label_title: DEFAULT_LABEL_TITLE.to_string(),
            label_barcode_placeholder: DEFAULT_BARCODE_PLACEHOLDER.to_string(),
            csv_delimiter: b',',
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// # Arguments
    /// - db_path: database file path
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_shared_connection(db_path)?;
        Ok(Self { conn })
    }

    /// Build on an existing connection (PRAGMAs are re-applied, idempotent).
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
            configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// Insert or overwrite one key.
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        tracing::info!(key, value, "config updated");
        Ok(())
    }

    /// All keys as a JSON object string.
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;

        let mut stmt = conn.prepare("SELECT key, value FROM config_kv ORDER BY key")?;
        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== typed getters =====

    pub fn recompute_previous_operator(&self) -> Result<bool, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::RECOMPUTE_PREVIOUS_OPERATOR, "true")?;
        Ok(parse_bool(&value).unwrap_or_else(|| {
            tracing::warn!(
                config_key = config_keys::RECOMPUTE_PREVIOUS_OPERATOR,
                raw_value = %value,
                "invalid boolean, falling back to true"
            );
            true
        }))
    }

    pub fn label_title(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::LABEL_TITLE, DEFAULT_LABEL_TITLE)
    }

    pub fn label_barcode_placeholder(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(
            config_keys::LABEL_BARCODE_PLACEHOLDER,
            DEFAULT_BARCODE_PLACEHOLDER,
        )
    }

    /// Single-byte CSV delimiter; `\t` is accepted for tab.
    pub fn csv_delimiter(&self) -> Result<u8, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::IMPORT_CSV_DELIMITER, ",")?;
        let delimiter = match value.as_str() {
            "\\t" | "\t" => Some(b'\t'),
            v if v.len() == 1 && v.is_ascii() => v.bytes().next(),
            _ => None,
        };

        Ok(delimiter.unwrap_or_else(|| {
            tracing::warn!(
                config_key = config_keys::IMPORT_CSV_DELIMITER,
                raw_value = %value,
                "invalid delimiter, falling back to ','"
            );
            b','
        }))
    }

    /// Read every setting into one snapshot.
    pub fn load_packing_config(&self) -> Result<PackingConfig, Box<dyn Error>> {
        Ok(PackingConfig {
            recompute_previous_operator: self.recompute_previous_operator()?,
            label_title: self.label_title()?,
            label_barcode_placeholder: self.label_barcode_placeholder()?,
            csv_delimiter: self.csv_delimiter()?,
        })
    }
}
