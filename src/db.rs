// ==========================================
// Packing Station - SQLite connection bootstrap
// ==========================================
// - every connection gets the same PRAGMAs (foreign keys + busy timeout)
// - ensure_schema is idempotent and records schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default busy_timeout (ms)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// schema_version written by `ensure_schema`
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS packing_order (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference TEXT NOT NULL,
    operator_id INTEGER,
    created_date TEXT NOT NULL,
    state TEXT NOT NULL DEFAULT 'DRAFT'
        CHECK (state IN ('DRAFT', 'DONE', 'DEFECTIVE')),
    shipping_label BLOB
);
CREATE INDEX IF NOT EXISTS idx_packing_order_reference
    ON packing_order(reference);
CREATE INDEX IF NOT EXISTS idx_packing_order_operator_date
    ON packing_order(operator_id, created_date);

CREATE TABLE IF NOT EXISTS packing_detail (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id INTEGER NOT NULL REFERENCES packing_order(id) ON DELETE CASCADE,
    external_code TEXT NOT NULL,
    name TEXT NOT NULL,
    required_quantity INTEGER NOT NULL CHECK (required_quantity >= 1),
    packed_quantity INTEGER NOT NULL DEFAULT 0 CHECK (packed_quantity >= 0),
    defective_quantity INTEGER NOT NULL DEFAULT 0 CHECK (defective_quantity >= 0),
    size_info TEXT
);
CREATE INDEX IF NOT EXISTS idx_packing_detail_order_code
    ON packing_detail(order_id, external_code);

CREATE TABLE IF NOT EXISTS packing_analytics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    operator_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    total_orders INTEGER NOT NULL DEFAULT 0,
    total_packed_units INTEGER NOT NULL DEFAULT 0,
    total_defective_units INTEGER NOT NULL DEFAULT 0,
    total_defective_orders INTEGER NOT NULL DEFAULT 0,
    UNIQUE (operator_id, date)
);

CREATE TABLE IF NOT EXISTS defect_record (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    detail_id INTEGER NOT NULL REFERENCES packing_detail(id) ON DELETE CASCADE,
    order_id INTEGER NOT NULL REFERENCES packing_order(id) ON DELETE CASCADE,
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    replaced INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    replaced_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_defect_record_detail
    ON defect_record(detail_id, replaced);
"#;

/// Apply the shared PRAGMAs to a connection.
///
/// foreign_keys and busy_timeout are per-connection settings.
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Open a SQLite connection with the shared configuration applied.
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// Open, configure and migrate; returns the handle every repository shares.
pub fn open_shared_connection(db_path: &str) -> rusqlite::Result<Arc<Mutex<Connection>>> {
    let conn = open_sqlite_connection(db_path)?;
    ensure_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Create every table and index if missing.
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    tracing::debug!(version = CURRENT_SCHEMA_VERSION, "schema ensured");
    Ok(())
}

/// Read schema_version (None when the table does not exist yet).
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
