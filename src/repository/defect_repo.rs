use crate::db::open_shared_connection;
use crate::domain::defect::DefectRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// DefectRecordRepository - defect ledger
// ==========================================
// Append-only except for the replaced flag.
pub struct DefectRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

fn map_defect_row(row: &Row<'_>) -> SqliteResult<DefectRecord> {
    Ok(DefectRecord {
        id: row.get(0)?,
        detail_id: row.get(1)?,
        order_id: row.get(2)?,
        quantity: row.get(3)?,
        replaced: row.get(4)?,
        created_at: row.get(5)?,
        replaced_at: row.get(6)?,
    })
}

impl DefectRecordRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_shared_connection(db_path)?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Ledger entries of one detail, oldest first.
    pub fn find_by_detail(&self, detail_id: i64) -> RepositoryResult<Vec<DefectRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, detail_id, order_id, quantity, replaced, created_at, replaced_at
            FROM defect_record
            WHERE detail_id = ?1
            ORDER BY id
            "#,
        )?;
        let records = stmt
            .query_map(params![detail_id], map_defect_row)?
            .collect::<SqliteResult<Vec<DefectRecord>>>()?;
        Ok(records)
    }

    pub fn insert_tx(
        conn: &Connection,
        detail_id: i64,
        order_id: i64,
        quantity: i64,
        created_at: NaiveDateTime,
    ) -> RepositoryResult<DefectRecord> {
        conn.execute(
            r#"
            INSERT INTO defect_record (detail_id, order_id, quantity, replaced, created_at)
            VALUES (?1, ?2, ?3, 0, ?4)
            "#,
            params![detail_id, order_id, quantity, created_at],
        )?;

        Ok(DefectRecord {
            id: conn.last_insert_rowid(),
            detail_id,
            order_id,
            quantity,
            replaced: false,
            created_at,
            replaced_at: None,
        })
    }

    /// Flag every open entry of the detail as replaced.
    pub fn mark_replaced_by_detail_tx(
        conn: &Connection,
        detail_id: i64,
        replaced_at: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let affected = conn.execute(
            r#"
            UPDATE defect_record
            SET replaced = 1, replaced_at = ?2
            WHERE detail_id = ?1 AND replaced = 0
            "#,
            params![detail_id, replaced_at],
        )?;
        Ok(affected)
    }
}
