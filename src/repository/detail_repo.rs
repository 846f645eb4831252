// ==========================================
// Packing Station - packing_detail repository
// ==========================================
// Counter updates are single SQL increments, never
// read-then-write from Rust.
// ==========================================

use crate::db::open_shared_connection;
use crate::domain::order::{NewDetail, PackingDetail};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const DETAIL_COLUMNS: &str = "id, order_id, name, external_code, required_quantity, \
     packed_quantity, defective_quantity, size_info";

fn map_detail_row(row: &Row<'_>) -> SqliteResult<PackingDetail> {
    Ok(PackingDetail {
        id: row.get(0)?,
        order_id: row.get(1)?,
        name: row.get(2)?,
        external_code: row.get(3)?,
        required_quantity: row.get(4)?,
        packed_quantity: row.get(5)?,
        defective_quantity: row.get(6)?,
        size_info: row.get(7)?,
    })
}

// ==========================================
// PackingDetailRepository
// ==========================================
pub struct PackingDetailRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PackingDetailRepository {
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

    pub fn find_by_id(&self, detail_id: i64) -> RepositoryResult<Option<PackingDetail>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, detail_id)
    }

    pub fn find_by_order(&self, order_id: i64) -> RepositoryResult<Vec<PackingDetail>> {
        let conn = self.get_conn()?;
        Self::find_by_order_tx(&conn, order_id)
    }

    // ==========================================
    // Transaction-scoped operations
    // ==========================================

    pub fn find_by_id_tx(conn: &Connection, detail_id: i64) -> RepositoryResult<Option<PackingDetail>> {
        let sql = format!("SELECT {} FROM packing_detail WHERE id = ?1", DETAIL_COLUMNS);
        let detail = conn
            .query_row(&sql, params![detail_id], map_detail_row)
            .optional()?;
        Ok(detail)
    }

    pub fn get_tx(conn: &Connection, detail_id: i64) -> RepositoryResult<PackingDetail> {
        Self::find_by_id_tx(conn, detail_id)?
            .ok_or_else(|| RepositoryError::not_found("PackingDetail", detail_id))
    }

    /// Details of an order in creation order.
    pub fn find_by_order_tx(conn: &Connection, order_id: i64) -> RepositoryResult<Vec<PackingDetail>> {
        let sql = format!(
            "SELECT {} FROM packing_detail WHERE order_id = ?1 ORDER BY id",
            DETAIL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let details = stmt
            .query_map(params![order_id], map_detail_row)?
            .collect::<SqliteResult<Vec<PackingDetail>>>()?;
        Ok(details)
    }

    /// First detail (lowest id) with `external_code` inside the order.
    pub fn find_first_by_code_tx(
        conn: &Connection,
        order_id: i64,
        external_code: &str,
    ) -> RepositoryResult<Option<PackingDetail>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM packing_detail
            WHERE order_id = ?1 AND external_code = ?2
            ORDER BY id
            LIMIT 1
            "#,
            DETAIL_COLUMNS
        );
        let detail = conn
            .query_row(&sql, params![order_id, external_code], map_detail_row)
            .optional()?;
        Ok(detail)
    }

    /// Append a detail with zeroed counters. No dedup by code.
    pub fn insert_tx(
        conn: &Connection,
        order_id: i64,
        detail: &NewDetail,
    ) -> RepositoryResult<PackingDetail> {
        conn.execute(
            r#"
            INSERT INTO packing_detail (
                order_id, external_code, name, required_quantity,
                packed_quantity, defective_quantity, size_info
            ) VALUES (?1, ?2, ?3, ?4, 0, 0, ?5)
            "#,
            params![
                order_id,
                detail.external_code,
                detail.name,
                detail.required_quantity,
                detail.size_info,
            ],
        )?;

        Ok(PackingDetail {
            id: conn.last_insert_rowid(),
            order_id,
            name: detail.name.clone(),
            external_code: detail.external_code.clone(),
            required_quantity: detail.required_quantity,
            packed_quantity: 0,
            defective_quantity: 0,
            size_info: detail.size_info.clone(),
        })
    }

    /// `packed_quantity += 1`, returns the new value.
    pub fn increment_packed_tx(conn: &Connection, detail_id: i64) -> RepositoryResult<i64> {
        let packed = conn
            .query_row(
                r#"
                UPDATE packing_detail
                SET packed_quantity = packed_quantity + 1
                WHERE id = ?1
                RETURNING packed_quantity
                "#,
                params![detail_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        packed.ok_or_else(|| RepositoryError::not_found("PackingDetail", detail_id))
    }

    /// `defective_quantity += count`, returns the new value.
    pub fn add_defective_tx(conn: &Connection, detail_id: i64, count: i64) -> RepositoryResult<i64> {
        let defective = conn
            .query_row(
                r#"
                UPDATE packing_detail
                SET defective_quantity = defective_quantity + ?2
                WHERE id = ?1
                RETURNING defective_quantity
                "#,
                params![detail_id, count],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        defective.ok_or_else(|| RepositoryError::not_found("PackingDetail", detail_id))
    }

    pub fn clear_defective_tx(conn: &Connection, detail_id: i64) -> RepositoryResult<()> {
        let affected = conn.execute(
            "UPDATE packing_detail SET defective_quantity = 0 WHERE id = ?1",
            params![detail_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("PackingDetail", detail_id));
        }
        Ok(())
    }

    /// Zero both counters on every detail of the order.
    pub fn reset_counters_by_order_tx(conn: &Connection, order_id: i64) -> RepositoryResult<usize> {
        let affected = conn.execute(
            r#"
            UPDATE packing_detail
            SET packed_quantity = 0, defective_quantity = 0
            WHERE order_id = ?1
            "#,
            params![order_id],
        )?;
        Ok(affected)
    }
}
