// ==========================================
// Packing Station - packing_order repository
// ==========================================
// No business rules here: the state column is written only with
// values the service layer has already decided.
// ==========================================

use crate::db::open_shared_connection;
use crate::domain::order::PackingOrder;
use crate::domain::types::OrderState;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const ORDER_COLUMNS: &str =
    "id, reference, operator_id, created_date, state, shipping_label";

/// Map one `packing_order` row (columns in ORDER_COLUMNS order).
fn map_order_row(row: &Row<'_>) -> SqliteResult<PackingOrder> {
    let state_raw: String = row.get(4)?;
    let state = state_raw.parse::<OrderState>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, e.into())
    })?;

    Ok(PackingOrder {
        id: row.get(0)?,
        reference: row.get(1)?,
        operator_id: row.get(2)?,
        created_date: row.get(3)?,
        state,
        shipping_label: row.get(5)?,
    })
}

// ==========================================
// PackingOrderRepository
// ==========================================
pub struct PackingOrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PackingOrderRepository {
    /// Open a dedicated connection on `db_path` (schema is ensured).
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_shared_connection(db_path)?;
        Ok(Self { conn })
    }

    /// Share an existing connection.
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // Self-locking reads
    // ==========================================

    pub fn find_by_id(&self, order_id: i64) -> RepositoryResult<Option<PackingOrder>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, order_id)
    }

    pub fn find_by_reference(&self, reference: &str) -> RepositoryResult<Option<PackingOrder>> {
        let conn = self.get_conn()?;
        Self::find_by_reference_tx(&conn, reference)
    }

    /// Orders whose state is one of `states`, oldest first.
    pub fn list_by_states(&self, states: &[OrderState]) -> RepositoryResult<Vec<PackingOrder>> {
        let conn = self.get_conn()?;
        Self::list_by_states_tx(&conn, states)
    }

    // ==========================================
    // Transaction-scoped operations
    // ==========================================

    pub fn find_by_id_tx(conn: &Connection, order_id: i64) -> RepositoryResult<Option<PackingOrder>> {
        let sql = format!("SELECT {} FROM packing_order WHERE id = ?1", ORDER_COLUMNS);
        let order = conn
            .query_row(&sql, params![order_id], map_order_row)
            .optional()?;
        Ok(order)
    }

    /// Like `find_by_id_tx` but a missing row is `NotFound`.
    pub fn get_tx(conn: &Connection, order_id: i64) -> RepositoryResult<PackingOrder> {
        Self::find_by_id_tx(conn, order_id)?
            .ok_or_else(|| RepositoryError::not_found("PackingOrder", order_id))
    }

    /// First order (lowest id) carrying this external reference.
    pub fn find_by_reference_tx(
        conn: &Connection,
        reference: &str,
    ) -> RepositoryResult<Option<PackingOrder>> {
        let sql = format!(
            "SELECT {} FROM packing_order WHERE reference = ?1 ORDER BY id LIMIT 1",
            ORDER_COLUMNS
        );
        let order = conn
            .query_row(&sql, params![reference], map_order_row)
            .optional()?;
        Ok(order)
    }

    /// Insert a Draft order with no operator.
    pub fn insert_tx(
        conn: &Connection,
        reference: &str,
        created_date: NaiveDate,
    ) -> RepositoryResult<PackingOrder> {
        conn.execute(
            r#"
            INSERT INTO packing_order (reference, operator_id, created_date, state)
            VALUES (?1, NULL, ?2, ?3)
            "#,
            params![reference, created_date, OrderState::Draft.as_str()],
        )?;

        Ok(PackingOrder {
            id: conn.last_insert_rowid(),
            reference: reference.to_string(),
            operator_id: None,
            created_date,
            state: OrderState::Draft,
            shipping_label: None,
        })
    }

    /// Every order of one analytics scope.
    pub fn find_by_operator_and_date_tx(
        conn: &Connection,
        operator_id: i64,
        created_date: NaiveDate,
    ) -> RepositoryResult<Vec<PackingOrder>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM packing_order
            WHERE operator_id = ?1 AND created_date = ?2
            ORDER BY id
            "#,
            ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let orders = stmt
            .query_map(params![operator_id, created_date], map_order_row)?
            .collect::<SqliteResult<Vec<PackingOrder>>>()?;
        Ok(orders)
    }

    pub fn list_by_states_tx(
        conn: &Connection,
        states: &[OrderState],
    ) -> RepositoryResult<Vec<PackingOrder>> {
        if states.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (1..=states.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM packing_order WHERE state IN ({}) ORDER BY id",
            ORDER_COLUMNS, placeholders
        );
        let state_strs: Vec<&str> = states.iter().map(OrderState::as_str).collect();

        let mut stmt = conn.prepare(&sql)?;
        let orders = stmt
            .query_map(rusqlite::params_from_iter(state_strs.iter()), map_order_row)?
            .collect::<SqliteResult<Vec<PackingOrder>>>()?;
        Ok(orders)
    }

    pub fn update_state_tx(conn: &Connection, order_id: i64, state: OrderState) -> RepositoryResult<()> {
        let affected = conn.execute(
            "UPDATE packing_order SET state = ?1 WHERE id = ?2",
            params![state.as_str(), order_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("PackingOrder", order_id));
        }
        Ok(())
    }

    pub fn set_operator_tx(conn: &Connection, order_id: i64, operator_id: i64) -> RepositoryResult<()> {
        let affected = conn.execute(
            "UPDATE packing_order SET operator_id = ?1 WHERE id = ?2",
            params![operator_id, order_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("PackingOrder", order_id));
        }
        Ok(())
    }

    /// Store (or clear, with `None`) the generated shipping label.
    pub fn set_shipping_label_tx(
        conn: &Connection,
        order_id: i64,
        label: Option<&[u8]>,
    ) -> RepositoryResult<()> {
        let affected = conn.execute(
            "UPDATE packing_order SET shipping_label = ?1 WHERE id = ?2",
            params![label, order_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("PackingOrder", order_id));
        }
        Ok(())
    }

    /// Delete an order; details and defect records go with it (ON DELETE CASCADE).
    pub fn delete_tx(conn: &Connection, order_id: i64) -> RepositoryResult<()> {
        let affected = conn.execute("DELETE FROM packing_order WHERE id = ?1", params![order_id])?;
        if affected == 0 {
            return Err(RepositoryError::not_found("PackingOrder", order_id));
        }
        Ok(())
    }
}
