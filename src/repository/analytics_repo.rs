// ==========================================
// Packing Station - packing_analytics repository
// ==========================================
// Rows are keyed by (operator_id, date), created lazily and
// only ever overwritten by the aggregator.
// ==========================================

use crate::db::open_shared_connection;
use crate::domain::analytics::{AnalyticsRecord, AnalyticsTotals};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const ANALYTICS_COLUMNS: &str = "id, operator_id, date, total_orders, total_packed_units, \
     total_defective_units, total_defective_orders";

fn map_analytics_row(row: &Row<'_>) -> SqliteResult<AnalyticsRecord> {
    Ok(AnalyticsRecord {
        id: row.get(0)?,
        operator_id: row.get(1)?,
        date: row.get(2)?,
        totals: AnalyticsTotals {
            total_orders: row.get(3)?,
            total_packed_units: row.get(4)?,
            total_defective_units: row.get(5)?,
            total_defective_orders: row.get(6)?,
        },
    })
}

pub struct AnalyticsRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AnalyticsRepository {
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

    pub fn find(&self, operator_id: i64, date: NaiveDate) -> RepositoryResult<Option<AnalyticsRecord>> {
        let conn = self.get_conn()?;
        Self::find_tx(&conn, operator_id, date)
    }

    /// All records, newest date first; optionally one operator only.
    pub fn list(&self, operator_id: Option<i64>) -> RepositoryResult<Vec<AnalyticsRecord>> {
        let conn = self.get_conn()?;

        let records = match operator_id {
            Some(op) => {
                let sql = format!(
                    "SELECT {} FROM packing_analytics WHERE operator_id = ?1 ORDER BY date DESC, operator_id",
                    ANALYTICS_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![op], map_analytics_row)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM packing_analytics ORDER BY date DESC, operator_id",
                    ANALYTICS_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], map_analytics_row)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
        };

        Ok(records)
    }

    // ==========================================
    // Transaction-scoped operations
    // ==========================================

    pub fn find_tx(
        conn: &Connection,
        operator_id: i64,
        date: NaiveDate,
    ) -> RepositoryResult<Option<AnalyticsRecord>> {
        let sql = format!(
            "SELECT {} FROM packing_analytics WHERE operator_id = ?1 AND date = ?2",
            ANALYTICS_COLUMNS
        );
        let record = conn
            .query_row(&sql, params![operator_id, date], map_analytics_row)
            .optional()?;
        Ok(record)
    }

    /// Locate the (operator, date) row, creating a zeroed one if absent.
    pub fn ensure_tx(
        conn: &Connection,
        operator_id: i64,
        date: NaiveDate,
    ) -> RepositoryResult<AnalyticsRecord> {
        if let Some(existing) = Self::find_tx(conn, operator_id, date)? {
            return Ok(existing);
        }

        conn.execute(
            "INSERT INTO packing_analytics (operator_id, date) VALUES (?1, ?2)",
            params![operator_id, date],
        )?;
        tracing::debug!(operator_id, %date, "analytics record created");

        Ok(AnalyticsRecord {
            id: conn.last_insert_rowid(),
            operator_id,
            date,
            totals: AnalyticsTotals::default(),
        })
    }

    /// Replace all four counters of a record.
    pub fn overwrite_totals_tx(
        conn: &Connection,
        record_id: i64,
        totals: &AnalyticsTotals,
    ) -> RepositoryResult<()> {
        let affected = conn.execute(
            r#"
            UPDATE packing_analytics
            SET total_orders = ?1,
                total_packed_units = ?2,
                total_defective_units = ?3,
                total_defective_orders = ?4
            WHERE id = ?5
            "#,
            params![
                totals.total_orders,
                totals.total_packed_units,
                totals.total_defective_units,
                totals.total_defective_orders,
                record_id,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("AnalyticsRecord", record_id));
        }
        Ok(())
    }
}
