// ==========================================
// Packing Station - order/detail bulk importer
// ==========================================
// Columns: order_id, detail_id, name, quantity, size_measurements
// Per row: find-or-create the order by reference (Draft), then
// append a new detail. One transaction per file.
// ==========================================

use crate::db::open_shared_connection;
use crate::domain::order::NewDetail;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::importer_trait::OrderImporter;
use crate::repository::{PackingDetailRepository, PackingOrderRepository};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

pub mod columns {
    pub const ORDER_REFERENCE: &str = "order_id";
    pub const DETAIL_CODE: &str = "detail_id";
    pub const NAME: &str = "name";
    pub const QUANTITY: &str = "quantity";
    pub const SIZE: &str = "size_measurements";
}

/// One validated input row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDetailRow {
    /// 1-based line number in the source file (header is line 1).
    pub row_number: usize,
    pub reference: String,
    pub detail: NewDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub batch_id: String,
    pub source: String,
    pub rows_read: usize,
    pub orders_created: usize,
    pub details_created: usize,
    pub elapsed_ms: u64,
}

fn required_cell<'a>(
    record: &'a HashMap<String, String>,
    column: &str,
) -> ImportResult<&'a str> {
    record
        .get(column)
        .map(String::as_str)
        .ok_or_else(|| ImportError::MissingColumn(column.to_string()))
}

/// Integer quantity; Excel hands numbers over as "3" or "3.0".
fn parse_quantity(raw: &str) -> Option<i64> {
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 => Some(value as i64),
        _ => None,
    }
}

/// Validate raw records. Stops at the first bad row.
pub fn parse_rows(records: &[HashMap<String, String>]) -> ImportResult<Vec<RawDetailRow>> {
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let row_number = idx + 2;
            let row_error = |message: String| ImportError::RowError {
                row: row_number,
                message,
            };

            let reference = required_cell(record, columns::ORDER_REFERENCE)?.to_string();
            if reference.is_empty() {
                return Err(row_error("order_id must not be empty".to_string()));
            }

            let quantity_raw = required_cell(record, columns::QUANTITY)?;
            let required_quantity = parse_quantity(quantity_raw)
                .ok_or_else(|| row_error(format!("quantity is not an integer: '{}'", quantity_raw)))?;

            let size_info = record
                .get(columns::SIZE)
                .filter(|v| !v.is_empty())
                .cloned();

            let detail = NewDetail {
                external_code: required_cell(record, columns::DETAIL_CODE)?.to_string(),
                name: required_cell(record, columns::NAME)?.to_string(),
                required_quantity,
                size_info,
            };
            detail.validate().map_err(row_error)?;

            Ok(RawDetailRow {
                row_number,
                reference,
                detail,
            })
        })
        .collect()
}

/// Write rows inside one IMMEDIATE transaction.
///
/// # Returns
/// - (orders_created, details_created)
fn persist_rows(
    conn: &Mutex<Connection>,
    rows: &[RawDetailRow],
    created_date: NaiveDate,
) -> ImportResult<(usize, usize)> {
    let mut conn = conn
        .lock()
        .map_err(|e| ImportError::DatabaseConnectionError(format!("lock poisoned: {}", e)))?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut orders_created = 0;
    for row in rows {
        let order = match PackingOrderRepository::find_by_reference_tx(&tx, &row.reference)? {
            Some(order) => order,
            None => {
                orders_created += 1;
                PackingOrderRepository::insert_tx(&tx, &row.reference, created_date)?
            }
        };
        PackingDetailRepository::insert_tx(&tx, order.id, &row.detail)?;
    }

    tx.commit()?;
    Ok((orders_created, rows.len()))
}

// ==========================================
// OrderImporterImpl
// ==========================================
pub struct OrderImporterImpl {
    conn: Arc<Mutex<Connection>>,
    csv_delimiter: u8,
}

impl OrderImporterImpl {
    pub fn new(db_path: &str, csv_delimiter: u8) -> ImportResult<Self> {
        let conn = open_shared_connection(db_path)?;
        Ok(Self {
            conn,
            csv_delimiter,
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>, csv_delimiter: u8) -> Self {
        Self {
            conn,
            csv_delimiter,
        }
    }

    /// Blocking import of parsed rows with an explicit creation date.
    pub fn import_rows_on(
        &self,
        source: &str,
        rows: &[RawDetailRow],
        created_date: NaiveDate,
    ) -> ImportResult<ImportSummary> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();

        let (orders_created, details_created) = persist_rows(&self.conn, rows, created_date)?;

        let summary = ImportSummary {
            batch_id,
            source: source.to_string(),
            rows_read: rows.len(),
            orders_created,
            details_created,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        };
        info!(
            batch_id = %summary.batch_id,
            source = %summary.source,
            orders_created,
            details_created,
            "rows imported"
        );
        Ok(summary)
    }
}

#[async_trait]
impl OrderImporter for OrderImporterImpl {
    async fn import_file<P: AsRef<Path> + Send>(&self, file_path: P) -> ImportResult<ImportSummary> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        let path: PathBuf = file_path.as_ref().to_path_buf();
        let source = path.display().to_string();
        info!(batch_id = %batch_id, file_path = %source, "import started");

        let conn = Arc::clone(&self.conn);
        let delimiter = self.csv_delimiter;
        let created_date = Local::now().date_naive();

        let outcome = tokio::task::spawn_blocking(move || -> ImportResult<(usize, usize, usize)> {
            let records = UniversalFileParser::new(delimiter).parse(&path)?;
            let rows = parse_rows(&records)?;
            let (orders_created, details_created) = persist_rows(&conn, &rows, created_date)?;
            Ok((rows.len(), orders_created, details_created))
        })
        .await
        .map_err(|e| ImportError::InternalError(format!("import task failed: {}", e)))?;

        let (rows_read, orders_created, details_created) = outcome.map_err(|e| {
            warn!(batch_id = %batch_id, file_path = %source, error = %e, "import rejected");
            e
        })?;

        let summary = ImportSummary {
            batch_id,
            source,
            rows_read,
            orders_created,
            details_created,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        };
        info!(
            batch_id = %summary.batch_id,
            rows_read,
            orders_created,
            details_created,
            elapsed_ms = summary.elapsed_ms,
            "import finished"
        );
        Ok(summary)
    }

    async fn import_rows(&self, source: &str, rows: Vec<RawDetailRow>) -> ImportResult<ImportSummary> {
        let conn = Arc::clone(&self.conn);
        let delimiter = self.csv_delimiter;
        let source = source.to_string();
        let created_date = Local::now().date_naive();

        tokio::task::spawn_blocking(move || {
            OrderImporterImpl::from_connection(conn, delimiter).import_rows_on(
                &source,
                &rows,
                created_date,
            )
        })
        .await
        .map_err(|e| ImportError::InternalError(format!("import task failed: {}", e)))?
    }

    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
    ) -> Vec<Result<ImportSummary, String>> {
        use futures::future::join_all;

        info!(count = file_paths.len(), "batch import started");

        let import_tasks = file_paths.into_iter().map(|path| {
            let path_str = path.as_ref().display().to_string();
            async move {
                match self.import_file(path).await {
                    Ok(summary) => Ok(summary),
                    Err(e) => {
                        error!(file = %path_str, error = %e, "file import failed");
                        Err(format!("{}: {}", path_str, e))
                    }
                }
            }
        });

        let results = join_all(import_tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "batch import finished"
        );

        results
    }
}
