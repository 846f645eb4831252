// ==========================================
// Test helpers
// ==========================================
// Temporary database, API wiring and seed data.
// ==========================================

#![allow(dead_code)]

use chrono::NaiveDate;
use packing_station::api::{AnalyticsApi, OrderApi, PackingApi};
use packing_station::config::PackingConfig;
use packing_station::db::{ensure_schema, open_shared_connection};
use packing_station::domain::{NewDetail, OrderWithDetails, PackingDetail, PackingOrder};
use packing_station::engine::{LabelError, LabelGenerator, TextLabelGenerator};
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// Create a temporary database file with the schema applied.
///
/// # Returns
/// - NamedTempFile: keep it alive for the duration of the test
/// - String: database file path
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("non-utf8 temp path")?.to_string();

    let conn = Connection::open(&db_path)?;
    ensure_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// Label generator that always fails.
pub struct FailingLabelGenerator;

impl LabelGenerator for FailingLabelGenerator {
    fn generate(
        &self,
        _order: &PackingOrder,
        _details: &[PackingDetail],
    ) -> Result<Vec<u8>, LabelError> {
        Err(LabelError::Render("printer offline".to_string()))
    }
}

/// Label generator that keeps a copy of every snapshot it is handed.
#[derive(Default)]
pub struct RecordingLabelGenerator {
    pub calls: Mutex<Vec<(PackingOrder, Vec<PackingDetail>)>>,
}

impl LabelGenerator for RecordingLabelGenerator {
    fn generate(
        &self,
        order: &PackingOrder,
        details: &[PackingDetail],
    ) -> Result<Vec<u8>, LabelError> {
        let mut calls = self
            .calls
            .lock()
            .map_err(|e| LabelError::Render(e.to_string()))?;
        calls.push((order.clone(), details.to_vec()));
        Ok(format!("label #{}", calls.len()).into_bytes())
    }
}

pub struct TestEnv {
    pub _temp_file: NamedTempFile,
    pub db_path: String,
    pub conn: Arc<Mutex<Connection>>,
    pub packing_api: PackingApi,
    pub order_api: OrderApi,
    pub analytics_api: AnalyticsApi,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with(Arc::new(TextLabelGenerator::default()), PackingConfig::default())
    }

    pub fn with(label_generator: Arc<dyn LabelGenerator>, config: PackingConfig) -> Self {
        let (temp_file, db_path) = create_test_db().unwrap();
        let conn = open_shared_connection(&db_path).unwrap();

        Self {
            packing_api: PackingApi::new(conn.clone(), label_generator, config),
            order_api: OrderApi::new(conn.clone()),
            analytics_api: AnalyticsApi::new(conn.clone()),
            conn,
            db_path,
            _temp_file: temp_file,
        }
    }

    /// Create an order on `date` with details `(code, name, required)`.
    pub fn seed_order(
        &self,
        reference: &str,
        date: NaiveDate,
        details: &[(&str, &str, i64)],
    ) -> OrderWithDetails {
        let mut order_id = None;
        for (code, name, required) in details {
            let response = self
                .order_api
                .add_detail_on(
                    reference,
                    NewDetail {
                        external_code: code.to_string(),
                        name: name.to_string(),
                        required_quantity: *required,
                        size_info: None,
                    },
                    date,
                )
                .unwrap();
            order_id = Some(response.order.id);
        }
        self.order_api.get_order(order_id.unwrap()).unwrap()
    }

    /// Execute raw SQL, bypassing every service.
    pub fn execute_sql(&self, sql: &str) {
        self.conn.lock().unwrap().execute_batch(sql).unwrap();
    }
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
