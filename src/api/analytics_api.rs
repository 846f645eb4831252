// ==========================================
// Packing Station - analytics API
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::analytics::AnalyticsRecord;
use crate::engine::AnalyticsAggregator;
use crate::repository::AnalyticsRepository;

pub struct AnalyticsApi {
    conn: Arc<Mutex<Connection>>,
    analytics_repo: AnalyticsRepository,
}

impl AnalyticsApi {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            analytics_repo: AnalyticsRepository::from_connection(conn.clone()),
            conn,
        }
    }

    /// Records newest date first, optionally for one operator.
    pub fn list_analytics(&self, operator_id: Option<i64>) -> ApiResult<Vec<AnalyticsRecord>> {
        Ok(self.analytics_repo.list(operator_id)?)
    }

    pub fn get_analytics(&self, operator_id: i64, date: NaiveDate) -> ApiResult<AnalyticsRecord> {
        self.analytics_repo.find(operator_id, date)?.ok_or_else(|| {
            ApiError::NotFound(format!(
                "AnalyticsRecord (operator_id={}, date={})",
                operator_id, date
            ))
        })
    }

    /// Rebuild one scope from current storage state.
    pub fn recompute_analytics(&self, operator_id: i64, date: NaiveDate) -> ApiResult<AnalyticsRecord> {
        if operator_id <= 0 {
            return Err(ApiError::InvalidArgument(format!(
                "operator_id must be > 0, got {}",
                operator_id
            )));
        }

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ApiError::StorageFailure(format!("lock poisoned: {}", e)))?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let record = AnalyticsAggregator::recompute_tx(&tx, operator_id, date)?;
        tx.commit()?;

        info!(operator_id, %date, total_orders = record.totals.total_orders, "analytics recomputed on request");
        Ok(record)
    }
}
