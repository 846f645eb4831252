// ==========================================
// Packing Station - per-operator daily analytics
// ==========================================
// One row per (operator_id, date). Never patched incrementally:
// every recompute overwrites all four counters.
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub id: i64,
    pub operator_id: i64,
    pub date: NaiveDate,
    pub totals: AnalyticsTotals,
}

/// The recomputed counters of one (operator, date) scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsTotals {
    pub total_orders: i64,
    pub total_packed_units: i64,
    pub total_defective_units: i64,
    pub total_defective_orders: i64,
}
