// ==========================================
// Packing Station - defect ledger
// ==========================================
// Audit trail of MarkDefective / ClearDefect calls.
// Never read by the state machine or the aggregator.
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectRecord {
    pub id: i64,
    pub detail_id: i64,
    pub order_id: i64,
    pub quantity: i64,
    pub replaced: bool,
    pub created_at: NaiveDateTime,
    pub replaced_at: Option<NaiveDateTime>,
}
