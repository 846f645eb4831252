// ==========================================
// Packing Station - domain layer
// ==========================================
// Entities and value types only.
// No data access, no transition rules.
// ==========================================

pub mod analytics;
pub mod defect;
pub mod order;
pub mod types;

pub use analytics::{AnalyticsRecord, AnalyticsTotals};
pub use defect::DefectRecord;
pub use order::{NewDetail, OrderWithDetails, PackingDetail, PackingOrder};
pub use types::OrderState;
