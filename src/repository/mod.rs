// ==========================================
// Packing Station - repository layer
// ==========================================
// Data access only; all queries are parameterised.
// `*_tx` functions take the caller's connection/transaction so that
// a service operation can span several repositories atomically.
// ==========================================

pub mod analytics_repo;
pub mod defect_repo;
pub mod detail_repo;
pub mod error;
pub mod order_repo;

pub use analytics_repo::AnalyticsRepository;
pub use defect_repo::DefectRecordRepository;
pub use detail_repo::PackingDetailRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use order_repo::PackingOrderRepository;
