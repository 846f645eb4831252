// ==========================================
// Packing Station - API layer
// ==========================================
// Business operations called by the request boundary (app::commands).
// ==========================================

pub mod analytics_api;
pub mod error;
pub mod import_api;
pub mod order_api;
pub mod packing_api;

pub use analytics_api::AnalyticsApi;
pub use error::{ApiError, ApiResult};
pub use import_api::{BatchImportResponse, ImportApi};
pub use order_api::{AddDetailResponse, DeleteOrderResponse, OrderApi};
pub use packing_api::{
    AssignOperatorResponse, ClearDefectResponse, MarkDefectiveResponse, PackByCodeResponse,
    PackUnitResponse, PackingApi, ResetOrderResponse,
};
