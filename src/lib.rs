// ==========================================
// Packing Station - core library
// ==========================================
// Warehouse packing orders: per-detail progress, defects,
// order state machine and per-operator daily analytics.
// Stack: Rust + SQLite
// ==========================================

// ==========================================
// Modules
// ==========================================

// Domain - entities and value types
pub mod domain;

// Repository - data access
pub mod repository;

// Engine - transition rules, analytics rollup, labels
pub mod engine;

// Import - external order lists
pub mod importer;

// Configuration
pub mod config;

// Database bootstrap (PRAGMAs, schema)
pub mod db;

// Logging
pub mod logging;

// API - business operations
pub mod api;

// Application - state wiring and command boundary
pub mod app;

// ==========================================
// Re-exports
// ==========================================

pub use domain::types::OrderState;

pub use domain::{
    AnalyticsRecord, AnalyticsTotals, DefectRecord, NewDetail, OrderWithDetails, PackingDetail,
    PackingOrder,
};

pub use engine::{AnalyticsAggregator, LabelGenerator, OrderStateEngine, TextLabelGenerator};

pub use api::{AnalyticsApi, ApiError, ApiResult, ImportApi, OrderApi, PackingApi};

// ==========================================
// Constants
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "Packing Station";
