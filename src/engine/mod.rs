// ==========================================
// Packing Station - engine layer
// ==========================================
// Business rules: state transitions, analytics rollup, labels.
// No hand-written SQL; storage goes through repositories.
// ==========================================

pub mod analytics;
pub mod label;
pub mod order_state;

pub use analytics::AnalyticsAggregator;
pub use label::{LabelError, LabelGenerator, TextLabelGenerator};
pub use order_state::{OrderStateEngine, StateTransition};
