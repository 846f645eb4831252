// ==========================================
// Packing Station - application layer
// ==========================================
// Wires the APIs together and exposes the command boundary.
// ==========================================

pub mod commands;
pub mod state;

pub use commands::{dispatch, error_payload, CommandRequest};
pub use state::{get_default_db_path, AppState};
