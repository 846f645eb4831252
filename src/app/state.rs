// ==========================================
// Packing Station - application state
// ==========================================
// One shared connection, one instance of each API.
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::info;

use crate::api::{AnalyticsApi, ImportApi, OrderApi, PackingApi};
use crate::config::{ConfigManager, PackingConfig};
use crate::db::{open_shared_connection, read_schema_version};
use crate::engine::TextLabelGenerator;

pub const DB_PATH_ENV: &str = "PACKING_STATION_DB_PATH";

pub struct AppState {
    pub db_path: String,
    pub conn: Arc<Mutex<Connection>>,
    pub packing_api: Arc<PackingApi>,
    pub order_api: Arc<OrderApi>,
    pub analytics_api: Arc<AnalyticsApi>,
    pub import_api: Arc<ImportApi>,
}

impl AppState {
    /// Open (and migrate) the database, then wire every API on one connection.
    pub fn new(db_path: String) -> Result<Self, String> {
        let conn = open_shared_connection(&db_path)
            .map_err(|e| format!("failed to open database {}: {}", db_path, e))?;

        let schema_version = {
            let guard = conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
            read_schema_version(&guard).map_err(|e| format!("failed to read schema version: {}", e))?
        };

        let config_manager = ConfigManager::from_connection(conn.clone())
            .map_err(|e| format!("failed to init config manager: {}", e))?;
        let config: PackingConfig = config_manager
            .load_packing_config()
            .map_err(|e| format!("failed to load config: {}", e))?;

        let label_generator = Arc::new(TextLabelGenerator::from_config(&config));
        let packing_api = PackingApi::new(conn.clone(), label_generator, config.clone());
        let import_api = ImportApi::new(conn.clone(), config.csv_delimiter);

        info!(
            db_path = %db_path,
            schema_version = ?schema_version,
            recompute_previous_operator = config.recompute_previous_operator,
            "application state ready"
        );

        Ok(Self {
            db_path,
            packing_api: Arc::new(packing_api),
            order_api: Arc::new(OrderApi::new(conn.clone())),
            analytics_api: Arc::new(AnalyticsApi::new(conn.clone())),
            import_api: Arc::new(import_api),
            conn,
        })
    }
}

/// Database location: `PACKING_STATION_DB_PATH`, otherwise the user data
/// directory, otherwise `./packing_station.db`.
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./packing_station.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("packing-station");
        // fall back to the working directory if the data dir is not writable
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("packing_station.db");
        }
    }

    path.to_string_lossy().to_string()
}
