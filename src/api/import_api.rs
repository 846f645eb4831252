// ==========================================
// Packing Station - import API
// ==========================================
// Thin wrapper over OrderImporterImpl for the request boundary.
// ==========================================

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiResult;
use crate::importer::{ImportSummary, OrderImporter, OrderImporterImpl};

/// Batch response: one entry per file, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchImportResponse {
    pub succeeded: Vec<ImportSummary>,
    /// Error messages of the files that were rejected.
    pub failed: Vec<String>,
}

pub struct ImportApi {
    importer: OrderImporterImpl,
}

impl ImportApi {
    pub fn new(conn: Arc<Mutex<Connection>>, csv_delimiter: u8) -> Self {
        Self {
            importer: OrderImporterImpl::from_connection(conn, csv_delimiter),
        }
    }

    pub async fn import_file(&self, file_path: &Path) -> ApiResult<ImportSummary> {
        Ok(self.importer.import_file(file_path).await?)
    }

    pub async fn batch_import(&self, file_paths: Vec<String>) -> BatchImportResponse {
        let (succeeded, failed): (Vec<_>, Vec<_>) = self
            .importer
            .batch_import(file_paths)
            .await
            .into_iter()
            .partition(Result::is_ok);

        BatchImportResponse {
            succeeded: succeeded.into_iter().filter_map(Result::ok).collect(),
            failed: failed.into_iter().filter_map(Result::err).collect(),
        }
    }
}
