// ==========================================
// Packing Station - importer interfaces
// ==========================================

use crate::importer::error::ImportResult;
use crate::importer::order_importer::{ImportSummary, RawDetailRow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

// ==========================================
// OrderImporter
// ==========================================
// Implemented by OrderImporterImpl.
// Create path only: no state transitions, no analytics.
#[async_trait]
pub trait OrderImporter: Send + Sync {
    /// Import one .csv/.xlsx/.xls file.
    ///
    /// The whole file is one transaction: any invalid row aborts it.
    async fn import_file<P: AsRef<Path> + Send>(&self, file_path: P) -> ImportResult<ImportSummary>;

    /// Import already-parsed rows.
    async fn import_rows(&self, source: &str, rows: Vec<RawDetailRow>) -> ImportResult<ImportSummary>;

    /// Import several files concurrently, each in its own transaction.
    /// One failing file does not affect the others.
    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
    ) -> Vec<Result<ImportSummary, String>>;
}

// ==========================================
// FileParser
// ==========================================
// Implemented by CsvParser, ExcelParser.
pub trait FileParser: Send + Sync {
    /// Rows as header -> trimmed cell value; blank rows skipped.
    fn parse_to_raw_records(&self, path: &Path) -> ImportResult<Vec<HashMap<String, String>>>;
}
