// ==========================================
// Packing Station - import layer
// ==========================================
// External order lists (CSV / Excel) into Draft orders and details.
// ==========================================

pub mod error;
pub mod file_parser;
pub mod importer_trait;
pub mod order_importer;

pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use importer_trait::{FileParser, OrderImporter};
pub use order_importer::{parse_rows, ImportSummary, OrderImporterImpl, RawDetailRow};
