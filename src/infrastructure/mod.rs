//! Infrastructure layer - external adapters (filesystem, formats).
//!
//! This layer holds the concrete collaborator implementations and all
//! I/O-touching code.

pub mod config;
pub mod export_parser;
pub mod redact;
pub mod temp_storage;
pub mod workbook;

pub use config::{ensure_config_exists, load_config, load_config_from_file};
pub use export_parser::TelegramExportParser;
pub use redact::redact;
pub use temp_storage::TempDirStorage;
pub use workbook::{validate_workbook_bytes, CsvWorkbook};