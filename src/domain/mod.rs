//! Domain layer - core types and contracts.
//!
//! This layer contains pure domain models, configuration and error types
//! without any external dependencies (network, filesystem, transport).

pub mod config;
pub mod error;
pub mod models;
pub mod ports;

pub use config::{AppConfig, LimitsConfig, OutputConfig, SessionConfig};
pub use error::{AppError, Result};
pub use models::{Entity, EntityKind, Event, ExtractStats, Participant, Roster};
pub use ports::{BlobStorage, ExportParser, Messenger, WorkbookWriter};