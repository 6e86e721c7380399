//! Collaborator ports consumed by the orchestrator.
//!
//! The transport, blob storage, export parser and workbook serializer are
//! external to the core; these traits pin down exactly the interface the
//! core needs, so implementations (and test doubles) stay swappable.

use std::io::Read;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::Result;
use super::models::{Event, Roster};

/// Port for persistent blob storage of queued upload files.
pub trait BlobStorage: Send + Sync {
    /// Stores the stream under a name and returns an opaque file reference.
    ///
    /// # Errors
    /// Returns an error if the blob cannot be written.
    fn save(&self, name: &str, data: &mut dyn Read) -> Result<String>;

    /// Opens a previously saved blob for reading.
    ///
    /// # Errors
    /// Returns an error if the reference is unknown or unreadable.
    fn read(&self, file_ref: &str) -> Result<Box<dyn Read + Send>>;

    /// Deletes all the given blobs, best-effort.
    ///
    /// Partial failure must not crash the caller; implementations log and
    /// continue past individual misses.
    ///
    /// # Errors
    /// Returns an error only when nothing could be deleted at all.
    fn delete_all(&self, file_refs: &[String]) -> Result<()>;
}

/// Port for turning raw export bytes into an ordered event sequence.
pub trait ExportParser: Send + Sync {
    /// Parses one export file into its ordered events.
    ///
    /// The `file_ref` identifies the file in error messages.
    ///
    /// # Errors
    /// Returns an error if the stream is not a well-formed export.
    fn parse(&self, data: &mut dyn Read, file_ref: &str) -> Result<Vec<Event>>;
}

/// Port for serializing a roster into a workbook document.
pub trait WorkbookWriter: Send + Sync {
    /// Serializes the roster into document bytes.
    ///
    /// The document must carry dedicated sections for participants,
    /// mentions and channels, each identifiable by a fixed name.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    fn serialize(&self, roster: &Roster, exported_at: DateTime<Utc>) -> Result<Vec<u8>>;
}

/// Port for the messaging front end that renders responses to the user.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends a plain text message to a chat.
    ///
    /// # Errors
    /// Returns an error if the transport rejects the send.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Sends a named binary document to a chat.
    ///
    /// # Errors
    /// Returns an error if the transport rejects the send.
    async fn send_document(&self, chat_id: i64, name: &str, data: Vec<u8>) -> Result<()>;
}