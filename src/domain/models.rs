//! Domain models for chat-export roster extraction.
//!
//! These models represent parsed export events and the deduplicated
//! roster produced from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a typed text span attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A referenced user handle (`@name`).
    Mention,
    /// A referenced broadcast channel handle.
    Channel,
    /// Any other span kind (links, hashtags, formatting, ...).
    #[serde(other)]
    Other,
}

/// A typed text span inside an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// What kind of span this is.
    pub kind: EntityKind,
    /// The literal text payload of the span.
    pub text: String,
}

impl Entity {
    /// Convenience constructor.
    pub fn new(kind: EntityKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// One message-level record parsed from an export file.
///
/// Events have no identity beyond their position in the merged sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Author identifier. May be empty, or carry the reserved `channel`
    /// prefix when the author is a broadcast channel.
    #[serde(default)]
    pub author_id: String,
    /// Free-form message text. May be empty.
    #[serde(default)]
    pub text: String,
    /// When the message was sent, if the export carried a timestamp.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    /// Typed spans attached to the message.
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl Event {
    /// Builds a bare event from an author and text, without entities.
    pub fn new(author_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author_id: author_id.into(),
            text: text.into(),
            date: None,
            entities: Vec::new(),
        }
    }
}

/// A deduplicated record for a message author or a referenced handle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Participant {
    /// The original author token or handle, case preserved for display.
    pub id: String,
    /// Display username without a leading `@`. May be empty.
    #[serde(default)]
    pub username: String,
    /// First name, if known. May be empty.
    #[serde(default)]
    pub first_name: String,
    /// Last name, if known. May be empty.
    #[serde(default)]
    pub last_name: String,
    /// Profile bio, if known. May be empty.
    #[serde(default)]
    pub bio: String,
    /// Account registration timestamp, if known.
    #[serde(default)]
    pub registered_at: Option<DateTime<Utc>>,
    /// Whether the account owns a broadcast channel.
    #[serde(default)]
    pub has_channel: bool,
    /// Whether the account is deleted and should be filtered out.
    #[serde(default)]
    pub is_deleted: bool,
}

impl Participant {
    /// Whether the record carries any displayable text at all.
    ///
    /// A record with no username and no name is useless output and is
    /// dropped from results even though it was a valid dedup key.
    pub fn has_display_text(&self) -> bool {
        !self.username.trim().is_empty()
            || !self.first_name.trim().is_empty()
            || !self.last_name.trim().is_empty()
    }

    /// Full name, trimmed, single-space joined. May be empty.
    pub fn full_name(&self) -> String {
        let joined = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        joined.trim().to_string()
    }
}

/// The deduplicated result of one extraction call.
///
/// All three collections are unordered; compare as sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    /// Message authors.
    pub participants: Vec<Participant>,
    /// Referenced handles found in text or typed spans.
    pub mentions: Vec<Participant>,
    /// Referenced channel handles, deduplicated by exact match.
    pub channels: Vec<String>,
}

impl Roster {
    /// True when nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty() && self.mentions.is_empty() && self.channels.is_empty()
    }
}

/// Summary counters for one extraction run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractStats {
    /// Export files parsed.
    pub files_parsed: usize,
    /// Events in the merged sequence.
    pub events_total: usize,
    /// Deduplicated participants.
    pub participants: usize,
    /// Deduplicated mentions.
    pub mentions: usize,
    /// Deduplicated channels.
    pub channels: usize,
}

impl ExtractStats {
    /// Builds stats from a roster plus pipeline counters.
    pub fn from_roster(roster: &Roster, files_parsed: usize, events_total: usize) -> Self {
        Self {
            files_parsed,
            events_total,
            participants: roster.participants.len(),
            mentions: roster.mentions.len(),
            channels: roster.channels.len(),
        }
    }
}
