//! Telegram Desktop export parsing.
//!
//! Reads the `result.json` shape produced by the desktop export: a
//! `messages` array whose `text` field is either a plain string or an
//! array mixing strings with typed spans.

use std::io::Read;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{AppError, Entity, EntityKind, Event, ExportParser, Result};

/// Raw message structure for deserialization.
#[derive(Debug, Deserialize)]
struct RawMessage {
    /// Message type; only "message" records carry chat content.
    #[serde(rename = "type")]
    msg_type: String,
    /// Author identifier, e.g. `user12345` or `channel12345`.
    from_id: Option<String>,
    /// Unix timestamp as string.
    date_unixtime: Option<String>,
    /// Plain string or array of strings and typed spans.
    text: Option<Value>,
    /// Typed spans, present in newer exports.
    #[serde(default)]
    text_entities: Vec<RawEntity>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Export wrapper: the top-level object with the `messages` array.
#[derive(Debug, Deserialize)]
struct RawExport {
    messages: Vec<RawMessage>,
}

/// Parser for Telegram Desktop JSON exports.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelegramExportParser;

impl TelegramExportParser {
    /// Creates the parser.
    pub const fn new() -> Self {
        Self
    }
}

impl ExportParser for TelegramExportParser {
    fn parse(&self, data: &mut dyn Read, file_ref: &str) -> Result<Vec<Event>> {
        let export: RawExport =
            serde_json::from_reader(data).map_err(|e| AppError::parse(file_ref, e))?;

        let events = export
            .messages
            .iter()
            .filter(|m| m.msg_type == "message")
            .map(to_event)
            .collect();
        Ok(events)
    }
}

fn to_event(msg: &RawMessage) -> Event {
    let text = msg.text.as_ref().map(flatten_text).unwrap_or_default();

    // Prefer explicit text_entities; older exports only carry typed spans
    // inline in the text array.
    let entities = if msg.text_entities.is_empty() {
        msg.text.as_ref().map(inline_entities).unwrap_or_default()
    } else {
        msg.text_entities
            .iter()
            .map(|e| Entity::new(map_kind(&e.kind), e.text.clone()))
            .collect()
    };

    Event {
        author_id: msg.from_id.clone().unwrap_or_default(),
        text,
        date: msg
            .date_unixtime
            .as_deref()
            .and_then(parse_unix_timestamp),
        entities,
    }
}

/// Extracts plain text from the export's string-or-array `text` field.
fn flatten_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => obj
                    .get("text")
                    .and_then(Value::as_str)
                    .map(ToString::to_string),
                _ => None,
            })
            .collect::<String>(),
        _ => String::new(),
    }
}

/// Typed spans embedded in the `text` array.
fn inline_entities(value: &Value) -> Vec<Entity> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let kind = obj.get("type").and_then(Value::as_str)?;
            let text = obj.get("text").and_then(Value::as_str)?;
            Some(Entity::new(map_kind(kind), text))
        })
        .collect()
}

fn map_kind(kind: &str) -> EntityKind {
    match kind {
        "mention" => EntityKind::Mention,
        "channel" => EntityKind::Channel,
        _ => EntityKind::Other,
    }
}

fn parse_unix_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    ts.parse::<i64>().ok().and_then(|v| DateTime::from_timestamp(v, 0))
}
