//! Workbook document serialization.
//!
//! Emits one CSV document with three fixed, independently identifiable
//! sections (participants, mentions, channels) so a round-trip validator
//! can confirm the structure. Column headers keep the bilingual wording
//! the product shipped with.

use chrono::{DateTime, Utc};

use crate::domain::{AppError, Participant, Result, Roster, WorkbookWriter};

/// Fixed section names the validator checks for.
pub const SECTION_PARTICIPANTS: &str = "[Participants]";
pub const SECTION_MENTIONS: &str = "[Mentions]";
pub const SECTION_CHANNELS: &str = "[Channels]";

const PEOPLE_HEADERS: [&str; 6] = [
    "Дата экспорта",
    "Username",
    "Имя и фамилия",
    "Описание",
    "Дата регистрации",
    "Наличие канала",
];

const CHANNEL_HEADERS: [&str; 2] = ["Дата экспорта", "Channel"];

const NO_CHANNELS_PLACEHOLDER: &str = "(каналы не найдены)";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// CSV-backed [`WorkbookWriter`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvWorkbook;

impl CsvWorkbook {
    /// Creates the writer.
    pub const fn new() -> Self {
        Self
    }
}

impl WorkbookWriter for CsvWorkbook {
    fn serialize(&self, roster: &Roster, exported_at: DateTime<Utc>) -> Result<Vec<u8>> {
        // Sections have differing widths, so the writer must be flexible.
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        let stamp = exported_at.format(DATE_FORMAT).to_string();

        write_people_section(&mut writer, SECTION_PARTICIPANTS, &roster.participants, &stamp)?;
        write_people_section(&mut writer, SECTION_MENTIONS, &roster.mentions, &stamp)?;
        write_channels_section(&mut writer, &roster.channels, &stamp)?;

        writer
            .into_inner()
            .map_err(|e| AppError::Workbook {
                message: e.to_string(),
                source: None,
            })
    }
}

fn write_people_section(
    writer: &mut csv::Writer<Vec<u8>>,
    section: &str,
    people: &[Participant],
    stamp: &str,
) -> Result<()> {
    writer.write_record([section]).map_err(AppError::workbook)?;
    writer
        .write_record(PEOPLE_HEADERS)
        .map_err(AppError::workbook)?;

    for person in people {
        // The extraction engine filters these already; re-checking keeps
        // the document sane for rosters built elsewhere.
        if person.is_deleted || !person.has_display_text() {
            continue;
        }

        let username = display_username(&person.username);
        let full_name = person.full_name();
        let registered = person
            .registered_at
            .map(|dt| dt.format(DATE_FORMAT).to_string())
            .unwrap_or_default();
        let has_channel = if person.has_channel { "да" } else { "нет" };

        writer
            .write_record([
                stamp,
                username.as_str(),
                full_name.as_str(),
                person.bio.as_str(),
                registered.as_str(),
                has_channel,
            ])
            .map_err(AppError::workbook)?;
    }

    writer.write_record([""]).map_err(AppError::workbook)?;
    Ok(())
}

fn write_channels_section(
    writer: &mut csv::Writer<Vec<u8>>,
    channels: &[String],
    stamp: &str,
) -> Result<()> {
    writer
        .write_record([SECTION_CHANNELS])
        .map_err(AppError::workbook)?;
    writer
        .write_record(CHANNEL_HEADERS)
        .map_err(AppError::workbook)?;

    let mut written = 0;
    for channel in channels {
        let channel = channel.trim();
        if channel.is_empty() {
            continue;
        }
        writer
            .write_record([stamp, channel])
            .map_err(AppError::workbook)?;
        written += 1;
    }

    if written == 0 {
        writer
            .write_record([stamp, NO_CHANNELS_PLACEHOLDER])
            .map_err(AppError::workbook)?;
    }

    Ok(())
}

fn display_username(username: &str) -> String {
    let username = username.trim();
    if username.is_empty() || username.starts_with('@') {
        username.to_string()
    } else {
        format!("@{username}")
    }
}

/// Confirms the document carries all three fixed sections.
///
/// # Errors
/// Returns error naming the first missing section, or a parse error for
/// bytes that are not a CSV document.
pub fn validate_workbook_bytes(data: &[u8]) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(data);

    let mut found = [false; 3];
    let sections = [SECTION_PARTICIPANTS, SECTION_MENTIONS, SECTION_CHANNELS];

    for record in reader.records() {
        let record = record.map_err(AppError::workbook)?;
        if let Some(first) = record.get(0) {
            for (i, section) in sections.iter().enumerate() {
                if first == *section {
                    found[i] = true;
                }
            }
        }
    }

    for (i, section) in sections.iter().enumerate() {
        if !found[i] {
            return Err(AppError::InvalidData {
                message: format!("missing workbook section {section}"),
            });
        }
    }
    Ok(())
}
