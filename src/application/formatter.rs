//! Output shaping for extracted rosters.
//!
//! Small result sets go out as inline text; larger ones as a workbook
//! document. Inline output packs handles into size-bounded chunks.

use crate::domain::Participant;

/// Fallback chunk length when a zero limit is configured.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 3500;

/// Placeholder emitted when no participant has a usable handle.
pub const NO_HANDLES_PLACEHOLDER: &str = "(нет участников с username)";

/// Presentation format for an extraction result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One or more size-bounded text chunks.
    #[default]
    List,
    /// A structured multi-section workbook document.
    Workbook,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "list" => Ok(Self::List),
            "workbook" => Ok(Self::Workbook),
            _ => Err(format!("Unknown format: {s}. Use: list, workbook")),
        }
    }
}

/// Picks the presentation format from the participant count.
///
/// Counts below the threshold stay inline; everything else becomes a
/// workbook document.
pub const fn choose_format(participant_count: usize, inline_threshold: usize) -> OutputFormat {
    if participant_count < inline_threshold {
        OutputFormat::List
    } else {
        OutputFormat::Workbook
    }
}

/// Packs participant handles into newline-joined chunks of at most
/// `max_len` characters.
///
/// Handles are trimmed, empty ones dropped, and a leading `@` ensured.
/// When nothing survives, the result is a single placeholder chunk, never
/// an empty sequence. A handle that alone reaches the limit still gets its
/// own chunk; that is the only case where a chunk may exceed `max_len`.
pub fn pack_user_list(participants: &[Participant], max_len: usize) -> Vec<String> {
    let max_len = if max_len == 0 {
        DEFAULT_MAX_MESSAGE_LEN
    } else {
        max_len
    };

    let lines: Vec<String> = participants
        .iter()
        .filter_map(|p| {
            let handle = p.username.trim();
            if handle.is_empty() {
                return None;
            }
            if handle.starts_with('@') {
                Some(handle.to_string())
            } else {
                Some(format!("@{handle}"))
            }
        })
        .collect();

    if lines.is_empty() {
        return vec![NO_HANDLES_PLACEHOLDER.to_string()];
    }

    let mut out = Vec::new();
    let mut chunk = String::new();

    for line in &lines {
        // +1 for the joining newline when the chunk is non-empty.
        let add_len = line.len() + usize::from(!chunk.is_empty());
        if !chunk.is_empty() && chunk.len() + add_len > max_len {
            out.push(std::mem::take(&mut chunk));
        }
        if !chunk.is_empty() {
            chunk.push('\n');
        }
        chunk.push_str(line);

        // A single oversized handle is sent alone.
        if chunk.len() >= max_len {
            out.push(std::mem::take(&mut chunk));
        }
    }

    if !chunk.is_empty() {
        out.push(chunk);
    }
    out
}
