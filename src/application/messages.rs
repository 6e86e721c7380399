//! User-facing response texts.
//!
//! Kept in one place so wording stays consistent across handlers and
//! testable without string literals scattered through the flow code.

pub const START: &str = "Send me one or more chat export files (result.json from the \
    desktop export), then use /process to extract the participant roster.";

pub const WELCOME_BACK: &str =
    "Welcome back! You already have files queued. Send more or use /process.";

pub const HELP: &str = "Commands:\n\
    /upload — how to add export files\n\
    /process — extract the roster from queued files\n\
    /cancel — drop queued files and start over";

pub const UPLOAD_PROMPT: &str =
    "Attach the export file as a document. You can send several files; \
    they are merged into one roster.";

pub const NO_FILES: &str = "No files queued yet. Send an export file first.";

pub const NO_PARTICIPANTS: &str = "No participants found in the uploaded files.";

pub const WORKBOOK_READY: &str = "Roster is large; sending it as a workbook document.";

pub const CANCELLED: &str = "Cancelled. All queued files were dropped.";

pub const NOTHING_TO_CANCEL: &str = "Nothing to cancel.";

pub const UNEXPECTED_ERROR: &str = "Something went wrong. Please try again.";

pub fn file_received(name: &str) -> String {
    format!("Received {name}.")
}

pub fn files_ready(count: usize, size_mb: f64) -> String {
    format!("{count} file(s) queued (last file {size_mb:.1} MB). Use /process when ready.")
}

pub fn file_limit_exceeded(count: usize) -> String {
    format!("File limit reached ({count} queued). Use /process or /cancel first.")
}

pub fn file_size_exceeded(size_mb: f64) -> String {
    format!("File too large ({size_mb:.1} MB). Send a smaller export.")
}

pub fn total_size_exceeded(total_mb: f64) -> String {
    format!("Total upload size limit reached ({total_mb:.1} MB queued). Use /process or /cancel.")
}

pub fn processing(count: usize) -> String {
    format!("Processing {count} file(s)...")
}

pub fn file_parse_error(name: &str, reason: &str) -> String {
    format!("Could not process {name}: {reason}. Fix the file and retry, or /cancel.")
}

pub fn result_ready(participants: usize, mentions: usize, channels: usize, events: usize) -> String {
    format!(
        "Done: {participants} participants, {mentions} mentions, {channels} channels \
        from {events} messages."
    )
}

pub fn list_ready(list: &str) -> String {
    format!("Participants:\n{list}")
}

pub fn list_part(index: usize, total: usize, list: &str) -> String {
    format!("Participants (part {index}/{total}):\n{list}")
}