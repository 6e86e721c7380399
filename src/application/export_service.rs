//! Orchestration of the accept/process/cancel flows.
//!
//! Sequences the collaborators around the core: storage for queued blobs,
//! the parser for raw bytes, the extraction engine, the output policy and
//! the messenger for responses. Upload limits are enforced here, before
//! anything reaches the session store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::domain::{
    AppConfig, BlobStorage, Event, ExportParser, ExtractStats, Messenger, Result, WorkbookWriter,
};
use crate::infrastructure::redact;

use super::extractor::{merge_events, RosterExtractor};
use super::formatter::{choose_format, pack_user_list, OutputFormat};
use super::messages;
use super::session::{SessionState, SessionStore};

/// Name of the workbook document sent to the user.
const WORKBOOK_FILE_NAME: &str = "roster_export.csv";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One inbound user action, the unit the transport hands to the core.
#[derive(Debug)]
pub enum UserAction {
    /// First contact or a `/start` command.
    Start,
    /// `/help`.
    Help,
    /// `/upload`.
    UploadPrompt,
    /// A document upload.
    AcceptFile {
        /// Original file name, for messages and storage.
        name: String,
        /// Declared size in bytes, checked against the limits.
        size: u64,
        /// Raw file bytes.
        data: Vec<u8>,
    },
    /// `/process`.
    Process,
    /// `/cancel`.
    Cancel,
}

/// Orchestrator for per-user extraction/export cycles.
pub struct ExportService {
    config: AppConfig,
    store: SessionStore,
    extractor: RosterExtractor,
    storage: Arc<dyn BlobStorage>,
    parser: Arc<dyn ExportParser>,
    workbook: Arc<dyn WorkbookWriter>,
    messenger: Arc<dyn Messenger>,
    // Accumulated upload bytes per user. The store tracks references only;
    // the total-size cap needs byte counts, kept here and dropped together
    // with the session.
    totals: Mutex<HashMap<i64, u64>>,
}

impl ExportService {
    /// Wires the orchestrator together.
    pub fn new(
        config: AppConfig,
        store: SessionStore,
        storage: Arc<dyn BlobStorage>,
        parser: Arc<dyn ExportParser>,
        workbook: Arc<dyn WorkbookWriter>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            config,
            store,
            extractor: RosterExtractor::new(),
            storage,
            parser,
            workbook,
            messenger,
            totals: Mutex::new(HashMap::new()),
        }
    }

    /// Handles one action, converting any failure into a log line plus a
    /// best-effort user message. One failing action cannot affect other
    /// sessions or take down the process.
    pub async fn handle(&self, user_id: i64, chat_id: i64, action: UserAction) {
        let outcome = match action {
            UserAction::Start => self.start(user_id, chat_id).await,
            UserAction::Help => self.messenger.send_text(chat_id, messages::HELP).await,
            UserAction::UploadPrompt => {
                self.messenger
                    .send_text(chat_id, messages::UPLOAD_PROMPT)
                    .await
            }
            UserAction::AcceptFile { name, size, data } => {
                self.accept_file(user_id, chat_id, &name, size, data).await
            }
            UserAction::Process => self.process(user_id, chat_id).await,
            UserAction::Cancel => self.cancel(user_id, chat_id).await,
        };

        if let Err(error) = outcome {
            tracing::error!(
                user = %redact(&user_id.to_string()),
                %error,
                "action failed"
            );
            if let Err(send_error) = self
                .messenger
                .send_text(chat_id, messages::UNEXPECTED_ERROR)
                .await
            {
                tracing::error!(%send_error, "failed to report error to user");
            }
        }
    }

    /// Runs `handle` on its own task: one lightweight task per inbound
    /// action, with the error boundary inside.
    pub fn spawn(self: &Arc<Self>, user_id: i64, chat_id: i64, action: UserAction) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.handle(user_id, chat_id, action).await })
    }

    async fn start(&self, user_id: i64, chat_id: i64) -> Result<()> {
        let text = match self.store.get(user_id).await {
            Some(session) if !session.files.is_empty() => messages::WELCOME_BACK,
            _ => messages::START,
        };
        self.messenger.send_text(chat_id, text).await
    }

    /// Queues one uploaded file, enforcing the count, per-file and total
    /// size limits. Limit violations are user messages, not errors; the
    /// session is left exactly as it was.
    async fn accept_file(
        &self,
        user_id: i64,
        chat_id: i64,
        name: &str,
        size: u64,
        data: Vec<u8>,
    ) -> Result<()> {
        let session = self.store.get_or_create(user_id).await;

        if session.files.len() >= self.config.limits.max_files {
            let text = messages::file_limit_exceeded(session.files.len());
            return self.messenger.send_text(chat_id, &text).await;
        }

        let size_mb = size as f64 / BYTES_PER_MB;
        if size > self.config.limits.max_file_size_bytes() {
            let text = messages::file_size_exceeded(size_mb);
            return self.messenger.send_text(chat_id, &text).await;
        }

        let accumulated = {
            let totals = self.totals.lock().await;
            totals.get(&user_id).copied().unwrap_or(0)
        };
        if accumulated + size > self.config.limits.max_total_size_bytes() {
            let text = messages::total_size_exceeded(accumulated as f64 / BYTES_PER_MB);
            return self.messenger.send_text(chat_id, &text).await;
        }

        let file_ref = self.storage.save(name, &mut data.as_slice())?;
        let session = self.store.append_file(user_id, file_ref.clone()).await;
        {
            let mut totals = self.totals.lock().await;
            *totals.entry(user_id).or_insert(0) += size;
        }

        tracing::info!(
            user = %redact(&user_id.to_string()),
            file = %redact(&file_ref),
            queued = session.files.len(),
            "file queued"
        );

        self.messenger
            .send_text(chat_id, &messages::file_received(name))
            .await?;
        self.messenger
            .send_text(
                chat_id,
                &messages::files_ready(session.files.len(), size_mb),
            )
            .await
    }

    /// Runs the full extraction/export cycle over the queued files.
    ///
    /// Collaborator failures are reported with the failing file named and
    /// leave the session intact (state back to `Loading`) so the user can
    /// retry or cancel. Empty results are informational and complete the
    /// cycle like a success.
    async fn process(&self, user_id: i64, chat_id: i64) -> Result<()> {
        let Some(session) = self.store.get(user_id).await else {
            return self.messenger.send_text(chat_id, messages::NO_FILES).await;
        };
        if session.files.is_empty() {
            return self.messenger.send_text(chat_id, messages::NO_FILES).await;
        }
        let files = session.files;

        self.store.set_state(user_id, SessionState::Processing).await;
        self.messenger
            .send_text(chat_id, &messages::processing(files.len()))
            .await?;

        let mut batches: Vec<Vec<Event>> = Vec::with_capacity(files.len());
        for file_ref in &files {
            match self.parse_one(file_ref) {
                Ok(events) => batches.push(events),
                Err(error) => {
                    tracing::warn!(
                        user = %redact(&user_id.to_string()),
                        file = %redact(file_ref),
                        %error,
                        "processing failed"
                    );
                    self.store.set_state(user_id, SessionState::Loading).await;
                    let name = display_name(file_ref);
                    return self
                        .messenger
                        .send_text(chat_id, &messages::file_parse_error(&name, &error.to_string()))
                        .await;
                }
            }
        }

        let events = merge_events(batches);
        if events.is_empty() {
            self.messenger
                .send_text(chat_id, messages::NO_PARTICIPANTS)
                .await?;
            return self.finish_cycle(user_id, &files).await;
        }

        let roster = self.extractor.extract(&events);
        if roster.participants.is_empty() {
            self.messenger
                .send_text(chat_id, messages::NO_PARTICIPANTS)
                .await?;
            return self.finish_cycle(user_id, &files).await;
        }

        let stats = ExtractStats::from_roster(&roster, files.len(), events.len());
        self.messenger
            .send_text(
                chat_id,
                &messages::result_ready(
                    stats.participants,
                    stats.mentions,
                    stats.channels,
                    stats.events_total,
                ),
            )
            .await?;

        match choose_format(roster.participants.len(), self.config.output.inline_threshold) {
            OutputFormat::List => {
                let chunks =
                    pack_user_list(&roster.participants, self.config.output.max_message_len);
                let total = chunks.len();
                for (i, chunk) in chunks.iter().enumerate() {
                    let text = if total > 1 {
                        messages::list_part(i + 1, total, chunk)
                    } else {
                        messages::list_ready(chunk)
                    };
                    self.messenger.send_text(chat_id, &text).await?;
                }
            }
            OutputFormat::Workbook => {
                let document = self.workbook.serialize(&roster, Utc::now())?;
                self.messenger
                    .send_text(chat_id, messages::WORKBOOK_READY)
                    .await?;
                self.messenger
                    .send_document(chat_id, WORKBOOK_FILE_NAME, document)
                    .await?;
            }
        }

        self.store.set_state(user_id, SessionState::Complete).await;
        self.finish_cycle(user_id, &files).await
    }

    async fn cancel(&self, user_id: i64, chat_id: i64) -> Result<()> {
        let queued = self.store.file_count(user_id).await;
        if queued == 0 {
            return self
                .messenger
                .send_text(chat_id, messages::NOTHING_TO_CANCEL)
                .await;
        }

        let files = self.store.files(user_id).await;
        self.finish_cycle(user_id, &files).await?;
        self.messenger.send_text(chat_id, messages::CANCELLED).await
    }

    fn parse_one(&self, file_ref: &str) -> Result<Vec<Event>> {
        let mut reader = self.storage.read(file_ref)?;
        self.parser.parse(&mut reader, file_ref)
    }

    /// Deletes queued blobs best-effort, drops the byte counter and
    /// removes the session.
    async fn finish_cycle(&self, user_id: i64, files: &[String]) -> Result<()> {
        if let Err(error) = self.storage.delete_all(files) {
            tracing::warn!(%error, "failed to delete queued files");
        }
        {
            let mut totals = self.totals.lock().await;
            totals.remove(&user_id);
        }
        self.store.clear(user_id).await;
        Ok(())
    }
}

/// Base name of a file reference, for user-facing messages.
fn display_name(file_ref: &str) -> String {
    Path::new(file_ref)
        .file_name()
        .map_or_else(|| file_ref.to_string(), |n| n.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::domain::{AppError, Roster};
    use crate::infrastructure::{validate_workbook_bytes, CsvWorkbook};

    const USER: i64 = 100;
    const CHAT: i64 = 200;

    #[derive(Default)]
    struct MemStorage {
        blobs: StdMutex<HashMap<String, Vec<u8>>>,
        counter: std::sync::atomic::AtomicU64,
    }

    impl BlobStorage for MemStorage {
        fn save(&self, name: &str, data: &mut dyn Read) -> Result<String> {
            let mut bytes = Vec::new();
            data.read_to_end(&mut bytes)
                .map_err(|e| AppError::storage("read upload", e))?;
            let id = self
                .counter
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let file_ref = format!("{id}_{name}");
            self.blobs.lock().unwrap().insert(file_ref.clone(), bytes);
            Ok(file_ref)
        }

        fn read(&self, file_ref: &str) -> Result<Box<dyn Read + Send>> {
            let blobs = self.blobs.lock().unwrap();
            let bytes = blobs.get(file_ref).ok_or_else(|| AppError::Storage {
                message: format!("unknown blob {file_ref}"),
                source: None,
            })?;
            Ok(Box::new(Cursor::new(bytes.clone())))
        }

        fn delete_all(&self, file_refs: &[String]) -> Result<()> {
            let mut blobs = self.blobs.lock().unwrap();
            for file_ref in file_refs {
                blobs.remove(file_ref);
            }
            Ok(())
        }
    }

    /// Test parser: the blob is a JSON array of events.
    struct JsonEventParser;

    impl ExportParser for JsonEventParser {
        fn parse(&self, data: &mut dyn Read, file_ref: &str) -> Result<Vec<Event>> {
            serde_json::from_reader(data).map_err(|e| AppError::parse(file_ref, e))
        }
    }

    struct FailingParser;

    impl ExportParser for FailingParser {
        fn parse(&self, _data: &mut dyn Read, file_ref: &str) -> Result<Vec<Event>> {
            Err(AppError::parse_msg(file_ref, "broken export"))
        }
    }

    #[derive(Debug, PartialEq)]
    enum Sent {
        Text(String),
        Document(String, Vec<u8>),
    }

    #[derive(Default)]
    struct RecordingMessenger {
        sent: StdMutex<Vec<Sent>>,
    }

    impl RecordingMessenger {
        fn texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter_map(|s| match s {
                    Sent::Text(t) => Some(t.clone()),
                    Sent::Document(..) => None,
                })
                .collect()
        }

        fn documents(&self) -> Vec<(String, Vec<u8>)> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter_map(|s| match s {
                    Sent::Document(name, bytes) => Some((name.clone(), bytes.clone())),
                    Sent::Text(_) => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_text(&self, _chat_id: i64, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(Sent::Text(text.to_string()));
            Ok(())
        }

        async fn send_document(&self, _chat_id: i64, name: &str, data: Vec<u8>) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push(Sent::Document(name.to_string(), data));
            Ok(())
        }
    }

    struct Harness {
        service: Arc<ExportService>,
        messenger: Arc<RecordingMessenger>,
        store: SessionStore,
    }

    fn harness_with(config: AppConfig, parser: Arc<dyn ExportParser>) -> Harness {
        let store = SessionStore::new(Duration::from_secs(3600));
        let messenger = Arc::new(RecordingMessenger::default());
        let service = Arc::new(ExportService::new(
            config,
            store.clone(),
            Arc::new(MemStorage::default()),
            parser,
            Arc::new(CsvWorkbook::new()),
            messenger.clone(),
        ));
        Harness {
            service,
            messenger,
            store,
        }
    }

    fn harness() -> Harness {
        harness_with(AppConfig::default(), Arc::new(JsonEventParser))
    }

    fn events_json(prefix: &str, count: usize) -> Vec<u8> {
        let events: Vec<Event> = (0..count)
            .map(|i| Event::new(format!("@{prefix}{i}"), ""))
            .collect();
        serde_json::to_vec(&events).unwrap()
    }

    async fn upload(h: &Harness, name: &str, data: Vec<u8>) {
        let size = data.len() as u64;
        h.service
            .handle(
                USER,
                CHAT,
                UserAction::AcceptFile {
                    name: name.to_string(),
                    size,
                    data,
                },
            )
            .await;
    }

    #[tokio::test]
    async fn test_small_roster_goes_out_as_list() {
        let h = harness();
        upload(&h, "a.json", events_json("a", 3)).await;
        h.service.handle(USER, CHAT, UserAction::Process).await;

        let texts = h.messenger.texts();
        let list = texts
            .iter()
            .find(|t| t.starts_with("Participants:"))
            .expect("list message sent");
        for i in 0..3 {
            assert!(list.contains(&format!("@a{i}")));
        }
        assert!(h.messenger.documents().is_empty());

        // Cycle complete: session and blobs are gone.
        assert!(h.store.get(USER).await.is_none());
    }

    #[tokio::test]
    async fn test_two_files_merge_into_workbook() {
        let h = harness();
        upload(&h, "a.json", events_json("a", 10)).await;
        upload(&h, "b.json", events_json("b", 45)).await;
        h.service.handle(USER, CHAT, UserAction::Process).await;

        let texts = h.messenger.texts();
        assert!(
            texts.iter().any(|t| t.contains("55 participants")),
            "summary names the merged count: {texts:?}"
        );

        let documents = h.messenger.documents();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].0, WORKBOOK_FILE_NAME);

        // The emitted document passes the section validator.
        assert!(validate_workbook_bytes(&documents[0].1).is_ok());
        assert!(h.store.get(USER).await.is_none());
    }

    #[tokio::test]
    async fn test_workbook_document_has_all_sections() {
        let roster = Roster {
            participants: (0..60)
                .map(|i| crate::domain::Participant {
                    id: format!("@u{i}"),
                    username: format!("u{i}"),
                    ..Default::default()
                })
                .collect(),
            mentions: Vec::new(),
            channels: Vec::new(),
        };
        let bytes = CsvWorkbook::new().serialize(&roster, Utc::now()).unwrap();
        assert!(validate_workbook_bytes(&bytes).is_ok());
    }

    #[tokio::test]
    async fn test_file_limit_rejection_leaves_session_unchanged() {
        let mut config = AppConfig::default();
        config.limits.max_files = 1;
        let h = harness_with(config, Arc::new(JsonEventParser));

        upload(&h, "a.json", events_json("a", 1)).await;
        upload(&h, "b.json", events_json("b", 1)).await;

        assert_eq!(h.store.file_count(USER).await, 1);
        assert!(h
            .messenger
            .texts()
            .iter()
            .any(|t| t.contains("File limit reached")));
    }

    #[tokio::test]
    async fn test_oversized_file_is_rejected() {
        let mut config = AppConfig::default();
        config.limits.max_file_size_mb = 0; // every non-empty file is too large
        let h = harness_with(config, Arc::new(JsonEventParser));

        upload(&h, "a.json", events_json("a", 1)).await;

        assert_eq!(h.store.file_count(USER).await, 0);
        assert!(h
            .messenger
            .texts()
            .iter()
            .any(|t| t.contains("File too large")));
    }

    #[tokio::test]
    async fn test_total_size_cap_accumulates() {
        let mut config = AppConfig::default();
        config.limits.max_total_size_mb = 0;
        let h = harness_with(config, Arc::new(JsonEventParser));

        upload(&h, "a.json", events_json("a", 1)).await;

        assert_eq!(h.store.file_count(USER).await, 0);
        assert!(h
            .messenger
            .texts()
            .iter()
            .any(|t| t.contains("Total upload size limit")));
    }

    #[tokio::test]
    async fn test_parse_failure_leaves_session_intact_for_retry() {
        let h = harness_with(AppConfig::default(), Arc::new(FailingParser));
        upload(&h, "bad.json", events_json("a", 1)).await;
        h.service.handle(USER, CHAT, UserAction::Process).await;

        let texts = h.messenger.texts();
        assert!(
            texts
                .iter()
                .any(|t| t.contains("bad.json") && t.contains("broken export")),
            "failure names the file: {texts:?}"
        );

        let session = h.store.get(USER).await.expect("session survives failure");
        assert_eq!(session.state, SessionState::Loading);
        assert_eq!(session.files.len(), 1);

        // Cancel still works afterwards.
        h.service.handle(USER, CHAT, UserAction::Cancel).await;
        assert!(h.store.get(USER).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_events_is_informational_and_completes_cycle() {
        let h = harness();
        upload(&h, "empty.json", b"[]".to_vec()).await;
        h.service.handle(USER, CHAT, UserAction::Process).await;

        assert!(h
            .messenger
            .texts()
            .iter()
            .any(|t| t == messages::NO_PARTICIPANTS));
        assert!(h.store.get(USER).await.is_none());
    }

    #[tokio::test]
    async fn test_process_without_files_is_informational() {
        let h = harness();
        h.service.handle(USER, CHAT, UserAction::Process).await;
        assert_eq!(h.messenger.texts(), vec![messages::NO_FILES.to_string()]);
    }

    #[tokio::test]
    async fn test_cancel_without_session() {
        let h = harness();
        h.service.handle(USER, CHAT, UserAction::Cancel).await;
        assert_eq!(
            h.messenger.texts(),
            vec![messages::NOTHING_TO_CANCEL.to_string()]
        );
    }

    #[tokio::test]
    async fn test_start_greets_returning_users() {
        let h = harness();
        h.service.handle(USER, CHAT, UserAction::Start).await;
        upload(&h, "a.json", events_json("a", 1)).await;
        h.service.handle(USER, CHAT, UserAction::Start).await;

        let texts = h.messenger.texts();
        assert_eq!(texts.first().map(String::as_str), Some(messages::START));
        assert_eq!(
            texts.last().map(String::as_str),
            Some(messages::WELCOME_BACK)
        );
    }

    #[tokio::test]
    async fn test_full_cycle_over_filesystem_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.temp_dir = Some(dir.path().to_path_buf());

        let storage = Arc::new(crate::infrastructure::TempDirStorage::open(config.temp_dir()).unwrap());
        let store = SessionStore::new(Duration::from_secs(3600));
        let messenger = Arc::new(RecordingMessenger::default());
        let service = Arc::new(ExportService::new(
            config,
            store.clone(),
            storage.clone(),
            Arc::new(JsonEventParser),
            Arc::new(CsvWorkbook::new()),
            messenger.clone(),
        ));
        let h = Harness {
            service,
            messenger,
            store,
        };

        upload(&h, "a.json", events_json("a", 2)).await;
        h.service.handle(USER, CHAT, UserAction::Process).await;

        assert!(h
            .messenger
            .texts()
            .iter()
            .any(|t| t.contains("@a0") && t.contains("@a1")));
        // Blobs are deleted once the cycle completes.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_spawned_actions_run_concurrently() {
        let h = harness();
        let mut handles = Vec::new();
        for i in 0..8 {
            handles.push(h.service.spawn(
                USER,
                CHAT,
                UserAction::AcceptFile {
                    name: format!("f{i}.json"),
                    size: 2,
                    data: b"[]".to_vec(),
                },
            ));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(h.store.file_count(USER).await, 8);
    }
}