//! # chat-roster
//!
//! Core of a chat-export participant-roster service: a concurrency-safe
//! per-user session store with automatic idle expiry, a deduplicating
//! extraction engine, and an output policy that packs handles into
//! size-bounded text chunks or emits a multi-section workbook document.
//!
//! The messaging transport is out of scope; a front end embeds the
//! [`application::ExportService`] orchestrator and implements the
//! [`domain::ports::Messenger`] port. The bundled CLI drives the same
//! pipeline one-shot on local export files.
//!
//! ## Module Structure
//!
//! - [`domain`] — models, error type, configuration, collaborator ports
//! - [`application`] — session store, extractor, output policy, orchestrator
//! - [`infrastructure`] — TOML config, Telegram-export parser, temp-dir
//!   blob storage, workbook serializer, log-field redaction
//! - [`cli`] — clap types for the bundled binary

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

pub use application::{ExportService, RosterExtractor, SessionStore, UserAction};
pub use domain::{AppConfig, AppError, Event, Participant, Result, Roster};