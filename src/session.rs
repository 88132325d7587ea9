//! In-memory chat session: transcript, file catalog and activity log.
//!
//! Every UI action is split into a synchronous `begin`/`prepare` step that
//! validates input and records what is about to happen, the network call in
//! [`crate::api`], and a `finish` step that folds the outcome back in. The
//! Dioxus components hold a `Session` in a signal and only ever touch it
//! between awaits.

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{ChatReply, ChatRequest, UploadFile};
use crate::chart::{self, ChartSpec, RenderedChart};
use crate::error::ApiError;

pub const SPREADSHEET_SUFFIX: &str = ".xlsx";
pub const MISSING_API_KEY_ALERT: &str = "Please enter your Gemini API Key.";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    System,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CatalogEntry {
    pub filename: String,
    #[serde(default)]
    pub summary: String,
}

impl CatalogEntry {
    /// List key for the catalog view. The server may repeat a filename within
    /// one catalog, so the position is part of the key.
    pub fn row_key(&self, index: usize) -> String {
        format!("{index}-{}", self.filename)
    }
}

/// A transcript turn plus what the chat view needs to draw it.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub turn: ChatTurn,
    pub chart: Option<RenderedChart>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub timestamp: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActivityLog {
    entries: Vec<LogEntry>,
}

impl ActivityLog {
    pub fn push(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "sheetchat::activity", "{}", message);
        self.entries.push(LogEntry {
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            message,
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    #[cfg(test)]
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.message.as_str())
    }
}

/// Anything the upload filter can look at by name (picked files, dropped files).
pub trait NamedFile {
    fn file_name(&self) -> String;
}

impl NamedFile for UploadFile {
    fn file_name(&self) -> String {
        self.name.clone()
    }
}

pub fn is_spreadsheet(name: &str) -> bool {
    name.ends_with(SPREADSHEET_SUFFIX)
}

/// Why a chat submission did not leave the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatRejection {
    EmptyMessage,
    MissingApiKey,
}

impl ChatRejection {
    /// Text for a blocking alert, if this rejection warrants one.
    pub fn alert(self) -> Option<&'static str> {
        match self {
            ChatRejection::EmptyMessage => None,
            ChatRejection::MissingApiKey => Some(MISSING_API_KEY_ALERT),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    transcript: Vec<TranscriptEntry>,
    catalog: Vec<CatalogEntry>,
    pub log: ActivityLog,
    chats_in_flight: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    /// The send control is disabled while any chat request is outstanding.
    pub fn is_sending(&self) -> bool {
        self.chats_in_flight > 0
    }

    /// Conversation context for the server: user and model turns only.
    pub fn history(&self) -> Vec<ChatTurn> {
        self.transcript
            .iter()
            .filter(|e| e.turn.role != Role::System)
            .map(|e| e.turn.clone())
            .collect()
    }

    fn append(&mut self, turn: ChatTurn, chart: Option<RenderedChart>) {
        self.transcript.push(TranscriptEntry {
            id: Uuid::new_v4(),
            turn,
            chart,
        });
    }

    /* ---------------- upload ---------------- */

    /// Keeps the spreadsheets, logging each queued and skipped file.
    /// Returns `None` when nothing is left to read.
    pub fn prepare_upload<F: NamedFile>(&mut self, files: Vec<F>) -> Option<Vec<F>> {
        if files.is_empty() {
            return None;
        }

        let mut accepted = Vec::with_capacity(files.len());
        for file in files {
            let name = file.file_name();
            if is_spreadsheet(&name) {
                self.log.push(format!("Queued file for upload: {name}"));
                accepted.push(file);
            } else {
                self.log.push(format!("Skipped invalid file: {name}"));
            }
        }

        if accepted.is_empty() {
            return None;
        }
        Some(accepted)
    }

    /// Called once the accepted files have been read. Returns whether the
    /// batch should be posted.
    pub fn begin_upload(&mut self, batch: &[UploadFile]) -> bool {
        if batch.is_empty() {
            self.log.push("No readable files to upload.");
            return false;
        }
        self.log.push("Uploading and processing files...");
        true
    }

    pub fn finish_upload(&mut self, result: Result<Vec<CatalogEntry>, ApiError>) {
        match result {
            Ok(catalog) => {
                self.log.push("Files processed successfully.");
                self.catalog = catalog;
            }
            Err(ApiError::Server { message, .. }) => {
                self.log.push(format!("Error uploading files: {message}"));
            }
            Err(err) => {
                self.log.push(format!("Network error during upload: {err}"));
            }
        }
    }

    /* ---------------- chat ---------------- */

    /// Validates a submission and, if it may be sent, records the user turn
    /// and returns the request to post.
    pub fn begin_chat(
        &mut self,
        message: &str,
        api_key: &str,
        model_id: &str,
    ) -> Result<ChatRequest, ChatRejection> {
        let message = message.trim();
        let api_key = api_key.trim();

        if message.is_empty() {
            return Err(ChatRejection::EmptyMessage);
        }
        if api_key.is_empty() {
            return Err(ChatRejection::MissingApiKey);
        }

        self.append(ChatTurn::new(Role::User, message), None);
        self.log.push(format!("Sending message to {model_id}..."));
        self.chats_in_flight += 1;

        Ok(ChatRequest {
            message: message.to_string(),
            api_key: api_key.to_string(),
            model_id: model_id.to_string(),
            history: self.history(),
        })
    }

    pub fn finish_chat(&mut self, result: Result<ChatReply, ApiError>) {
        self.chats_in_flight = self.chats_in_flight.saturating_sub(1);

        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                match &err {
                    ApiError::Server { message, .. } => self.log.push(format!("Error from API: {message}")),
                    other => self.log.push(format!("Network error: {other}")),
                }
                self.append(ChatTurn::new(Role::System, format!("Error: {err}")), None);
                return;
            }
        };

        self.log.push("Received response from model.");
        let chart = reply.chart.as_ref().and_then(|value| self.render_chart(value));
        self.append(ChatTurn::new(Role::Model, reply.response), chart);
    }

    fn render_chart(&mut self, value: &serde_json::Value) -> Option<RenderedChart> {
        let parsed = ChartSpec::from_value(value);
        if let Ok(None) = parsed {
            return None;
        }

        self.log.push("Chart data received. Rendering chart...");
        let spec = match parsed {
            Ok(Some(spec)) => spec,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "ignoring chart payload");
                self.log.push(format!("Could not render chart: {err}"));
                return None;
            }
        };

        match chart::render_svg(&spec) {
            Ok(rendered) => Some(rendered),
            Err(err) => {
                warn!(error = %err, kind = %spec.kind, "chart rendering failed");
                self.log.push(format!("Could not render chart: {err}"));
                None
            }
        }
    }

    /* ---------------- reset ---------------- */

    pub fn finish_reset(&mut self, result: Result<(), ApiError>) {
        match result {
            Ok(()) => {
                self.transcript.clear();
                self.catalog.clear();
                self.log.push("Session reset.");
            }
            Err(err) => self.log.push(format!("Error resetting session: {err}")),
        }
    }
}
