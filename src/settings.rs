/* ================= PREFERENCES DATABASE ================= */

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::SettingsError;

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub model: String,
}

/// Single-row preferences table. The API key is deliberately not a column.
pub struct SettingsStore {
    conn: Connection,
}

impl SettingsStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    #[cfg(test)]
    fn in_memory() -> Result<Self, SettingsError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, SettingsError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                model TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self { conn })
    }

    /// Returns the stored preferences, or `default_model` when nothing was saved yet.
    pub fn load(&self, default_model: &str) -> Result<Settings, SettingsError> {
        let model: Option<String> = self
            .conn
            .query_row("SELECT model FROM settings WHERE id = 1", [], |r| r.get(0))
            .optional()?;

        let model = model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| default_model.to_string());

        Ok(Settings { model })
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        self.conn.execute(
            "INSERT INTO settings (id, model) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET model = excluded.model",
            params![settings.model.trim()],
        )?;
        Ok(())
    }
}
