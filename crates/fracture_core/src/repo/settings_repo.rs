//! Project settings persistence.
//!
//! # Responsibility
//! - Load and save the single serialized settings payload.
//!
//! # Invariants
//! - The payload is always a JSON object.
//! - At most one settings row is written by this repository; `save` updates
//!   the first row in place and only inserts when none exists.

use crate::repo::element_repo::{RepoError, RepoResult};
use crate::repo::ensure_tables;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{Map, Value};

/// Decoded settings payload.
pub type Settings = Map<String, Value>;

/// Repository interface for the project settings payload.
pub trait SettingsRepository {
    /// Loads the settings object. A missing row yields an empty object.
    fn load(&self) -> RepoResult<Settings>;
    /// Replaces the stored settings object.
    fn save(&self, settings: &Settings) -> RepoResult<()>;
}

/// SQLite-backed settings repository.
pub struct SqliteSettingsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettingsRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["settings"])?;
        Ok(Self { conn })
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn load(&self) -> RepoResult<Settings> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM settings ORDER BY id ASC LIMIT 1;",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(text) => parse_payload(&text),
            None => Ok(Settings::new()),
        }
    }

    fn save(&self, settings: &Settings) -> RepoResult<()> {
        let payload = serde_json::to_string(settings)
            .map_err(|err| RepoError::InvalidData(format!("unserializable settings: {err}")))?;

        let changed = self.conn.execute(
            "UPDATE settings
             SET data = ?1
             WHERE id = (SELECT MIN(id) FROM settings);",
            [payload.as_str()],
        )?;
        if changed == 0 {
            self.conn
                .execute("INSERT INTO settings (data) VALUES (?1);", [payload.as_str()])?;
        }
        Ok(())
    }
}

fn parse_payload(text: &str) -> RepoResult<Settings> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(RepoError::InvalidData(format!(
            "settings payload must be a JSON object, got `{other}`"
        ))),
        Err(err) => Err(RepoError::InvalidData(format!(
            "settings payload is not valid JSON: {err}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_payload;

    #[test]
    fn parse_payload_accepts_objects_only() {
        assert!(parse_payload("{}").expect("empty object").is_empty());
        assert!(parse_payload("[1, 2]").is_err());
        assert!(parse_payload("not json").is_err());
    }
}
