// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Site settings document

use crate::codec::{json, to_json};
use crate::Result;
use chrono::Utc;
use folio_api_contract::SETTINGS_ID;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

pub struct SettingsStore<'a> {
    conn: &'a Connection,
}

impl<'a> SettingsStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Stored document, if one has ever been written
    pub fn get(&self) -> Result<Option<Value>> {
        Ok(self
            .conn
            .query_row(
                "SELECT document FROM settings WHERE id = ?1",
                params![SETTINGS_ID],
                |row| json(row, 0),
            )
            .optional()?)
    }

    /// Insert or replace the document
    pub fn put(&self, document: &Value) -> Result<()> {
        self.conn.execute(
            "INSERT INTO settings (id, document, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET document = excluded.document,
                 updated_at = excluded.updated_at",
            params![SETTINGS_ID, to_json(document)?, Utc::now()],
        )?;
        Ok(())
    }

    pub fn delete_all(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM settings", [])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use serde_json::json;

    #[test]
    fn put_replaces_document() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let store = SettingsStore::new(conn);
            assert!(store.get()?.is_none());
            store.put(&json!({"siteName": "A"}))?;
            store.put(&json!({"siteName": "B"}))?;
            assert_eq!(store.get()?, Some(json!({"siteName": "B"})));
            Ok(())
        })
        .unwrap();
    }
}
