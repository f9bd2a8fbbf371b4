// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Bookkeeping rows for backup documents

use crate::codec::{conflict_on_unique, new_id, text_enum};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use folio_api_contract::{BackupKind, BackupRecord, BackupStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};

const BACKUP_COLUMNS: &str = "id, filename, size, kind, status, created_at";

fn backup_from_row(row: &Row<'_>) -> rusqlite::Result<BackupRecord> {
    Ok(BackupRecord {
        id: row.get(0)?,
        filename: row.get(1)?,
        size: row.get(2)?,
        kind: text_enum(row, 3)?,
        status: text_enum(row, 4)?,
        created_at: row.get(5)?,
    })
}

pub struct BackupRecordStore<'a> {
    conn: &'a Connection,
}

impl<'a> BackupRecordStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn insert(
        &self,
        filename: &str,
        size: u64,
        kind: BackupKind,
        status: BackupStatus,
    ) -> Result<BackupRecord> {
        let record = BackupRecord {
            id: new_id(),
            filename: filename.to_string(),
            size,
            kind,
            status,
            created_at: Utc::now(),
        };
        self.conn
            .execute(
                &format!("INSERT INTO backups ({BACKUP_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                params![
                    record.id,
                    record.filename,
                    record.size,
                    record.kind.as_str(),
                    record.status.as_str(),
                    record.created_at,
                ],
            )
            .map_err(|e| conflict_on_unique(e, || format!("backup {filename} already exists")))?;
        Ok(record)
    }

    /// Newest first
    pub fn list(&self) -> Result<Vec<BackupRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BACKUP_COLUMNS} FROM backups ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
            .query_map([], backup_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn find_by_filename(&self, filename: &str) -> Result<Option<BackupRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {BACKUP_COLUMNS} FROM backups WHERE filename = ?1"),
                params![filename],
                backup_from_row,
            )
            .optional()?)
    }

    pub fn created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<BackupRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BACKUP_COLUMNS} FROM backups WHERE created_at < ?1 ORDER BY created_at"
        ))?;
        let rows = stmt
            .query_map(params![cutoff], backup_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM backups WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::not_found("backup", id));
        }
        Ok(())
    }
}
