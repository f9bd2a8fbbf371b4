// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! SQLite persistence for the Folio admin backend
//!
//! A [`Database`] owns a single connection behind a mutex. Stores borrow the
//! connection for the duration of a closure:
//!
//! ```no_run
//! # use folio_local_db::{Database, PostStore};
//! # fn demo(db: &Database) -> folio_local_db::Result<()> {
//! let posts = db.with_conn(|conn| PostStore::new(conn).count())?;
//! # Ok(()) }
//! ```
//!
//! Stores accept any `&Connection`, so the same code runs inside
//! [`Database::transaction`].

mod codec;
pub mod schema;

pub mod activity;
pub mod analytics;
pub mod backups;
pub mod notifications;
pub mod portfolio;
pub mod posts;
pub mod pricing;
pub mod security;
pub mod settings;
pub mod testimonials;
pub mod users;

pub use activity::{ActivityStore, LoginHistoryStore};
pub use analytics::{AnalyticsStore, NewAnalyticsEvent, PageViewStore};
pub use backups::BackupRecordStore;
pub use notifications::NotificationStore;
pub use portfolio::PortfolioStore;
pub use posts::PostStore;
pub use pricing::PricingStore;
pub use security::SecurityStore;
pub use settings::SettingsStore;
pub use testimonials::TestimonialStore;
pub use users::{UserCredentials, UserStore};

pub use rusqlite::{Connection, Transaction};

use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Handle to the application database
pub struct Database {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open (or create) a database file and bring its schema up to date.
    /// `:memory:` opens a private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str() == ":memory:" {
            return Self::open_in_memory();
        }
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        tracing::info!(path = %path.display(), "Opened database");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` with exclusive access to the connection
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&conn)
    }

    /// Run `f` inside a transaction; commits when `f` succeeds, rolls back otherwise
    pub fn transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Cheap liveness check
    pub fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }
}
