use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use rusqlite::{Connection, OpenFlags, OptionalExtension};

use crate::Rsvp;

/// How long a connection waits on a locked database before giving up.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_RSVP_TABLE: &str = "CREATE TABLE IF NOT EXISTS rsvp (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL,
    email TEXT NOT NULL,
    event TEXT NOT NULL
)";

/// Errors raised while talking to the store.
///
/// The display text is what callers are shown; the underlying sqlite error is
/// kept as the source so it can be logged.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database could not be opened.
    #[error("Database connection failed")]
    ConnectionFailed(#[source] rusqlite::Error),
    /// A statement could not be compiled.
    #[error("Failed to prepare statement")]
    PrepareFailed(#[source] rusqlite::Error),
    /// A statement was compiled but failed to run.
    #[error("Failed to execute statement")]
    ExecuteFailed(#[source] rusqlite::Error),
}

/// The location of the sqlite database file backing the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseLocation {
    path: PathBuf,
    busy_timeout: Duration,
}

impl DatabaseLocation {
    /// Points at the database file at `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Like [`DatabaseLocation::new`], but ensures the parent directory of
    /// the database exists.
    pub fn from_path(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        // Create the store's parent directory if necessary
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!(
                    "failed to create sqlite database directory '{}'",
                    parent.display()
                )
            })?;
        }
        Ok(Self::new(path))
    }

    /// Overrides how long connections wait on a locked database.
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    /// The path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The busy timeout applied to every connection.
    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    /// A human readable description of the location.
    pub fn summary(&self) -> String {
        format!("\"{}\"", self.path.display())
    }
}

/// Opens a connection to an existing store.
///
/// The database file must already exist: a missing file is reported as
/// [`StoreError::ConnectionFailed`] rather than silently replaced by an empty
/// database. The connection is closed when dropped.
pub fn open_store(location: &DatabaseLocation) -> Result<Connection, StoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let connection =
        Connection::open_with_flags(&location.path, flags).map_err(StoreError::ConnectionFailed)?;
    connection
        .busy_timeout(location.busy_timeout)
        .map_err(StoreError::ConnectionFailed)?;
    Ok(connection)
}

/// Opens the store, creating the database file and the `rsvp` table if they
/// do not exist yet.
pub fn create_store(location: &DatabaseLocation) -> Result<Connection, StoreError> {
    let connection = Connection::open(&location.path).map_err(StoreError::ConnectionFailed)?;
    connection
        .busy_timeout(location.busy_timeout)
        .map_err(StoreError::ConnectionFailed)?;
    ensure_schema(&connection)?;
    tracing::debug!("Store ready at {}", location.summary());
    Ok(connection)
}

/// Creates the `rsvp` table if it is missing. Existing tables are left alone.
pub fn ensure_schema(connection: &Connection) -> Result<(), StoreError> {
    connection
        .execute_batch(CREATE_RSVP_TABLE)
        .map_err(StoreError::ExecuteFailed)
}

/// Returns the number of RSVP rows in the store.
pub fn count_rsvps(connection: &Connection) -> Result<i64, StoreError> {
    connection
        .prepare("SELECT COUNT(*) FROM rsvp")
        .map_err(StoreError::PrepareFailed)?
        .query_row([], |row| row.get(0))
        .map_err(StoreError::ExecuteFailed)
}

/// Looks up a single RSVP row by id.
pub fn get_rsvp(connection: &Connection, id: i64) -> Result<Option<Rsvp>, StoreError> {
    connection
        .prepare("SELECT id, name, email, event FROM rsvp WHERE id = ?1")
        .map_err(StoreError::PrepareFailed)?
        .query_row([id], |row| {
            Ok(Rsvp {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                event: row.get(3)?,
            })
        })
        .optional()
        .map_err(StoreError::ExecuteFailed)
}
