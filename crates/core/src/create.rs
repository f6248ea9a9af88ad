use std::fmt;

use rsvp_model::{open_store, DatabaseLocation, NewRsvp, StoreError};
use rusqlite::params;
use tracing::{instrument, Level};

use crate::HandlerError;

const INSERT_RSVP: &str = "INSERT INTO rsvp (name, email, event) VALUES (?1, ?2, ?3)";

/// A successfully stored RSVP.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Created {
    /// The id the store assigned to the new row.
    pub id: i64,
    /// The `name` field of the new row.
    pub name: String,
}

impl fmt::Display for Created {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RSVP added for {} with ID {}", self.name, self.id)
    }
}

/// Decodes `body` as an RSVP and inserts it as a new row.
///
/// The body must be a JSON object with string `name`, `email` and `event`
/// fields. A body that does not decode never touches the store. On success
/// exactly one row has been added; on any failure none has.
#[instrument(name = "rsvp_core.create_rsvp", skip_all, err(level = Level::INFO))]
pub fn create_rsvp(location: &DatabaseLocation, body: &[u8]) -> Result<Created, HandlerError> {
    let rsvp: NewRsvp = serde_json::from_slice(body).map_err(HandlerError::InvalidBody)?;

    let connection = open_store(location)?;
    let mut statement = connection
        .prepare(INSERT_RSVP)
        .map_err(StoreError::PrepareFailed)?;
    statement
        .execute(params![rsvp.name, rsvp.email, rsvp.event])
        .map_err(StoreError::ExecuteFailed)?;
    let id = connection.last_insert_rowid();

    tracing::info!(id, "RSVP added");
    Ok(Created {
        id,
        name: rsvp.name,
    })
}
