use std::fmt;

use rsvp_model::{open_store, DatabaseLocation, StoreError};
use tracing::{instrument, Level};

use crate::HandlerError;

const DELETE_RSVP: &str = "DELETE FROM rsvp WHERE id = ?1";

/// A successfully removed RSVP.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deleted {
    /// The id of the removed row.
    pub id: i64,
}

impl fmt::Display for Deleted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RSVP with ID {} deleted", self.id)
    }
}

/// Parses `id` from a request path and deletes the matching row.
///
/// A statement that runs but removes nothing is reported as
/// [`HandlerError::NotFound`], never as success.
#[instrument(name = "rsvp_core.delete_rsvp", skip(location), err(level = Level::INFO))]
pub fn delete_rsvp(location: &DatabaseLocation, id: &str) -> Result<Deleted, HandlerError> {
    let id: i64 = id.parse().map_err(HandlerError::InvalidId)?;

    let connection = open_store(location)?;
    let mut statement = connection
        .prepare(DELETE_RSVP)
        .map_err(StoreError::PrepareFailed)?;
    let affected = statement
        .execute([id])
        .map_err(StoreError::ExecuteFailed)?;

    // sqlite reports the change count together with the execution result, so
    // there is no separate read that could fail here.
    if affected == 0 {
        return Err(HandlerError::NotFound);
    }

    tracing::info!(id, "RSVP deleted");
    Ok(Deleted { id })
}
