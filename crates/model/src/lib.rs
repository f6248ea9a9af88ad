//! The RSVP record and access to the SQLite store that holds it.
//!
//! This crate only describes rows and hands out connections. Executing
//! statements against those connections is left to the request handlers.

#![deny(missing_docs)]

mod statements;
mod store;

use serde::{Deserialize, Serialize};

pub use statements::SqlStatements;
pub use store::{
    count_rsvps, create_store, ensure_schema, get_rsvp, open_store, DatabaseLocation, StoreError,
    DEFAULT_BUSY_TIMEOUT,
};

/// An RSVP as submitted by a client, before the store assigns it an id.
///
/// All fields are required when decoding, but any of them may be empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRsvp {
    /// Name of the person responding.
    pub name: String,
    /// Contact email, stored as given.
    pub email: String,
    /// Free-text name of the event being responded to.
    pub event: String,
}

/// A persisted RSVP row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rsvp {
    /// Store-assigned identifier.
    pub id: i64,
    /// Name of the person responding.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Free-text name of the event.
    pub event: String,
}
