use std::num::ParseIntError;

use http::StatusCode;
use rsvp_model::StoreError;

/// The ways a handler can fail.
///
/// Each variant maps to exactly one status code; the display text is the
/// plain text body returned to the client.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The create payload did not decode into an RSVP.
    #[error("Invalid request body")]
    InvalidBody(#[source] serde_json::Error),
    /// The path identifier is not an integer.
    #[error("Invalid ID")]
    InvalidId(#[source] ParseIntError),
    /// The identifier is well formed but no row matched it.
    #[error("RSVP not found")]
    NotFound,
    /// The store could not be opened, or a statement failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HandlerError {
    /// The status code reported for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody(_) | Self::InvalidId(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
