//! Request handlers for the RSVP service.
//!
//! Each handler is a plain function of its decoded input and the store
//! location: it opens its own connection, runs a single statement and returns
//! either a success value or a [`HandlerError`]. Nothing here knows about the
//! transport; wrappers turn the result into a [`Reply`].

#![deny(missing_docs)]

mod create;
mod delete;
mod error;

use std::{error::Error as _, fmt::Display};

use http::StatusCode;

pub use create::{create_rsvp, Created};
pub use delete::{delete_rsvp, Deleted};
pub use error::HandlerError;

/// A status code paired with a plain text body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    /// The status to report.
    pub status: StatusCode,
    /// The plain text body.
    pub body: String,
}

impl Reply {
    /// Creates a reply with the given status and body.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Creates a `200 OK` reply.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Creates a reply using the status code's canonical reason as the body.
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, status.canonical_reason().unwrap_or_default())
    }

    /// Converts a handler result into a reply, logging store failures.
    pub fn from_result<T: Display>(result: Result<T, HandlerError>) -> Self {
        match result {
            Ok(value) => Self::ok(value.to_string()),
            Err(err) => {
                if let HandlerError::Store(store_err) = &err {
                    match store_err.source() {
                        Some(cause) => tracing::error!("{store_err}: {cause}"),
                        None => tracing::error!("{store_err}"),
                    }
                }
                Self::new(err.status(), err.to_string())
            }
        }
    }
}

impl<T: Display> From<Result<T, HandlerError>> for Reply {
    fn from(result: Result<T, HandlerError>) -> Self {
        Self::from_result(result)
    }
}
