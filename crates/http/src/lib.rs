//! Transport-neutral request dispatch for the RSVP service.
//!
//! Both deployment shapes, the long-running HTTP server and the single
//! invocation CGI command, decode a request into a method, path and body and
//! hand it to the same [`RsvpService`].

pub mod body;
pub mod routes;
pub mod wagi;

use http::Method;
use rsvp_model::DatabaseLocation;

pub use body::Body;
pub use routes::{rsvp_router, Routed, Router};

/// The RSVP router bound to a store location.
pub struct RsvpService {
    location: DatabaseLocation,
    router: Router,
}

impl RsvpService {
    /// Creates a service serving the RSVP routes from the given store.
    pub fn new(location: DatabaseLocation) -> anyhow::Result<Self> {
        Ok(Self {
            location,
            router: rsvp_router()?,
        })
    }

    /// The store this service reads and writes.
    pub fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    /// The routes this service answers.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Routes a single request to its handler.
    ///
    /// This performs blocking store I/O; async callers should run it on a
    /// blocking thread.
    pub fn dispatch(&self, method: &Method, path: &str, body: &[u8]) -> Routed {
        self.router.handle(&self.location, method, path, body)
    }
}
