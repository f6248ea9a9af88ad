//! Commands for the RSVP CLI.

/// Command for starting the HTTP server.
pub mod up;
/// Command for handling a single CGI request.
pub mod wagi;
