//! Helpers for building HTTP bodies.

use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};

/// The body type used for requests and responses.
pub type Body = BoxBody<Bytes, anyhow::Error>;

/// Creates a body containing the given bytes.
pub fn full(bytes: Bytes) -> Body {
    Full::new(bytes).map_err(|never| match never {}).boxed()
}

/// Creates an empty body.
pub fn empty() -> Body {
    Empty::new().map_err(|never| match never {}).boxed()
}
