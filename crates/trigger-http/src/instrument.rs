use anyhow::Result;
use http::{Response, StatusCode};

use crate::Body;

/// Create the span covering one RSVP request.
///
/// `route`, `status` and `error` are filled in by [`finalize_http_span`].
macro_rules! http_span {
    ($request:expr, $addr:expr) => {
        tracing::info_span!(
            "rsvp.request",
            method = %$request.method(),
            path = $request.uri().path(),
            peer = %$addr,
            forwarded_for = $request
                .headers()
                .get("x-forwarded-for")
                .and_then(|val| val.to_str().ok()),
            route = ::tracing::field::Empty,
            status = ::tracing::field::Empty,
            error = ::tracing::field::Empty,
        )
    };
}

pub(crate) use http_span;

/// Records the outcome of a request on the current span.
///
/// Server errors, whether returned as a response or as an `Err`, are logged
/// at `ERROR` and mark the span's `error` field.
pub(crate) fn finalize_http_span(response: Result<Response<Body>>) -> Result<Response<Body>> {
    let span = tracing::Span::current();
    let status = match &response {
        Ok(response) => {
            if let Some(MatchedRoute { route }) = response.extensions().get::<MatchedRoute>() {
                span.record("route", route.as_str());
            }
            response.status()
        }
        Err(err) => {
            tracing::error!("Error processing request: {err:?}");
            span.record("error", format!("{err:#}").as_str());
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    span.record("status", status.as_u16());

    if response.is_ok() {
        match error_type(status) {
            Some(error) => {
                span.record("error", error);
                tracing::error!("Request failed with status code {status}");
            }
            None => tracing::info!("Request finished with status code {status}"),
        }
    }
    response
}

// Client errors are the caller's problem and leave the span clean.
fn error_type(status: StatusCode) -> Option<&'static str> {
    if status.is_server_error() {
        Some(status.canonical_reason().unwrap_or("server error"))
    } else {
        None
    }
}

/// The route pattern that handled a request, carried as a response
/// extension so the request span can record it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchedRoute {
    pub route: String,
}

impl MatchedRoute {
    pub fn with_response_extension(
        mut resp: Response<Body>,
        route: impl Into<String>,
    ) -> Response<Body> {
        resp.extensions_mut().insert(MatchedRoute {
            route: route.into(),
        });
        resp
    }
}
