//! The CGI (WAGI) request and response codec.
//!
//! A WAGI host hands each request to a fresh process: metadata arrives as
//! environment variables, the body on stdin, and the response is written to
//! stdout as a `Status` header block followed by the body.

use std::{
    collections::HashMap,
    io::{Read, Write},
};

use anyhow::{anyhow, Context};
use http::{Method, Uri};
use rsvp_core::Reply;

/// The content type of every reply body.
pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// A request decoded from CGI meta-variables and stdin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CgiRequest {
    /// The request method.
    pub method: Method,
    /// The request path, without query string.
    pub path: String,
    /// The raw request body.
    pub body: Vec<u8>,
}

impl CgiRequest {
    /// Decodes a request from meta-variables and a body reader.
    ///
    /// Exactly `CONTENT_LENGTH` bytes are read from `stdin`; a missing or
    /// empty length means an empty body.
    pub fn from_env(
        vars: impl IntoIterator<Item = (String, String)>,
        stdin: impl Read,
    ) -> anyhow::Result<Self> {
        let vars: HashMap<String, String> = vars.into_iter().collect();

        let method = vars
            .get("REQUEST_METHOD")
            .ok_or_else(|| anyhow!("REQUEST_METHOD is not set"))?;
        let method = Method::from_bytes(method.as_bytes())
            .with_context(|| format!("invalid REQUEST_METHOD '{method}'"))?;

        let path = request_path(&vars);

        let content_length = match vars.get("CONTENT_LENGTH").map(|s| s.trim()) {
            None | Some("") => 0,
            Some(len) => len
                .parse::<u64>()
                .with_context(|| format!("invalid CONTENT_LENGTH '{len}'"))?,
        };
        let mut body = Vec::new();
        stdin
            .take(content_length)
            .read_to_end(&mut body)
            .context("failed to read request body")?;
        if (body.len() as u64) < content_length {
            tracing::warn!(
                expected = content_length,
                actual = body.len(),
                "Request body shorter than CONTENT_LENGTH"
            );
        }

        Ok(Self { method, path, body })
    }
}

// SCRIPT_NAME + PATH_INFO, then the path of REQUEST_URI, then X_FULL_URL.
fn request_path(vars: &HashMap<String, String>) -> String {
    let script_name = vars.get("SCRIPT_NAME").map(String::as_str).unwrap_or("");
    let path_info = vars.get("PATH_INFO").map(String::as_str).unwrap_or("");
    if !script_name.is_empty() || !path_info.is_empty() {
        return format!("{script_name}{path_info}");
    }

    ["REQUEST_URI", "X_FULL_URL"]
        .iter()
        .filter_map(|key| vars.get(*key))
        .filter_map(|uri| uri.parse::<Uri>().ok())
        .map(|uri| uri.path().to_owned())
        .find(|path| !path.is_empty())
        .unwrap_or_else(|| "/".to_owned())
}

/// Writes a reply as a CGI response.
pub fn compose_response(reply: &Reply, out: &mut impl Write) -> std::io::Result<()> {
    let reason = reply.status.canonical_reason().unwrap_or_default();
    writeln!(out, "Status: {} {reason}", reply.status.as_u16())?;
    writeln!(out, "Content-Type: {CONTENT_TYPE}")?;
    writeln!(out)?;
    out.write_all(reply.body.as_bytes())?;
    out.flush()
}
