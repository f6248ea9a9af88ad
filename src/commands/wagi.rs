use std::io::{Read, Write};

use anyhow::Context;
use clap::Parser;
use http::StatusCode;
use rsvp_core::Reply;
use rsvp_http::{wagi::compose_response, wagi::CgiRequest, RsvpService};
use rsvp_model::SqlStatements;

use crate::runtime_config::StoreOptions;

/// Handle one request passed in CGI form.
///
/// Request metadata is read from the environment and the body from stdin;
/// the response is written to stdout.
#[derive(Parser, Debug)]
#[clap(about = "Handle a single request passed in CGI (WAGI) form")]
pub struct WagiCommand {
    #[clap(flatten)]
    pub store: StoreOptions,
}

impl WagiCommand {
    pub fn run(self) -> anyhow::Result<()> {
        self.handle(std::env::vars(), std::io::stdin().lock(), std::io::stdout().lock())
    }

    /// Decodes one request, dispatches it and writes the reply to `stdout`.
    ///
    /// Every invocation writes a response. Only a failure to write it is
    /// returned as an error.
    pub fn handle(
        &self,
        vars: impl IntoIterator<Item = (String, String)>,
        stdin: impl Read,
        mut stdout: impl Write,
    ) -> anyhow::Result<()> {
        let reply = self.reply(vars, stdin);
        compose_response(&reply, &mut stdout).context("failed to write response")
    }

    fn reply(&self, vars: impl IntoIterator<Item = (String, String)>, stdin: impl Read) -> Reply {
        let request = match CgiRequest::from_env(vars, stdin) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!("Rejecting undecodable request: {err:#}");
                return Reply::from_status(StatusCode::BAD_REQUEST);
            }
        };
        let service = match self.service() {
            Ok(service) => service,
            Err(err) => {
                tracing::error!("Failed to load store configuration: {err:#}");
                return Reply::from_status(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        tracing::info!("Processing {} request on path '{}'", request.method, request.path);
        service
            .dispatch(&request.method, &request.path, &request.body)
            .reply
    }

    // Each invocation is a fresh process, so the schema is ensured every
    // time. Startup statements belong to `rsvp up` and never run here.
    fn service(&self) -> anyhow::Result<RsvpService> {
        // A store that cannot be prepared still gets a service: every
        // request against it then fails with a server error.
        let location = match self.store.prepare(&SqlStatements::default()) {
            Ok(location) => location,
            Err(err) => {
                tracing::error!("Failed to prepare store: {err:#}");
                self.store.resolve()?
            }
        };
        RsvpService::new(location)
    }
}

#[cfg(test)]
mod tests {
    use rsvp_model::{count_rsvps, open_store, DatabaseLocation};
    use tempfile::TempDir;

    use super::*;

    fn env(method: &str, path: &str, body: &str) -> Vec<(String, String)> {
        vec![
            ("REQUEST_METHOD".into(), method.into()),
            ("PATH_INFO".into(), path.into()),
            ("CONTENT_LENGTH".into(), body.len().to_string()),
        ]
    }

    fn invoke(cmd: &WagiCommand, method: &str, path: &str, body: &str) -> anyhow::Result<String> {
        let mut out = Vec::new();
        cmd.handle(env(method, path, body), body.as_bytes(), &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    fn with_database(db: std::path::PathBuf) -> WagiCommand {
        WagiCommand {
            store: StoreOptions {
                database: Some(db),
                ..Default::default()
            },
        }
    }

    #[test]
    fn create_then_delete() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let db = dir.path().join("rsvp.db");
        let cmd = with_database(db.clone());

        let out = invoke(
            &cmd,
            "POST",
            "/rsvp",
            r#"{"name":"Ada","email":"ada@x.com","event":"Launch"}"#,
        )?;
        assert!(out.starts_with("Status: 200 OK\n"), "{out}");
        assert!(out.ends_with("\n\nRSVP added for Ada with ID 1"), "{out}");

        let out = invoke(&cmd, "DELETE", "/rsvp/1", "")?;
        assert!(out.ends_with("RSVP with ID 1 deleted"), "{out}");

        let out = invoke(&cmd, "DELETE", "/rsvp/1", "")?;
        assert!(out.starts_with("Status: 404 Not Found\n"), "{out}");

        let location = DatabaseLocation::new(db);
        assert_eq!(count_rsvps(&open_store(&location)?)?, 0);
        Ok(())
    }

    #[test]
    fn repeated_requests_leave_existing_rows_alone() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let db = dir.path().join("rsvp.db");
        let cmd = with_database(db.clone());

        let out = invoke(
            &cmd,
            "POST",
            "/rsvp",
            r#"{"name":"Ada","email":"ada@x.com","event":"Launch"}"#,
        )?;
        assert!(out.ends_with("RSVP added for Ada with ID 1"), "{out}");

        for _ in 0..3 {
            let out = invoke(&cmd, "DELETE", "/rsvp/abc", "")?;
            assert!(out.starts_with("Status: 400 Bad Request\n"), "{out}");
        }
        let out = invoke(&cmd, "DELETE", "/rsvp/99", "")?;
        assert!(out.starts_with("Status: 404 Not Found\n"), "{out}");

        let location = DatabaseLocation::new(db);
        assert_eq!(count_rsvps(&open_store(&location)?)?, 1);
        Ok(())
    }

    #[test]
    fn undecodable_requests_get_a_bad_request() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let db = dir.path().join("rsvp.db");
        let cmd = with_database(db.clone());

        let mut out = Vec::new();
        let vars = vec![
            ("REQUEST_METHOD".to_string(), "POST".to_string()),
            ("PATH_INFO".to_string(), "/rsvp".to_string()),
            ("CONTENT_LENGTH".to_string(), "abc".to_string()),
        ];
        cmd.handle(vars, &b"{}"[..], &mut out)?;
        let out = String::from_utf8(out)?;
        assert_eq!(
            out,
            "Status: 400 Bad Request\nContent-Type: text/plain; charset=utf-8\n\nBad Request"
        );

        let mut out = Vec::new();
        cmd.handle(Vec::<(String, String)>::new(), std::io::empty(), &mut out)?;
        let out = String::from_utf8(out)?;
        assert!(out.starts_with("Status: 400 Bad Request\n"), "{out}");

        // Rejected before the store is touched.
        assert!(!db.exists());
        Ok(())
    }

    #[test]
    fn broken_runtime_config_is_a_server_error() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let config = dir.path().join("runtime-config.toml");
        std::fs::write(&config, "[database]\nfile = \"rsvp.db\"\n")?;
        let cmd = WagiCommand {
            store: StoreOptions {
                runtime_config_file: Some(config),
                ..Default::default()
            },
        };

        let out = invoke(&cmd, "DELETE", "/rsvp/1", "")?;
        assert!(out.starts_with("Status: 500 Internal Server Error\n"), "{out}");
        assert!(out.ends_with("\n\nInternal Server Error"), "{out}");
        Ok(())
    }

    #[test]
    fn unusable_store_is_a_server_error() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        // A regular file where the database directory should be.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "")?;
        let cmd = with_database(blocker.join("rsvp.db"));

        let out = invoke(&cmd, "DELETE", "/rsvp/1", "")?;
        assert!(out.starts_with("Status: 500 Internal Server Error\n"), "{out}");
        assert!(out.ends_with("Database connection failed"), "{out}");

        let out = invoke(&cmd, "DELETE", "/rsvp/abc", "")?;
        assert!(out.starts_with("Status: 400 Bad Request\n"), "{out}");
        Ok(())
    }
}
