use std::{future::Future, io, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use http::{header::CONTENT_TYPE, Request, Response, StatusCode};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::{
    body::{Bytes, Incoming},
    server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use rsvp_core::Reply;
use rsvp_http::{body, wagi, Routed, RsvpService};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream},
    task,
};
use tracing::Instrument;

use crate::{
    instrument::{finalize_http_span, http_span, MatchedRoute},
    Body, WELL_KNOWN_PREFIX,
};

/// Request bodies larger than this are rejected with `413 Payload Too Large`.
pub const MAX_BODY_SIZE: usize = 64 * 1024;

// Pause after a failed accept so a full descriptor table is not spun on.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// An HTTP server answering RSVP requests.
pub struct HttpServer {
    /// The address the server is listening on.
    listen_addr: SocketAddr,
    /// Routes requests into the store.
    service: Arc<RsvpService>,
}

impl HttpServer {
    /// Create a new [`HttpServer`].
    pub fn new(listen_addr: SocketAddr, service: RsvpService) -> Self {
        Self {
            listen_addr,
            service: Arc::new(service),
        }
    }

    /// Serve incoming requests until `shutdown` completes.
    pub async fn serve_until(
        self: Arc<Self>,
        shutdown: impl Future<Output = ()>,
    ) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.listen_addr).await.with_context(|| {
            format!(
                "Unable to listen on {listen_addr}",
                listen_addr = self.listen_addr
            )
        })?;
        self.serve_listener(listener, shutdown).await
    }

    /// Serve incoming requests over the provided [`TcpListener`] until
    /// `shutdown` completes.
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn serve_listener(
        self: Arc<Self>,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> anyhow::Result<()> {
        self.print_startup_msgs(&listener)?;
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    if !self.clone().accept_connection(accepted) {
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, no longer accepting connections");
                    return Ok(());
                }
            }
        }
    }

    /// Starts serving an accepted connection. A failed accept is logged and
    /// reported as `false`; the listener stays up.
    fn accept_connection(self: Arc<Self>, accepted: io::Result<(TcpStream, SocketAddr)>) -> bool {
        match accepted {
            Ok((stream, client_addr)) => {
                self.serve_connection(stream, client_addr);
                true
            }
            Err(err) => {
                tracing::warn!("Failed to accept connection: {err}");
                false
            }
        }
    }

    /// Handles a single request.
    ///
    /// Well known paths are answered directly; everything else is routed to
    /// the RSVP handlers on the blocking thread pool.
    pub async fn handle(&self, req: Request<Body>) -> anyhow::Result<Response<Body>> {
        let path = req.uri().path().to_string();

        tracing::info!("Processing request on path '{path}'");

        if let Some(well_known) = path.strip_prefix(WELL_KNOWN_PREFIX) {
            return match well_known {
                "health" => Ok(MatchedRoute::with_response_extension(
                    Response::new(body::full(Bytes::from_static(b"OK"))),
                    path,
                )),
                _ => reply_response(Reply::from_status(StatusCode::NOT_FOUND)),
            };
        }

        let (parts, body) = req.into_parts();
        let body = match Limited::new(body, MAX_BODY_SIZE).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.is::<LengthLimitError>() => {
                tracing::info!("Rejecting request body over {MAX_BODY_SIZE} bytes");
                return reply_response(Reply::from_status(StatusCode::PAYLOAD_TOO_LARGE));
            }
            Err(err) => return Err(anyhow::anyhow!(err).context("failed to read request body")),
        };

        let service = self.service.clone();
        let span = tracing::Span::current();
        let Routed { reply, route } = task::spawn_blocking(move || {
            span.in_scope(|| service.dispatch(&parts.method, &path, &body))
        })
        .await
        .context("request handler did not complete")?;

        let response = reply_response(reply)?;
        Ok(match route {
            Some(route) => MatchedRoute::with_response_extension(response, route),
            None => response,
        })
    }

    fn serve_connection<S: AsyncRead + AsyncWrite + Unpin + Send + 'static>(
        self: Arc<Self>,
        stream: S,
        client_addr: SocketAddr,
    ) {
        task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .keep_alive(true)
                .serve_connection(
                    TokioIo::new(stream),
                    service_fn(move |request| {
                        self.clone().instrumented_service_fn(client_addr, request)
                    }),
                )
                .await
            {
                tracing::warn!("Error serving HTTP connection: {err:?}");
            }
        });
    }

    async fn instrumented_service_fn(
        self: Arc<Self>,
        client_addr: SocketAddr,
        request: Request<Incoming>,
    ) -> anyhow::Result<Response<Body>> {
        let span = http_span!(request, client_addr);
        async {
            let result = self
                .handle(request.map(|body: Incoming| body.map_err(anyhow::Error::from).boxed()))
                .await;
            finalize_http_span(result)
        }
        .instrument(span)
        .await
    }

    fn print_startup_msgs(&self, listener: &TcpListener) -> anyhow::Result<()> {
        let local_addr = listener.local_addr()?;
        let base_url = format!("http://{local_addr:?}");
        println!("\nServing {base_url}");
        tracing::info!("Serving {base_url}");

        println!("Available Routes:");
        for (method, route) in self.service.router().routes() {
            println!("  {method}: {base_url}{route}");
        }
        Ok(())
    }
}

fn reply_response(reply: Reply) -> anyhow::Result<Response<Body>> {
    Ok(Response::builder()
        .status(reply.status)
        .header(CONTENT_TYPE, wagi::CONTENT_TYPE)
        .body(body::full(reply.body.into()))?)
}
