use std::{net::SocketAddr, sync::Arc};

use http::{header::HOST, Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_util::rt::TokioIo;
use rsvp_http::RsvpService;
use rsvp_model::{count_rsvps, create_store, open_store, DatabaseLocation};
use rsvp_trigger_http::HttpServer;
use tempfile::TempDir;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::oneshot,
    task::JoinHandle,
};

struct RunningServer {
    _dir: TempDir,
    location: DatabaseLocation,
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    serving: JoinHandle<anyhow::Result<()>>,
}

impl RunningServer {
    async fn start() -> anyhow::Result<Self> {
        let dir = TempDir::new()?;
        let location = DatabaseLocation::new(dir.path().join("rsvp.db"));
        create_store(&location)?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = Arc::new(HttpServer::new(addr, RsvpService::new(location.clone())?));
        let (stop, stopped) = oneshot::channel::<()>();
        let serving = tokio::spawn(server.serve_listener(listener, async {
            let _ = stopped.await;
        }));

        Ok(Self {
            _dir: dir,
            location,
            addr,
            stop,
            serving,
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: &'static str,
    ) -> anyhow::Result<(StatusCode, String)> {
        let stream = TcpStream::connect(self.addr).await?;
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(conn);

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header(HOST, self.addr.to_string())
            .body(Full::new(Bytes::from_static(body.as_bytes())))?;
        let resp = sender.send_request(req).await?;
        let status = resp.status();
        let body = resp.into_body().collect().await?.to_bytes();
        Ok((status, String::from_utf8(body.to_vec())?))
    }

    fn count(&self) -> anyhow::Result<i64> {
        Ok(count_rsvps(&open_store(&self.location)?)?)
    }

    async fn stop(self) -> anyhow::Result<()> {
        let _ = self.stop.send(());
        self.serving.await?
    }
}

#[tokio::test]
async fn create_then_delete_over_http() -> anyhow::Result<()> {
    let server = RunningServer::start().await?;

    let (status, body) = server
        .send(
            Method::POST,
            "/rsvp",
            r#"{"name":"Ada","email":"ada@x.com","event":"Launch"}"#,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Ada"), "{body}");
    assert_eq!(server.count()?, 1);

    let (status, body) = server.send(Method::DELETE, "/rsvp/1", "").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains('1'), "{body}");
    assert_eq!(server.count()?, 0);

    let (status, body) = server.send(Method::DELETE, "/rsvp/1", "").await?;
    assert_eq!((status, body.as_str()), (StatusCode::NOT_FOUND, "RSVP not found"));

    server.stop().await
}

#[tokio::test]
async fn invalid_requests_over_http() -> anyhow::Result<()> {
    let server = RunningServer::start().await?;

    let (status, _) = server.send(Method::POST, "/rsvp", "not json").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.send(Method::DELETE, "/rsvp/abc", "").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.send(Method::DELETE, "/rsvp/999999", "").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.send(Method::PUT, "/rsvp/1", "").await?;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, body) = server
        .send(Method::GET, "/.well-known/rsvp/health", "")
        .await?;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "OK"));

    assert_eq!(server.count()?, 0);
    server.stop().await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_deletes_over_http() -> anyhow::Result<()> {
    let server = RunningServer::start().await?;
    server
        .send(
            Method::POST,
            "/rsvp",
            r#"{"name":"Ada","email":"ada@x.com","event":"Launch"}"#,
        )
        .await?;

    let (first, second) = tokio::join!(
        server.send(Method::DELETE, "/rsvp/1", ""),
        server.send(Method::DELETE, "/rsvp/1", ""),
    );
    let mut statuses = [first?.0, second?.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::NOT_FOUND]);

    server.stop().await
}
