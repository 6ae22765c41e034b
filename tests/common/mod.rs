//! In-process HTTP stub of the Anosunu API for integration tests.
//!
//! Every connection is answered with `Connection: close`, so each request
//! arrives on its own socket. Requests are recorded for later assertions.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anosunu::{ApiClient, ClientConfig, Session, SessionContext};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct StubRequest {
    pub method: String,
    /// Path including the query string, with the `/api` prefix stripped.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl StubRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn is(&self, method: &str, path: &str) -> bool {
        self.method == method && self.path == path
    }
}

#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub body: String,
}

impl StubResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    /// 200 with the `{ "data": ... }` envelope.
    pub fn data(data: Value) -> Self {
        Self::json(200, serde_json::json!({ "data": data }))
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn not_found() -> Self {
        Self::json(404, serde_json::json!({ "message": "Not found" }))
    }
}

type Route = dyn Fn(&StubRequest) -> StubResponse + Send + Sync;

pub struct Stub {
    base_url: String,
    requests: Arc<Mutex<Vec<StubRequest>>>,
    task: JoinHandle<()>,
}

impl Stub {
    pub async fn start<F>(route: F) -> Self
    where
        F: Fn(&StubRequest) -> StubResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let route: Arc<Route> = Arc::new(route);

        let log = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let log = Arc::clone(&log);
                let route = Arc::clone(&route);
                tokio::spawn(async move {
                    let _ = handle(stream, log, route).await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}/api"),
            requests,
            task,
        }
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::default().with_api_url(self.base_url.clone()).unwrap()
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.config(), SessionContext::default()).unwrap()
    }

    pub fn client_with_token(&self, token: &str) -> ApiClient {
        let session = SessionContext::new(Session {
            token: Some(token.to_string()),
            user: None,
        });
        ApiClient::new(&self.config(), session).unwrap()
    }

    pub fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests().iter().filter(|r| r.is(method, path)).count()
    }
}

impl Drop for Stub {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(
    mut stream: TcpStream,
    log: Arc<Mutex<Vec<StubRequest>>>,
    route: Arc<Route>,
) -> std::io::Result<()> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    let (method, path, headers, header_len) = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);

        let mut raw_headers = [httparse::EMPTY_HEADER; 32];
        let mut req = httparse::Request::new(&mut raw_headers);
        match req.parse(&buf) {
            Ok(httparse::Status::Complete(len)) => {
                let headers: Vec<(String, String)> = req
                    .headers
                    .iter()
                    .map(|h| {
                        (
                            h.name.to_string(),
                            String::from_utf8_lossy(h.value).into_owned(),
                        )
                    })
                    .collect();
                break (
                    req.method.unwrap_or("GET").to_string(),
                    req.path.unwrap_or("/").to_string(),
                    headers,
                    len,
                );
            }
            Ok(httparse::Status::Partial) => continue,
            Err(_) => return Ok(()),
        }
    };

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_len + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = (header_len + content_length).min(buf.len());

    let request = StubRequest {
        method,
        path: path.strip_prefix("/api").unwrap_or(path.as_str()).to_string(),
        headers,
        body: buf[header_len..body_end].to_vec(),
    };
    let response = route(&request);
    log.lock().unwrap().push(request);

    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        reason(response.status),
        response.body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(response.body.as_bytes()).await?;
    stream.shutdown().await
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        _ => "Status",
    }
}
