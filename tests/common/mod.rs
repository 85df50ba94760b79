//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fingerprint_gateway::config::GatewayConfig;
use fingerprint_gateway::{Handler, HandlerError, HandlerRequest, Handlers, HttpServer, Responder, Shutdown};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What a mock backend saw.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub method: String,
    pub target: String,
    pub body: String,
}

/// Read one HTTP/1.1 request (headers plus a Content-Length body).
async fn read_request(socket: &mut TcpStream) -> Option<BackendRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let end = buf.len().min(header_end + length);
    let body = String::from_utf8_lossy(&buf[header_end..end]).to_string();

    Some(BackendRequest { method, target, body })
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` maps each received request to `(status, content type, body)`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(BackendRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, &'static str, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                let (status, content_type, body) = f(request).await;
                let status_text = match status {
                    200 => "200 OK",
                    201 => "201 Created",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    content_type,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Mock backend that echoes each request back as JSON.
pub async fn start_echo_backend() -> SocketAddr {
    start_programmable_backend(|req: BackendRequest| async move {
        let body = json!({
            "method": req.method,
            "target": req.target,
            "body": req.body,
        });
        (200, "application/json", body.to_string())
    })
    .await
}

/// Gateway configuration suitable for tests: loopback, ephemeral port.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig {
        web_port: 0,
        bind_host: "127.0.0.1".into(),
        environment: "test".into(),
        ..GatewayConfig::default()
    };
    config.limits.request_timeout_ms = 5_000;
    config
}

/// A gateway serving on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Serve `handlers` with `config` in the background.
pub async fn start_gateway(config: GatewayConfig, handlers: Handlers) -> TestGateway {
    let listener = TcpListener::bind(config.bind_address()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, handlers);
    tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestGateway { addr, shutdown }
}

/// Answers every request with its operation and payload, and keeps a copy.
#[derive(Default)]
pub struct RecordingHandler {
    pub seen: Mutex<Vec<HandlerRequest>>,
}

impl RecordingHandler {
    pub fn requests(&self) -> Vec<HandlerRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Handler for RecordingHandler {
    async fn call(&self, request: HandlerRequest, responder: Responder) -> Result<(), HandlerError> {
        let body = json!({
            "operation": request.operation,
            "payload": request.payload.to_json(),
        });
        self.seen.lock().unwrap().push(request);
        responder.ok(body);
        Ok(())
    }
}

/// Holds on to the responder without answering.
#[derive(Default)]
pub struct StallingHandler {
    pub parked: Mutex<Option<Responder>>,
}

impl StallingHandler {
    pub fn parked(&self) -> Option<Responder> {
        self.parked.lock().unwrap().clone()
    }
}

#[async_trait]
impl Handler for StallingHandler {
    async fn call(&self, _: HandlerRequest, responder: Responder) -> Result<(), HandlerError> {
        *self.parked.lock().unwrap() = Some(responder);
        Ok(())
    }
}

/// Answers after a fixed delay, from a detached task.
pub struct DelayedHandler(pub Duration);

#[async_trait]
impl Handler for DelayedHandler {
    async fn call(&self, _: HandlerRequest, responder: Responder) -> Result<(), HandlerError> {
        let delay = self.0;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            responder.ok(json!({"late": false}));
        });
        Ok(())
    }
}

/// Fails without answering.
pub struct FailingHandler;

#[async_trait]
impl Handler for FailingHandler {
    async fn call(&self, _: HandlerRequest, _: Responder) -> Result<(), HandlerError> {
        Err(HandlerError::Internal("index offline".into()))
    }
}

/// Returns successfully without ever answering.
pub struct ForgetfulHandler;

#[async_trait]
impl Handler for ForgetfulHandler {
    async fn call(&self, _: HandlerRequest, _: Responder) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Panics while holding the responder.
pub struct PanickingHandler;

#[async_trait]
impl Handler for PanickingHandler {
    async fn call(&self, _: HandlerRequest, _: Responder) -> Result<(), HandlerError> {
        panic!("index corrupted");
    }
}
