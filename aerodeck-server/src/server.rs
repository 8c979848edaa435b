//! HTTP server implementation.

use crate::error::ServerError;
use crate::handler::{ApiHandler, ApiRequest, ApiResponse};
use crate::metrics::Metrics;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Metrics instance (if metrics are enabled).
    pub metrics: Option<Arc<Metrics>>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("max_connections", &self.max_connections)
            .field("metrics_enabled", &self.metrics.is_some())
            .finish()
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            max_body_bytes: 1024 * 1024,
            max_connections: 1000,
            metrics: None,
        }
    }

    /// Sets the request body limit.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Sets the metrics instance.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Returns whether metrics are enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics.is_some()
    }
}

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub requests_total: AtomicU64,
    pub errors_total: AtomicU64,
}

/// HTTP server for the aerodeck REST API.
pub struct Server {
    config: ServerConfig,
    handler: Arc<ApiHandler>,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
    running: AtomicBool,
}

impl Server {
    /// Creates a new server.
    pub fn new(config: ServerConfig, handler: ApiHandler) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let handler = match config.metrics {
            Some(ref metrics) => handler.with_metrics(metrics.clone()),
            None => handler,
        };
        Self {
            config,
            handler: Arc::new(handler),
            stats: Arc::new(ServerStats::default()),
            shutdown: shutdown_tx,
            running: AtomicBool::new(false),
        }
    }

    /// Binds the configured address and runs the server.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Runs the accept loop on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        self.running.store(true, Ordering::SeqCst);
        tracing::info!("Server listening on http://{}", listener.local_addr()?);

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((tcp_stream, addr)) => {
                            if self.stats.connections_active.load(Ordering::Relaxed)
                                >= self.config.max_connections as u64
                            {
                                tracing::warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
                            self.stats.connections_active.fetch_add(1, Ordering::Relaxed);
                            if let Some(ref metrics) = self.config.metrics {
                                metrics.connections_total.inc();
                                metrics.connections_active.inc();
                            }

                            let handler = self.handler.clone();
                            let stats = self.stats.clone();
                            let config = self.config.clone();
                            let conn_shutdown = self.shutdown.subscribe();

                            tokio::spawn(async move {
                                let result = Self::handle_connection(
                                    tcp_stream,
                                    handler,
                                    stats.clone(),
                                    config.max_body_bytes,
                                    conn_shutdown,
                                )
                                .await;

                                if let Err(e) = result {
                                    tracing::debug!("Connection {} error: {}", addr, e);
                                    stats.errors_total.fetch_add(1, Ordering::Relaxed);
                                }

                                stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                                if let Some(ref metrics) = config.metrics {
                                    metrics.connections_active.dec();
                                }
                                tracing::debug!("Client disconnected: {}", addr);
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Server shutting down");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Serves HTTP/1 requests on one connection until it closes or the
    /// server shuts down.
    async fn handle_connection(
        stream: TcpStream,
        handler: Arc<ApiHandler>,
        stats: Arc<ServerStats>,
        max_body_bytes: usize,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let service = service_fn(move |req| {
            stats.requests_total.fetch_add(1, Ordering::Relaxed);
            http_service(req, handler.clone(), max_body_bytes)
        });

        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result?,
            _ = shutdown.recv() => {
                conn.as_mut().graceful_shutdown();
                conn.await?;
            }
        }
        Ok(())
    }

    /// Signals the server to shut down.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// Returns a receiver that fires when the server shuts down.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }

    /// Returns whether the server is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns server statistics.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Returns the API handler.
    pub fn handler(&self) -> &Arc<ApiHandler> {
        &self.handler
    }
}

/// Reads the request body and runs the handler on the blocking pool.
async fn http_service(
    req: Request<Incoming>,
    handler: Arc<ApiHandler>,
    max_body_bytes: usize,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match Limited::new(body, max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            return Ok(reject(&handler, ServerError::BodyTooLarge(max_body_bytes)));
        }
        Err(e) => {
            return Ok(reject(
                &handler,
                ServerError::InvalidRequest(format!("failed to read body: {}", e)),
            ));
        }
    };

    let request = ApiRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        body,
    };

    let blocking = handler.clone();
    let response = match tokio::task::spawn_blocking(move || blocking.handle(&request)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Request handler panicked: {}", e);
            return Ok(reject(
                &handler,
                ServerError::Internal("request handler failed".to_string()),
            ));
        }
    };

    Ok(into_http(response))
}

/// Builds the response for a request rejected before reaching the handler.
fn reject(handler: &ApiHandler, error: ServerError) -> Response<Full<Bytes>> {
    tracing::debug!("Rejected request: {}", error);
    if let Some(metrics) = handler.metrics() {
        metrics
            .errors_total
            .with_label_values(&[error.error_code()])
            .inc();
    }
    into_http(ApiResponse::error(&error))
}

fn into_http(response: ApiResponse) -> Response<Full<Bytes>> {
    let has_body = response.has_body();
    let mut http = Response::new(Full::new(response.body));
    *http.status_mut() = response.status;
    if has_body {
        http.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    http
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerodeck_cluster::MemoryCluster;
    use aerodeck_core::ConnectionManager;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn start_server(config: ServerConfig) -> (Arc<Server>, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let connections = Arc::new(ConnectionManager::new(Arc::new(MemoryCluster::default())));
        let server = Arc::new(Server::new(config, ApiHandler::new(connections)));
        let running = server.clone();
        tokio::spawn(async move { running.serve(listener).await });
        (server, addr)
    }

    async fn send(addr: SocketAddr, request: String) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    fn post(path: &str, body: &str) -> String {
        format!(
            "POST {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
             Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            path,
            body.len(),
            body
        )
    }

    fn get(path: &str) -> String {
        format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        )
    }

    #[test]
    fn test_server_config() {
        let config = ServerConfig::new("127.0.0.1:8080".parse().unwrap()).with_max_body_bytes(16);
        assert_eq!(config.max_body_bytes, 16);
        assert!(!config.metrics_enabled());
    }

    #[tokio::test]
    async fn test_health_and_connect_over_http() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let config =
            ServerConfig::new("127.0.0.1:0".parse().unwrap()).with_metrics(metrics.clone());
        let (server, addr) = start_server(config).await;

        let response = send(addr, get("/health")).await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("application/json"));
        assert!(response.contains("\"connected\":false"));

        let response = send(addr, post("/api/connect", r#"{"host":"localhost","port":3000}"#)).await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("\"connected\":true"));
        assert!(server.handler().connections().is_connected());

        let response = send(addr, get("/api/namespaces/test/sets")).await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));

        assert!(server.is_running());
        assert!(server.stats().connections_total.load(Ordering::Relaxed) >= 3);
        assert!(metrics.connections_total.get() >= 3.0);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap()).with_max_body_bytes(8);
        let (server, addr) = start_server(config).await;

        let response = send(addr, post("/api/records", r#"{"namespace":"test"}"#)).await;
        assert!(response.starts_with("HTTP/1.1 413"));
        assert!(response.contains("PAYLOAD_TOO_LARGE"));

        server.shutdown();
    }

    #[tokio::test]
    async fn test_not_connected_over_http() {
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap());
        let (server, addr) = start_server(config).await;

        let response = send(addr, get("/api/records/scan?namespace=test")).await;
        assert!(response.starts_with("HTTP/1.1 503"));
        assert!(response.contains("NOT_CONNECTED"));

        server.shutdown();
    }
}
