//! REST request handling.
//!
//! `ApiHandler` is transport independent: it takes an [`ApiRequest`] and
//! produces an [`ApiResponse`]. All calls into the core block, so the HTTP
//! layer runs `handle` on the blocking thread pool.

use crate::error::{ErrorBody, ServerError};
use crate::metrics::Metrics;
use aerodeck_core::{
    CatalogService, ConnectRequest, ConnectionManager, RecordEnvelope, RecordStore,
    ScanSearchEngine, SearchQuery,
};
use hyper::body::Bytes;
use hyper::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::borrow::Cow;
use std::sync::Arc;

/// Health check path, served outside the API prefix.
pub const HEALTH_PATH: &str = "/health";

/// Default `maxRecords` of a scan request.
pub const DEFAULT_SCAN_MAX_RECORDS: u64 = 100;

/// Query parameters of `GET /records/scan`.
#[derive(Debug, Deserialize)]
struct ScanParams {
    #[serde(default)]
    namespace: String,
    #[serde(rename = "setName", default)]
    set_name: String,
    #[serde(rename = "maxRecords", default = "default_scan_max_records")]
    max_records: u64,
}

fn default_scan_max_records() -> u64 {
    DEFAULT_SCAN_MAX_RECORDS
}

/// An API request, decoupled from the HTTP transport.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Raw (percent-encoded) path.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    pub body: Bytes,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            body: Bytes::new(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body.
    pub fn with_json(self, body: &serde_json::Value) -> Self {
        let bytes = body.to_string().into_bytes();
        self.with_body(bytes)
    }
}

/// An API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ApiResponse {
    /// A JSON response.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Self, ServerError> {
        Ok(Self {
            status,
            body: Bytes::from(serde_json::to_vec(value)?),
        })
    }

    /// A response without a body.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: Bytes::new(),
        }
    }

    /// The response for a failed request.
    pub fn error(error: &ServerError) -> Self {
        Self::error_body(error.status(), &ErrorBody::from(error))
    }

    fn error_body(status: StatusCode, body: &ErrorBody) -> Self {
        Self {
            status,
            body: Bytes::from(serde_json::to_vec(body).unwrap_or_default()),
        }
    }

    /// Returns whether the response carries a body.
    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }

    /// Parses the body as JSON.
    pub fn json_body(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// A resolved API route.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Health,
    Connect,
    Disconnect,
    ClusterInfo,
    Namespaces,
    Sets { namespace: String },
    Scan,
    Search,
    PutRecord,
    GetRecord { namespace: String, set: String, key: String },
    DeleteRecord { namespace: String, set: String, key: String },
}

impl Route {
    /// Returns the route label used in metrics.
    fn name(&self) -> &'static str {
        match self {
            Route::Health => "health",
            Route::Connect => "connect",
            Route::Disconnect => "disconnect",
            Route::ClusterInfo => "cluster_info",
            Route::Namespaces => "namespaces",
            Route::Sets { .. } => "sets",
            Route::Scan => "scan",
            Route::Search => "search",
            Route::PutRecord => "put_record",
            Route::GetRecord { .. } => "get_record",
            Route::DeleteRecord { .. } => "delete_record",
        }
    }
}

/// REST API handler.
pub struct ApiHandler {
    connections: Arc<ConnectionManager>,
    catalog: CatalogService,
    records: RecordStore,
    search: ScanSearchEngine,
    /// Path prefix of every API route.
    api_prefix: String,
    /// Metrics for request tracking.
    metrics: Option<Arc<Metrics>>,
}

impl ApiHandler {
    /// Creates a handler mounted under `/api`.
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self {
            catalog: CatalogService::new(connections.clone()),
            records: RecordStore::new(connections.clone()),
            search: ScanSearchEngine::new(connections.clone()),
            connections,
            api_prefix: "/api".to_string(),
            metrics: None,
        }
    }

    /// Sets the path prefix.
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Sets whether written records carry their user key.
    pub fn with_send_key(mut self, send_key: bool) -> Self {
        self.records = RecordStore::new(self.connections.clone()).with_send_key(send_key);
        self
    }

    /// Sets the metrics instance.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Returns the connection manager.
    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    /// Returns a reference to the metrics, if set.
    pub fn metrics(&self) -> Option<&Arc<Metrics>> {
        self.metrics.as_ref()
    }

    /// Handles a request and returns a response.
    pub fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let route = self.resolve(&request.method, &request.path);
        let route_name = route.as_ref().map(Route::name).unwrap_or("unmatched");

        let timer = self.metrics.as_ref().map(|m| {
            m.request_duration
                .with_label_values(&[route_name])
                .start_timer()
        });

        let result = route.and_then(|route| self.dispatch(&route, request));

        if let Some(ref metrics) = self.metrics {
            metrics.requests_total.with_label_values(&[route_name]).inc();
            if let Err(ref e) = result {
                metrics.errors_total.with_label_values(&[e.error_code()]).inc();
            }
        }
        drop(timer);

        match result {
            Ok(response) => response,
            Err(e) => {
                if e.is_client_error() {
                    tracing::debug!("{} {} rejected: {}", request.method, request.path, e);
                } else {
                    tracing::warn!("{} {} failed: {}", request.method, request.path, e);
                }
                ApiResponse::error(&e)
            }
        }
    }

    /// Maps method and path to a route.
    fn resolve(&self, method: &Method, path: &str) -> Result<Route, ServerError> {
        let not_found = || ServerError::NotFound(path.to_string());
        let not_allowed = || ServerError::MethodNotAllowed {
            method: method.to_string(),
            path: path.to_string(),
        };

        if path == HEALTH_PATH {
            return match *method {
                Method::GET => Ok(Route::Health),
                _ => Err(not_allowed()),
            };
        }

        let rest = path
            .strip_prefix(self.api_prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(not_found)?;
        let segments = rest
            .split('/')
            .map(|segment| urlencoding::decode(segment).map(Cow::into_owned))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ServerError::InvalidRequest(format!("invalid path {}: {}", path, e)))?;
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        let route = match (method, segments.as_slice()) {
            (&Method::POST, ["connect"]) => Route::Connect,
            (&Method::POST, ["disconnect"]) => Route::Disconnect,
            (&Method::GET, ["cluster-info"]) => Route::ClusterInfo,
            (&Method::GET, ["namespaces"]) => Route::Namespaces,
            (&Method::GET, ["namespaces", namespace, "sets"]) => Route::Sets {
                namespace: namespace.to_string(),
            },
            (&Method::GET, ["records", "scan"]) => Route::Scan,
            (&Method::POST, ["records", "search"]) => Route::Search,
            (&Method::POST, ["records"]) => Route::PutRecord,
            (&Method::GET, ["records", namespace, set, key]) => Route::GetRecord {
                namespace: namespace.to_string(),
                set: set.to_string(),
                key: key.to_string(),
            },
            (&Method::DELETE, ["records", namespace, set, key]) => Route::DeleteRecord {
                namespace: namespace.to_string(),
                set: set.to_string(),
                key: key.to_string(),
            },
            (_, ["connect"])
            | (_, ["disconnect"])
            | (_, ["cluster-info"])
            | (_, ["namespaces"])
            | (_, ["namespaces", _, "sets"])
            | (_, ["records"])
            | (_, ["records", "scan"])
            | (_, ["records", "search"])
            | (_, ["records", _, _, _]) => return Err(not_allowed()),
            _ => return Err(not_found()),
        };
        Ok(route)
    }

    fn dispatch(&self, route: &Route, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
        match route {
            Route::Health => self.handle_health(),
            Route::Connect => self.handle_connect(request),
            Route::Disconnect => self.handle_disconnect(),
            Route::ClusterInfo => self.handle_cluster_info(),
            Route::Namespaces => {
                ApiResponse::json(StatusCode::OK, &self.catalog.list_namespaces()?)
            }
            Route::Sets { namespace } => {
                ApiResponse::json(StatusCode::OK, &self.catalog.list_sets(namespace)?)
            }
            Route::Scan => self.handle_scan(request),
            Route::Search => self.handle_search(request),
            Route::PutRecord => self.handle_put_record(request),
            Route::GetRecord {
                namespace,
                set,
                key,
            } => match self.records.get(namespace, set, key)? {
                Some(envelope) => ApiResponse::json(StatusCode::OK, &envelope),
                None => Ok(record_not_found(namespace, set, key)),
            },
            Route::DeleteRecord {
                namespace,
                set,
                key,
            } => {
                let deleted = self.records.delete(namespace, set, key)?;
                ApiResponse::json(StatusCode::OK, &json!({ "deleted": deleted }))
            }
        }
    }

    fn handle_health(&self) -> Result<ApiResponse, ServerError> {
        ApiResponse::json(
            StatusCode::OK,
            &json!({
                "status": "ok",
                "connected": self.connections.is_connected(),
            }),
        )
    }

    fn handle_connect(&self, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
        let connect: ConnectRequest = if request.body.iter().all(u8::is_ascii_whitespace) {
            ConnectRequest::default()
        } else {
            parse_body(request)?
        };

        let status = self.connections.connect(&connect);
        self.update_session_gauge();
        ApiResponse::json(StatusCode::OK, &status)
    }

    fn handle_disconnect(&self) -> Result<ApiResponse, ServerError> {
        self.connections.disconnect();
        self.update_session_gauge();
        Ok(ApiResponse::empty(StatusCode::OK))
    }

    fn handle_cluster_info(&self) -> Result<ApiResponse, ServerError> {
        let status = self.connections.status();
        self.update_session_gauge();
        ApiResponse::json(StatusCode::OK, &status)
    }

    fn handle_scan(&self, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
        let query = request.query.as_deref().unwrap_or_default();
        let params: ScanParams = serde_urlencoded::from_str(query)
            .map_err(|e| ServerError::InvalidRequest(format!("invalid scan query: {}", e)))?;
        if params.namespace.is_empty() {
            return Err(ServerError::InvalidRequest("namespace is required".to_string()));
        }

        let records = self
            .search
            .scan(&params.namespace, &params.set_name, params.max_records)?;
        self.count_returned(records.len());
        ApiResponse::json(StatusCode::OK, &records)
    }

    fn handle_search(&self, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
        let query: SearchQuery = parse_body(request)?;
        let records = self.search.search(&query)?;
        self.count_returned(records.len());
        ApiResponse::json(StatusCode::OK, &records)
    }

    fn handle_put_record(&self, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
        let envelope: RecordEnvelope = parse_body(request)?;
        match self.records.put(envelope)? {
            Some(persisted) => ApiResponse::json(StatusCode::OK, &persisted),
            // Null-only bins leave nothing stored; the write itself succeeded.
            None => Ok(ApiResponse::empty(StatusCode::OK)),
        }
    }

    fn update_session_gauge(&self) {
        if let Some(ref metrics) = self.metrics {
            let live = if self.connections.is_connected() { 1.0 } else { 0.0 };
            metrics.session_active.set(live);
        }
    }

    fn count_returned(&self, count: usize) {
        if let Some(ref metrics) = self.metrics {
            metrics.records_returned_total.inc_by(count as f64);
        }
    }
}

fn record_not_found(namespace: &str, set: &str, key: &str) -> ApiResponse {
    ApiResponse::error_body(
        StatusCode::NOT_FOUND,
        &ErrorBody {
            error: format!("record not found: {}/{}/{}", namespace, set, key),
            code: "NOT_FOUND".to_string(),
        },
    )
}

fn parse_body<T: DeserializeOwned>(request: &ApiRequest) -> Result<T, ServerError> {
    if request.body.is_empty() {
        return Err(ServerError::InvalidRequest(
            "request body is required".to_string(),
        ));
    }
    Ok(serde_json::from_slice(&request.body)?)
}
