use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Slowest allowed round trip to the backend. Transport failures past this point
/// surface as a fetch_failed envelope, never a hung client.
pub const PROXY_TIMEOUT: Duration = Duration::from_secs(30);

pub const PROXY_USER_AGENT: &str = "rialto-proxy/1.0";

/// Envelope accepted by `/api_proxy`. Every field can arrive in the JSON body, an
/// urlencoded form body, or the query string; body parameters win over form
/// parameters, which win over the query.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ProxyRequest {
    pub endpoint: Option<String>,
    pub method: Option<String>,
    pub data: Option<String>,
    pub token: Option<String>,
}

impl ProxyRequest {
    /// Field-wise merge, keeping values already present on `self`.
    pub fn or(self, fallback: ProxyRequest) -> ProxyRequest {
        ProxyRequest {
            endpoint: self.endpoint.or(fallback.endpoint),
            method: self.method.or(fallback.method),
            data: self.data.or(fallback.data),
            token: self.token.or(fallback.token),
        }
    }
}

pub struct ProxyState {
    pub backend_url: String,
    pub client: reqwest::Client,
}

impl ProxyState {
    pub fn new(backend_url: impl Into<String>) -> Self {
        let backend_url = backend_url.into().trim_end_matches('/').to_string();
        Self {
            backend_url,
            client: reqwest::Client::builder()
                .timeout(PROXY_TIMEOUT)
                .build()
                .expect("reqwest client builds with static configuration"),
        }
    }

    /// Backend base URL from `RIALTO_BACKEND_URL`, including the API prefix.
    pub fn from_env() -> Self {
        let backend_url = std::env::var("RIALTO_BACKEND_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080/api".to_string());
        Self::new(backend_url)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ProxyV1Error {
    MissingEndpoint,
    InvalidEndpoint,
    InvalidMethod,
    FetchFailed,
}

impl ProxyV1Error {
    pub fn proxy_status(&self) -> &'static str {
        match self {
            ProxyV1Error::MissingEndpoint => "missing_endpoint",
            ProxyV1Error::InvalidEndpoint => "invalid_endpoint",
            ProxyV1Error::InvalidMethod => "invalid_method",
            ProxyV1Error::FetchFailed => "fetch_failed",
        }
    }
}

impl std::error::Error for ProxyV1Error {}

impl core::fmt::Display for ProxyV1Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProxyV1Error::MissingEndpoint => {
                write!(f, "No endpoint specified. Use ?endpoint=auth/login")
            }
            ProxyV1Error::InvalidEndpoint => write!(f, "Endpoint escapes the API namespace"),
            ProxyV1Error::InvalidMethod => write!(f, "Unsupported method"),
            ProxyV1Error::FetchFailed => write!(f, "Backend request failed"),
        }
    }
}

impl actix_web::ResponseError for ProxyV1Error {
    fn status_code(&self) -> actix_web::http::StatusCode {
        match self {
            ProxyV1Error::MissingEndpoint
            | ProxyV1Error::InvalidEndpoint
            | ProxyV1Error::InvalidMethod => actix_web::http::StatusCode::BAD_REQUEST,
            ProxyV1Error::FetchFailed => actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        actix_web::HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
            "proxy_status": self.proxy_status(),
        }))
    }
}

/// Validates that an endpoint stays inside the backend API namespace and returns
/// it without a leading slash, ready to append to the base URL. Absolute URLs,
/// `..` segments and backslashes are rejected before any outbound call.
pub fn validate_endpoint(raw: &str) -> Result<String, ProxyV1Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ProxyV1Error::MissingEndpoint);
    }
    if trimmed.contains("://") || trimmed.starts_with("//") || trimmed.contains('\\') {
        return Err(ProxyV1Error::InvalidEndpoint);
    }
    let path = trimmed.split('?').next().unwrap_or(trimmed);
    if path.split('/').any(|segment| segment == "..") {
        return Err(ProxyV1Error::InvalidEndpoint);
    }
    Ok(trimmed.trim_start_matches('/').to_string())
}

pub fn parse_method(raw: Option<&str>) -> Result<reqwest::Method, ProxyV1Error> {
    let raw = match raw {
        None => return Ok(reqwest::Method::GET),
        Some(raw) => raw,
    };
    match raw.to_ascii_uppercase().as_str() {
        "" | "GET" => Ok(reqwest::Method::GET),
        "POST" => Ok(reqwest::Method::POST),
        "PUT" => Ok(reqwest::Method::PUT),
        "DELETE" => Ok(reqwest::Method::DELETE),
        _ => Err(ProxyV1Error::InvalidMethod),
    }
}

pub fn normalize_bearer(raw: &str) -> String {
    if raw.starts_with("Bearer ") {
        raw.to_string()
    } else {
        format!("Bearer {raw}")
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub proxy: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            proxy: PROXY_USER_AGENT.to_string(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

pub mod server {
    use actix_web::http::header;
    use actix_web::{get, route, web, HttpRequest, HttpResponse};

    use super::{
        normalize_bearer, parse_method, validate_endpoint, HealthResponse, ProxyRequest,
        ProxyState, ProxyV1Error,
    };

    fn inbound_params(req: &HttpRequest, body: &web::Bytes) -> ProxyRequest {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        let mut params = ProxyRequest::default();
        if content_type.starts_with("application/json") {
            if let Ok(body_params) = serde_json::from_slice::<ProxyRequest>(body) {
                params = params.or(body_params);
            }
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            if let Ok(form_params) = serde_urlencoded::from_bytes::<ProxyRequest>(body) {
                params = params.or(form_params);
            }
        }
        if let Ok(query_params) = serde_urlencoded::from_str::<ProxyRequest>(req.query_string()) {
            params = params.or(query_params);
        }
        params
    }

    async fn forward_to_backend(
        state: &ProxyState,
        method: reqwest::Method,
        endpoint: &str,
        token: Option<String>,
        data: Option<String>,
    ) -> Result<HttpResponse, ProxyV1Error> {
        let target = format!("{}/{}", state.backend_url, endpoint);
        log::info!("proxy: {method} {endpoint}");

        let mut outbound = state
            .client
            .request(method.clone(), &target)
            .header(header::CONTENT_TYPE.as_str(), "application/json")
            .header(header::ACCEPT.as_str(), "application/json")
            .header(header::USER_AGENT.as_str(), super::PROXY_USER_AGENT);

        if let Some(token) = token {
            outbound = outbound.header(header::AUTHORIZATION.as_str(), normalize_bearer(&token));
        }
        // GET and DELETE never carry a body
        if matches!(method, reqwest::Method::POST | reqwest::Method::PUT) {
            if let Some(data) = data {
                outbound = outbound.body(data);
            }
        }

        let response = match outbound.send().await {
            Ok(response) => response,
            Err(err) => {
                // Diagnostics stay in the log, the response body carries only the
                // error envelope
                log::error!("proxy fetch failed: {method} {endpoint} via {target}: {err}");
                return Err(ProxyV1Error::FetchFailed);
            }
        };

        let status = actix_web::http::StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                log::error!("proxy read failed: {method} {endpoint} via {target}: {err}");
                return Err(ProxyV1Error::FetchFailed);
            }
        };

        // JSON passthrough when the upstream body parses, raw text otherwise
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(json) => Ok(HttpResponse::build(status).json(json)),
            Err(_) => Ok(HttpResponse::build(status).body(text)),
        }
    }

    /// Envelope mode: the target endpoint, method, body and token arrive as
    /// parameters and the outbound method defaults to GET.
    #[route(
        "/api_proxy",
        method = "GET",
        method = "POST",
        method = "PUT",
        method = "DELETE"
    )]
    pub async fn forward(
        req: HttpRequest,
        body: web::Bytes,
        state: web::Data<ProxyState>,
    ) -> Result<HttpResponse, ProxyV1Error> {
        let params = inbound_params(&req, &body);

        let endpoint = validate_endpoint(params.endpoint.as_deref().unwrap_or(""))?;
        let method = parse_method(params.method.as_deref())?;
        let token = params.token.or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(String::from)
        });

        forward_to_backend(&state, method, &endpoint, token, params.data).await
    }

    /// Path-tail mode: `/api_proxy/auth/login` forwards the inbound method, body
    /// and query string as-is.
    #[route(
        "/api_proxy/{endpoint:.*}",
        method = "GET",
        method = "POST",
        method = "PUT",
        method = "DELETE"
    )]
    pub async fn forward_path(
        req: HttpRequest,
        path: web::Path<(String,)>,
        body: web::Bytes,
        state: web::Data<ProxyState>,
    ) -> Result<HttpResponse, ProxyV1Error> {
        let (tail,) = path.into_inner();
        let mut endpoint = validate_endpoint(&tail)?;
        if !req.query_string().is_empty() {
            endpoint = format!("{endpoint}?{}", req.query_string());
        }

        let method = parse_method(Some(req.method().as_str()))?;
        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let data = if body.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&body).to_string())
        };

        forward_to_backend(&state, method, &endpoint, token, data).await
    }

    #[get("/health")]
    pub async fn health() -> web::Json<HealthResponse> {
        web::Json(HealthResponse::healthy())
    }

    /// JSON 404 listing the routes the proxy answers, mirroring the behavior
    /// dashboards already depend on for debugging.
    pub async fn not_found(req: HttpRequest) -> HttpResponse {
        HttpResponse::NotFound().json(serde_json::json!({
            "error": "Route not found",
            "url": req.uri().to_string(),
            "method": req.method().as_str(),
            "available_routes": [
                "/api_proxy - Main API Proxy",
                "/health - Health Check",
            ],
        }))
    }
}
