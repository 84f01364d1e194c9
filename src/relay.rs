//! Same-origin relay: fetches a target URL server-side on behalf of clients
//! that cannot reach it directly.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use serde_json::json;
use tracing::{error, info};
use url::Url;

use crate::strategy::ACCEPT_JSON;
use crate::transport::{Transport, TransportError};

pub const RELAY_PATH: &str = "/api/proxy";
const USER_AGENT: &str = "JSON-Formatter/1.0";

#[derive(Clone)]
pub struct RelayState {
    pub transport: Arc<dyn Transport>,
}

pub fn router(state: RelayState) -> Router {
    Router::new().route(RELAY_PATH, any(proxy)).with_state(state)
}

pub async fn serve(bind: &str, state: RelayState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, path = RELAY_PATH, "relay listening");
    axum::serve(listener, router(state)).await
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Check the `url` parameter the same way clients do before fetching.
pub fn validate_target(raw: Option<&str>) -> Result<Url, Response> {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return Err(error_body(StatusCode::BAD_REQUEST, "URL parameter is required"));
    };
    let url = Url::parse(raw).map_err(|_| error_body(StatusCode::BAD_REQUEST, "Invalid URL format"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(error_body(StatusCode::BAD_REQUEST, "Invalid URL protocol"));
    }
    Ok(url)
}

/// Message reported to the client when the upstream request itself failed.
pub fn classify_failure(err: &TransportError) -> String {
    match err {
        TransportError::Timeout(d) => format!("Request timeout ({} seconds)", d.as_secs()),
        TransportError::DnsFailure(_) => "Domain not found".into(),
        TransportError::ConnectionRefused(_) => "Connection refused".into(),
        TransportError::Other(text) => text.clone(),
    }
}

pub async fn proxy(
    method: Method,
    State(state): State<RelayState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if method != Method::GET {
        return error_body(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    }
    let target = match validate_target(params.get("url").map(String::as_str)) {
        Ok(url) => url,
        Err(resp) => return resp,
    };

    info!(url = %target, "relaying");
    let headers = [
        ("User-Agent", USER_AGENT),
        ("Accept", ACCEPT_JSON),
        ("Accept-Language", "en-US,en;q=0.9"),
    ];
    let upstream = match state.transport.get(target.as_str(), &headers).await {
        Ok(resp) => resp,
        Err(e) => {
            error!(url = %target, error = %e, "relay request failed");
            return error_body(StatusCode::INTERNAL_SERVER_ERROR, classify_failure(&e));
        }
    };

    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    if !status.is_success() {
        error!(url = %target, status = upstream.status, "upstream returned an error status");
        let reason = status.canonical_reason().unwrap_or("Unknown");
        return error_body(status, format!("HTTP {}: {}", status.as_u16(), reason));
    }

    let content_type = upstream
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("text/plain"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
            (header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET")),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type")),
        ],
        // raw bytes, so non-UTF-8 payloads pass through unchanged
        upstream.body,
    )
        .into_response()
}
