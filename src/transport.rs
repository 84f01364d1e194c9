//! HTTP GET capability shared by the retrieval tiers and the relay.

use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// Raw payload as received; the relay forwards it untouched.
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, invalid sequences replaced with U+FFFD.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("domain not found: {0}")]
    DnsFailure(String),
    #[error("connection refused: {0}")]
    ConnectionRefused(String),
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport with one explicit timeout for every request.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {}", error_chain_text(&e))))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            return TransportError::Timeout(self.timeout);
        }
        let chain = error_chain_text(&err);
        let lower = chain.to_lowercase();
        if lower.contains("dns error") || lower.contains("failed to lookup") || lower.contains("name or service not known") {
            TransportError::DnsFailure(chain)
        } else if lower.contains("connection refused") {
            TransportError::ConnectionRefused(chain)
        } else {
            TransportError::Other(chain)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<TransportResponse, TransportError> {
        let mut req = self.client.get(url);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let resp = req.send().await.map_err(|e| self.classify(e))?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await.map_err(|e| self.classify(e))?.to_vec();
        Ok(TransportResponse { status, content_type, body })
    }
}

// reqwest hides the interesting part (hyper/io errors) behind `source()`
fn error_chain_text(err: &reqwest::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text
}
