//! The retrieval tiers. Each one tries to obtain the body behind a URL and
//! reports a human-readable reason when it cannot.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::transport::{Transport, TransportError};

pub const ACCEPT_JSON: &str = "application/json, text/plain, */*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tier", content = "name", rename_all = "snake_case")]
pub enum StrategyId {
    Direct,
    Relay,
    ThirdParty(String),
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyId::Direct => write!(f, "direct"),
            StrategyId::Relay => write!(f, "relay"),
            StrategyId::ThirdParty(name) => write!(f, "third-party ({name})"),
        }
    }
}

#[async_trait]
pub trait Strategy: Send + Sync {
    fn id(&self) -> StrategyId;

    /// Fetch the body behind `url`, or a reason for failing.
    async fn attempt(&self, url: &Url) -> Result<String, String>;
}

/// Request the target straight from this process.
pub struct DirectStrategy {
    transport: Arc<dyn Transport>,
}

impl DirectStrategy {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl Strategy for DirectStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Direct
    }

    async fn attempt(&self, url: &Url) -> Result<String, String> {
        let resp = self
            .transport
            .get(url.as_str(), &[("Accept", ACCEPT_JSON)])
            .await
            .map_err(|e| match e {
                TransportError::Timeout(d) => format!("Request timeout ({} seconds)", d.as_secs()),
                _ => "cross-origin or network failure".to_string(),
            })?;
        if !resp.is_success() {
            return Err(format!("HTTP {}", resp.status));
        }
        Ok(resp.text())
    }
}

/// Go through the first-party relay, which fetches the target server-side.
pub struct RelayStrategy {
    transport: Arc<dyn Transport>,
    endpoint: String,
}

impl RelayStrategy {
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self { transport, endpoint: endpoint.into() }
    }
}

#[derive(Deserialize)]
struct RelayErrorBody {
    error: String,
}

#[async_trait]
impl Strategy for RelayStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Relay
    }

    async fn attempt(&self, url: &Url) -> Result<String, String> {
        let relay_url = Url::parse_with_params(&self.endpoint, &[("url", url.as_str())])
            .map_err(|e| format!("Invalid relay endpoint {}: {e}", self.endpoint))?;
        let resp = self
            .transport
            .get(relay_url.as_str(), &[("Accept", ACCEPT_JSON)])
            .await
            .map_err(|e| e.to_string())?;
        if !resp.is_success() {
            return Err(match serde_json::from_slice::<RelayErrorBody>(&resp.body) {
                Ok(body) if !body.error.is_empty() => body.error,
                _ => format!("Proxy error: {}", resp.status),
            });
        }
        Ok(resp.text())
    }
}

/// An external passthrough service. The target URL is percent-encoded and
/// appended to `endpoint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThirdPartyService {
    pub name: String,
    pub endpoint: String,
    /// The service answers `{"contents": "<body>", ...}` instead of the raw body.
    #[serde(default)]
    pub envelope: bool,
}

impl ThirdPartyService {
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                name: "allorigins".into(),
                endpoint: "https://api.allorigins.win/get?url=".into(),
                envelope: true,
            },
            Self {
                name: "corsproxy".into(),
                endpoint: "https://corsproxy.io/?url=".into(),
                envelope: false,
            },
        ]
    }

    pub fn request_url(&self, target: &Url) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(target.as_str().as_bytes()).collect();
        format!("{}{}", self.endpoint, encoded)
    }
}

#[derive(Deserialize)]
struct Envelope {
    contents: Option<String>,
}

pub struct ThirdPartyStrategy {
    transport: Arc<dyn Transport>,
    service: ThirdPartyService,
}

impl ThirdPartyStrategy {
    pub fn new(transport: Arc<dyn Transport>, service: ThirdPartyService) -> Self {
        Self { transport, service }
    }
}

#[async_trait]
impl Strategy for ThirdPartyStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::ThirdParty(self.service.name.clone())
    }

    async fn attempt(&self, url: &Url) -> Result<String, String> {
        let resp = self
            .transport
            .get(&self.service.request_url(url), &[])
            .await
            .map_err(|e| e.to_string())?;
        if !resp.is_success() {
            return Err(format!("{} error: {}", self.service.name, resp.status));
        }
        if !self.service.envelope {
            return Ok(resp.text());
        }
        match serde_json::from_slice::<Envelope>(&resp.body) {
            Ok(Envelope { contents: Some(contents) }) => Ok(contents),
            Ok(Envelope { contents: None }) => Err(format!("{} returned no contents", self.service.name)),
            Err(e) => Err(format!("{} returned a malformed envelope: {e}", self.service.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportResponse;
    use parking_lot::Mutex;

    struct Canned {
        result: Result<TransportResponse, TransportError>,
        seen: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl Canned {
        fn ok(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(TransportResponse { status, content_type: None, body: body.into() }),
                seen: Mutex::new(vec![]),
            })
        }

        fn err(e: TransportError) -> Arc<Self> {
            Arc::new(Self { result: Err(e), seen: Mutex::new(vec![]) })
        }
    }

    #[async_trait]
    impl Transport for Canned {
        async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<TransportResponse, TransportError> {
            let headers = headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
            self.seen.lock().push((url.to_string(), headers));
            self.result.clone()
        }
    }

    fn target() -> Url {
        Url::parse("https://example.com/data.json?x=1&y=2").unwrap()
    }

    #[tokio::test]
    async fn direct_sends_accept_and_maps_status() {
        let t = Canned::ok(404, "nope");
        let s = DirectStrategy::new(t.clone());
        assert_eq!(s.attempt(&target()).await.unwrap_err(), "HTTP 404");
        let seen = t.seen.lock();
        assert_eq!(seen[0].0, "https://example.com/data.json?x=1&y=2");
        assert_eq!(seen[0].1, vec![("Accept".to_string(), ACCEPT_JSON.to_string())]);
    }

    #[tokio::test]
    async fn direct_network_failure_reason() {
        let s = DirectStrategy::new(Canned::err(TransportError::Other("boom".into())));
        assert_eq!(s.attempt(&target()).await.unwrap_err(), "cross-origin or network failure");
    }

    #[tokio::test]
    async fn relay_encodes_target_as_single_parameter() {
        let t = Canned::ok(200, "{}");
        let s = RelayStrategy::new(t.clone(), "http://localhost:3000/api/proxy");
        assert_eq!(s.attempt(&target()).await.unwrap(), "{}");

        let sent = Url::parse(&t.seen.lock()[0].0).unwrap();
        let params: Vec<_> = sent.query_pairs().collect();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].0, "url");
        assert_eq!(params[0].1, target().as_str());
    }

    #[tokio::test]
    async fn relay_reports_its_error_text_or_status() {
        let s = RelayStrategy::new(Canned::ok(500, r#"{"error":"Domain not found"}"#), "http://localhost/api/proxy");
        assert_eq!(s.attempt(&target()).await.unwrap_err(), "Domain not found");

        let s = RelayStrategy::new(Canned::ok(502, ""), "http://localhost/api/proxy");
        assert_eq!(s.attempt(&target()).await.unwrap_err(), "Proxy error: 502");
    }

    #[tokio::test]
    async fn envelope_service_is_unwrapped() {
        let service = ThirdPartyService::defaults().remove(0);
        let t = Canned::ok(200, r#"{"contents":"{\"a\":1}","status":{"http_code":200}}"#);
        let s = ThirdPartyStrategy::new(t.clone(), service);
        assert_eq!(s.attempt(&target()).await.unwrap(), r#"{"a":1}"#);
        assert_eq!(
            t.seen.lock()[0].0,
            "https://api.allorigins.win/get?url=https%3A%2F%2Fexample.com%2Fdata.json%3Fx%3D1%26y%3D2"
        );
    }

    #[tokio::test]
    async fn envelope_without_contents_fails() {
        let service = ThirdPartyService::defaults().remove(0);
        let s = ThirdPartyStrategy::new(Canned::ok(200, r#"{"status":{}}"#), service);
        assert!(s.attempt(&target()).await.is_err());
    }

    #[tokio::test]
    async fn raw_service_passes_body_through() {
        let service = ThirdPartyService::defaults().remove(1);
        let s = ThirdPartyStrategy::new(Canned::ok(200, "not even json"), service);
        assert_eq!(s.id(), StrategyId::ThirdParty("corsproxy".into()));
        assert_eq!(s.attempt(&target()).await.unwrap(), "not even json");
    }
}
