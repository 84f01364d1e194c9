//! Tiered retrieval: try each strategy in order, stop at the first body, and
//! keep every failure reason for the final report.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::IgnoredAny;
use tracing::{debug, info, warn};
use url::Url;

use crate::strategy::{DirectStrategy, RelayStrategy, Strategy, StrategyId, ThirdPartyService, ThirdPartyStrategy};
use crate::transport::Transport;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub strategy: StrategyId,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Retrieved {
    pub body: String,
    pub strategy: StrategyId,
    /// Advisory: whether `body` parsed as JSON. A `false` here never fails the
    /// retrieval.
    pub valid_json: bool,
    pub attempts: Vec<Attempt>,
}

/// Every tier failed. The message is the fixed user-facing explanation; the
/// per-tier reasons are kept in `attempts` for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateError {
    pub url: String,
    pub attempts: Vec<Attempt>,
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Failed to load data from {}", self.url)?;
        writeln!(f)?;
        writeln!(f, "Possible causes:")?;
        writeln!(f, "- the server does not allow cross-origin requests (CORS policy)")?;
        writeln!(f, "- the server is temporarily unavailable")?;
        writeln!(f, "- the URL is malformed or does not point to a JSON resource")?;
        writeln!(f)?;
        writeln!(f, "What you can try:")?;
        writeln!(f, "- open the URL in a browser to check that it responds")?;
        writeln!(f, "- download the file and paste its contents instead")?;
        write!(f, "- try again in a few minutes")
    }
}

impl std::error::Error for AggregateError {}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetrieveError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Exhausted(#[from] AggregateError),
}

/// Only absolute `http`/`https` URLs are retrievable.
pub fn validate_url(raw: &str) -> Result<Url, RetrieveError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RetrieveError::InvalidUrl("URL is required".into()));
    }
    let url = Url::parse(trimmed).map_err(|e| RetrieveError::InvalidUrl(format!("{trimmed}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RetrieveError::InvalidUrl(format!("unsupported scheme `{other}`"))),
    }
}

pub fn is_valid_json(body: &str) -> bool {
    serde_json::from_str::<IgnoredAny>(body).is_ok()
}

pub struct Retriever {
    strategies: Vec<Box<dyn Strategy>>,
    timeout: Duration,
}

impl Retriever {
    pub fn new(strategies: Vec<Box<dyn Strategy>>, timeout: Duration) -> Self {
        Self { strategies, timeout }
    }

    /// The standard chain: direct, then the relay (when configured), then each
    /// third-party service in order.
    pub fn standard(
        transport: Arc<dyn Transport>,
        relay_endpoint: Option<&str>,
        third_party: &[ThirdPartyService],
        timeout: Duration,
    ) -> Self {
        let mut strategies: Vec<Box<dyn Strategy>> = vec![Box::new(DirectStrategy::new(transport.clone()))];
        if let Some(endpoint) = relay_endpoint {
            strategies.push(Box::new(RelayStrategy::new(transport.clone(), endpoint)));
        }
        for service in third_party {
            strategies.push(Box::new(ThirdPartyStrategy::new(transport.clone(), service.clone())));
        }
        Self::new(strategies, timeout)
    }

    pub fn strategy_ids(&self) -> Vec<StrategyId> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    pub async fn retrieve(&self, raw_url: &str) -> Result<Retrieved, RetrieveError> {
        let url = validate_url(raw_url)?;
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let id = strategy.id();
            debug!(strategy = %id, url = %url, "attempting");

            let result = match tokio::time::timeout(self.timeout, strategy.attempt(&url)).await {
                Ok(result) => result,
                Err(_) => Err(format!("Request timeout ({} seconds)", self.timeout.as_secs())),
            };

            match result {
                Ok(body) => {
                    attempts.push(Attempt { strategy: id.clone(), outcome: AttemptOutcome::Success });
                    let valid_json = is_valid_json(&body);
                    info!(strategy = %id, valid_json, bytes = body.len(), "retrieved");
                    return Ok(Retrieved { body, strategy: id, valid_json, attempts });
                }
                Err(reason) => {
                    debug!(strategy = %id, %reason, "attempt failed");
                    attempts.push(Attempt { strategy: id, outcome: AttemptOutcome::Failure(reason) });
                }
            }
        }

        warn!(url = %url, tiers = attempts.len(), "all retrieval strategies failed");
        Err(AggregateError { url: raw_url.trim().to_string(), attempts }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_url_accepts_only_http_schemes() {
        assert!(validate_url("https://example.com/a.json").is_ok());
        assert!(validate_url("  http://example.com  ").is_ok());
        assert!(matches!(validate_url(""), Err(RetrieveError::InvalidUrl(_))));
        assert!(matches!(validate_url("example.com/a.json"), Err(RetrieveError::InvalidUrl(_))));
        assert!(matches!(validate_url("ftp://example.com/a.json"), Err(RetrieveError::InvalidUrl(_))));
        assert!(matches!(validate_url("file:///etc/passwd"), Err(RetrieveError::InvalidUrl(_))));
    }

    #[test]
    fn aggregate_message_names_url_and_remedies() {
        let err = AggregateError {
            url: "https://example.com/x".into(),
            attempts: vec![Attempt {
                strategy: StrategyId::Direct,
                outcome: AttemptOutcome::Failure("HTTP 503".into()),
            }],
        };
        let msg = err.to_string();
        assert!(msg.contains("https://example.com/x"));
        assert!(msg.contains("CORS policy"));
        assert!(msg.contains("paste its contents"));
        assert!(!msg.contains("HTTP 503"));
    }

    #[test]
    fn validity_probe() {
        assert!(is_valid_json(r#"{"a":[1,2]}"#));
        assert!(is_valid_json("null"));
        assert!(!is_valid_json("<html></html>"));
        assert!(!is_valid_json(""));
    }
}
