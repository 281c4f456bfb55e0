// ABOUTME: HTTP transport for functional probes, plus response classification.
// ABOUTME: Classification is pure; the reqwest client accepts the deployment's own certs.

use async_trait::async_trait;
use std::time::Duration;

use super::Readiness;

/// Minimal response surface a probe needs.
#[derive(Debug, Clone)]
pub struct HttpProbeResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum HttpProbeError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,
}

/// Transport seam for HTTP probes. The production implementation speaks to
/// localhost; tests script responses.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn fetch(
        &self,
        port: u16,
        path: &str,
        https: bool,
    ) -> Result<HttpProbeResponse, HttpProbeError>;
}

/// reqwest-backed probe transport.
///
/// Certificate validation is disabled: the stack's endpoints present the
/// deployment's self-signed leaf, and the probe's job is reachability and
/// semantics, not trust.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(request_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(request_timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn fetch(
        &self,
        port: u16,
        path: &str,
        https: bool,
    ) -> Result<HttpProbeResponse, HttpProbeError> {
        let scheme = if https { "https" } else { "http" };
        let path = path.strip_prefix('/').unwrap_or(path);
        let url = format!("{scheme}://127.0.0.1:{port}/{path}");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                HttpProbeError::Timeout
            } else {
                HttpProbeError::Connect(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        Ok(HttpProbeResponse { status, body })
    }
}

/// Status-only classification: the endpoint answering at all is the signal.
///
/// 401/403 mean the service is up but its authentication is not configured
/// yet — degraded, not failed: remaining configuration is out of scope for
/// the orchestrator.
pub fn classify_http_status(status: u16) -> Readiness {
    match status {
        200..=399 => Readiness::Ready,
        401 | 403 => Readiness::ReadyDegraded,
        _ => Readiness::NotReady,
    }
}

/// Body-level classification for cluster-health style endpoints.
///
/// Three categories, not two: a clean positive answer, an answer that shows
/// the service is reachable but not fully initialized, and no useful answer
/// at all.
pub fn classify_http_body(status: u16, body: &str) -> Readiness {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        // Cluster-health convention: {"status": "green" | "yellow" | "red"}.
        if let Some(health) = json.get("status").and_then(|v| v.as_str()) {
            return match health {
                "green" | "yellow" => Readiness::Ready,
                _ => Readiness::NotReady,
            };
        }

        // Kibana-style overall level.
        if let Some(level) = json
            .pointer("/status/overall/level")
            .and_then(|v| v.as_str())
        {
            return match level {
                "available" => Readiness::Ready,
                "degraded" => Readiness::ReadyDegraded,
                _ => Readiness::NotReady,
            };
        }

        // An error object from an answering endpoint. A security exception
        // means the HTTP layer works and only the security subsystem is
        // still unconfigured.
        if let Some(error) = json.get("error") {
            if error_is_unconfigured(error) {
                return Readiness::ReadyDegraded;
            }
            return Readiness::NotReady;
        }
    }

    // No JSON to interpret: fall back to status semantics. A 2xx with an
    // unparseable body still answered.
    match status {
        200..=299 => Readiness::Ready,
        401 | 403 => Readiness::ReadyDegraded,
        _ => Readiness::NotReady,
    }
}

fn error_is_unconfigured(error: &serde_json::Value) -> bool {
    let marker = |s: &str| {
        s.contains("security_exception")
            || s.contains("not initialized")
            || s.contains("authentication")
    };

    match error {
        serde_json::Value::String(s) => marker(s),
        serde_json::Value::Object(_) => error
            .get("type")
            .and_then(|t| t.as_str())
            .map(marker)
            .or_else(|| error.get("reason").and_then(|r| r.as_str()).map(marker))
            .unwrap_or(false),
        _ => false,
    }
}
