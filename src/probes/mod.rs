//! Provider probes: sends a minimal streaming request to each vendor's
//! chat/completions-style endpoint and classifies the round-trip into a
//! `CheckResult`. Network execution sits behind the `ProbeClient` trait so
//! the timing/classification logic and the coalescing layer above it can be
//! exercised against a fake transport in tests.

pub mod anthropic;
pub mod client_cache;
pub mod effort;
pub mod gemini;
pub mod openai;

use crate::messages;
use crate::model::{CheckResult, HealthStatus, ProviderConfig, ProviderType};
use client_cache::VendorClientCache;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::warn;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(45);
pub const DEGRADED_THRESHOLD_MS: u64 = 6_000;
pub const USER_AGENT: &str = "check-cx/0.1.0";

/// A fully-built vendor request, independent of the transport that sends
/// it. Each vendor module builds one from a `ProviderConfig`; the fields
/// needed for client-cache keying travel alongside the request itself.
pub struct ProbeRequest {
    pub base_url: String,
    pub url: String,
    pub api_key: String,
    pub header_overrides: Option<HashMap<String, String>>,
    pub headers: reqwest::header::HeaderMap,
    pub body: serde_json::Value,
}

#[derive(Debug)]
pub enum VendorProbeError {
    Http(u16),
    Other(String),
}

impl From<reqwest::Error> for VendorProbeError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            VendorProbeError::Http(status.as_u16())
        } else if err.to_string().to_lowercase().contains("aborted") || err.is_timeout() {
            VendorProbeError::Other("请求超时".to_string())
        } else {
            VendorProbeError::Other(err.to_string())
        }
    }
}

/// The network transport seam for vendor probes. Production code sends the
/// request over `reqwest` and reads the first SSE event; tests substitute a
/// fake that returns canned outcomes without touching the network.
#[async_trait::async_trait]
pub trait ProbeClient: Send + Sync {
    async fn execute(&self, request: ProbeRequest) -> Result<(), VendorProbeError>;
}

/// Production `ProbeClient`: reuses a cached `reqwest::Client` per vendor
/// and reads the response as an SSE stream, returning as soon as the first
/// event arrives.
pub struct ReqwestProbeClient {
    clients: VendorClientCache,
}

impl ReqwestProbeClient {
    pub fn new(clients: VendorClientCache) -> Self {
        Self { clients }
    }
}

#[async_trait::async_trait]
impl ProbeClient for ReqwestProbeClient {
    async fn execute(&self, request: ProbeRequest) -> Result<(), VendorProbeError> {
        let client = self.clients.get_or_create(
            &request.base_url,
            &request.api_key,
            request.header_overrides.as_ref(),
            PROBE_TIMEOUT,
        );

        let response = client
            .post(&request.url)
            .headers(request.headers)
            .json(&request.body)
            .send()
            .await?;

        await_first_stream_event(response).await
    }
}

/// Outcome of one vendor wire round-trip, before timeout/degraded
/// classification is applied.
pub enum VendorOutcome {
    /// At least one stream event arrived; carries elapsed time.
    Success(Duration),
    Http(u16),
    Other(String),
}

/// Default endpoints used when a config's `endpoint` is null.
pub fn default_endpoint(provider_type: ProviderType) -> &'static str {
    match provider_type {
        ProviderType::Openai => "https://api.openai.com/v1/chat/completions",
        ProviderType::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        ProviderType::Anthropic => "https://api.anthropic.com/v1/messages",
    }
}

fn merged_headers(config: &ProviderConfig) -> reqwest::header::HeaderMap {
    let mut map = reqwest::header::HeaderMap::new();
    map.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(USER_AGENT),
    );
    map.insert(reqwest::header::CACHE_CONTROL, "no-cache".parse().unwrap());
    if let Some(overrides) = &config.request_headers {
        for (name, value) in overrides {
            if let (Ok(name), Ok(value)) = (
                reqwest::header::HeaderName::from_bytes(name.as_bytes()),
                reqwest::header::HeaderValue::from_str(value),
            ) {
                map.insert(name, value);
            }
        }
    }
    map
}

/// `probe(config) -> CheckResult`. Always resolves, never fails outward.
pub async fn probe(config: &ProviderConfig, client: &dyn ProbeClient) -> CheckResult {
    let endpoint = config
        .endpoint
        .clone()
        .unwrap_or_else(|| default_endpoint(config.provider_type).to_string());

    let ping_endpoint = endpoint.clone();
    let (vendor_result, ping_latency_ms) = tokio::join!(
        run_with_deadline(config, &endpoint, client),
        crate::core::ping::measure_endpoint_ping(&ping_endpoint),
    );

    let (status, latency_ms, message) = classify(vendor_result);

    CheckResult {
        id: config.id.clone(),
        name: config.name.clone(),
        provider_type: config.provider_type,
        endpoint,
        model: config.model.clone(),
        status,
        latency_ms,
        ping_latency_ms,
        checked_at: chrono::Utc::now(),
        message,
        group_name: config.group_name.clone(),
        official_status: None,
    }
}

async fn run_with_deadline(
    config: &ProviderConfig,
    endpoint: &str,
    client: &dyn ProbeClient,
) -> Option<VendorOutcome> {
    match tokio::time::timeout(PROBE_TIMEOUT, run_vendor(config, endpoint, client)).await {
        Ok(outcome) => Some(outcome),
        Err(_) => None, // deadline expired
    }
}

async fn run_vendor(config: &ProviderConfig, endpoint: &str, client: &dyn ProbeClient) -> VendorOutcome {
    let headers = merged_headers(config);
    let request = match config.provider_type {
        ProviderType::Openai => openai::build_request(config, endpoint, &headers),
        ProviderType::Gemini => gemini::build_request(config, endpoint, &headers),
        ProviderType::Anthropic => anthropic::build_request(config, endpoint, &headers),
    };
    let request = match request {
        Ok(request) => request,
        Err(err) => return outcome_from_error(config, err),
    };

    let started = Instant::now();
    match client.execute(request).await {
        Ok(()) => VendorOutcome::Success(started.elapsed()),
        Err(err) => outcome_from_error(config, err),
    }
}

fn outcome_from_error(config: &ProviderConfig, err: VendorProbeError) -> VendorOutcome {
    match err {
        VendorProbeError::Http(code) => VendorOutcome::Http(code),
        VendorProbeError::Other(msg) => {
            warn!(id = %config.id, error = %msg, "provider probe failed");
            VendorOutcome::Other(msg)
        }
    }
}

fn classify(outcome: Option<VendorOutcome>) -> (HealthStatus, Option<u64>, String) {
    match outcome {
        None => (HealthStatus::Failed, None, messages::TIMEOUT.to_string()),
        Some(VendorOutcome::Success(elapsed)) => {
            let ms = elapsed.as_millis() as u64;
            if ms > DEGRADED_THRESHOLD_MS {
                (HealthStatus::Degraded, Some(ms), messages::degraded(ms))
            } else {
                (HealthStatus::Operational, Some(ms), messages::operational(ms))
            }
        }
        Some(VendorOutcome::Http(code)) => {
            (HealthStatus::Failed, None, messages::http_status(code))
        }
        Some(VendorOutcome::Other(_)) => {
            (HealthStatus::Failed, None, messages::UNKNOWN.to_string())
        }
    }
}

/// Sends `response.bytes_stream()` through an SSE decoder and returns as
/// soon as any event arrives — the first event, including a `[DONE]`
/// sentinel, satisfies "the transport opens and at least one stream event
/// arrives". Probes never await full stream consumption.
pub(crate) async fn await_first_stream_event(
    response: reqwest::Response,
) -> Result<(), VendorProbeError> {
    use eventsource_stream::Eventsource;
    use futures::StreamExt;

    let status = response.status();
    if !status.is_success() {
        return Err(VendorProbeError::Http(status.as_u16()));
    }

    let mut stream = response.bytes_stream().eventsource();
    match stream.next().await {
        Some(Ok(_event)) => Ok(()),
        Some(Err(err)) => Err(VendorProbeError::Other(err.to_string())),
        None => Ok(()), // transport opened and closed cleanly with no body; treat as success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_second_latency_is_operational_inclusive() {
        let (status, ms, _) = classify(Some(VendorOutcome::Success(Duration::from_millis(6000))));
        assert!(matches!(status, HealthStatus::Operational));
        assert_eq!(ms, Some(6000));
    }

    #[test]
    fn six_thousand_one_ms_is_degraded() {
        let (status, _, _) = classify(Some(VendorOutcome::Success(Duration::from_millis(6001))));
        assert!(matches!(status, HealthStatus::Degraded));
    }

    #[test]
    fn timeout_yields_failed_with_null_latency() {
        let (status, ms, msg) = classify(None);
        assert!(matches!(status, HealthStatus::Failed));
        assert_eq!(ms, None);
        assert_eq!(msg, messages::TIMEOUT);
    }

    #[test]
    fn default_endpoints_are_stable() {
        assert_eq!(
            default_endpoint(ProviderType::Openai),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            default_endpoint(ProviderType::Gemini),
            "https://generativelanguage.googleapis.com/v1beta"
        );
        assert_eq!(
            default_endpoint(ProviderType::Anthropic),
            "https://api.anthropic.com/v1/messages"
        );
    }

    struct CountingProbeClient {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ProbeClient for CountingProbeClient {
        async fn execute(&self, _request: ProbeRequest) -> Result<(), VendorProbeError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        }
    }

    fn sample_config() -> ProviderConfig {
        ProviderConfig {
            id: "A".into(),
            name: "A".into(),
            provider_type: ProviderType::Openai,
            endpoint: Some("https://api.openai.com/v1/chat/completions".into()),
            model: "gpt-4o-mini".into(),
            api_key: "k".into(),
            is_maintenance: false,
            request_headers: None,
            metadata: None,
            group_name: None,
        }
    }

    #[tokio::test]
    async fn probe_executes_against_the_injected_client() {
        let client = CountingProbeClient {
            calls: std::sync::atomic::AtomicUsize::new(0),
        };
        let config = sample_config();
        let result = probe(&config, &client).await;
        assert!(matches!(result.status, HealthStatus::Operational));
        assert_eq!(client.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
