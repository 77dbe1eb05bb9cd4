//! Official-status poller: periodically fetches each vendor's public
//! status page and caches a parsed summary per provider type, so dashboard
//! reads never block on an outbound request.

use crate::error::AppError;
use crate::messages;
use crate::model::{OfficialHealthStatus, OfficialStatusResult, ProviderType};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

fn status_page_url(provider_type: ProviderType) -> &'static str {
    match provider_type {
        ProviderType::Anthropic => "https://status.anthropic.com/api/v2/summary.json",
        ProviderType::Openai => "https://status.openai.com/api/v2/summary.json",
        ProviderType::Gemini => "https://status.cloud.google.com/incidents.json",
    }
}

pub struct OfficialStatusPoller {
    cache: DashMap<ProviderType, OfficialStatusResult>,
    in_progress: AtomicBool,
    started: AtomicBool,
    client: reqwest::Client,
}

impl OfficialStatusPoller {
    pub fn new() -> Result<Self, AppError> {
        Ok(Self {
            cache: DashMap::new(),
            in_progress: AtomicBool::new(false),
            started: AtomicBool::new(false),
            client: reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?,
        })
    }

    /// Read-only lookup of the current cached value.
    pub fn get_official_status(&self, provider_type: ProviderType) -> Option<OfficialStatusResult> {
        self.cache.get(&provider_type).map(|v| v.clone())
    }

    /// Starts the timer if none exists yet; starting also triggers an
    /// immediate first run. Calling this `K` times yields exactly one
    /// background timer.
    pub fn ensure_running(self: &Arc<Self>, interval: Duration) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let poller = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                poller.run_once().await;
                tokio::time::sleep(interval).await;
            }
        });
    }

    async fn run_once(&self) {
        if self.in_progress.swap(true, Ordering::SeqCst) {
            // a run is already executing; skip this tick.
            return;
        }

        for provider_type in [ProviderType::Openai, ProviderType::Gemini, ProviderType::Anthropic] {
            let result = self.fetch_one(provider_type).await;
            self.cache.insert(provider_type, result);
        }
        info!("official-status poll tick complete");

        self.in_progress.store(false, Ordering::SeqCst);
    }

    async fn fetch_one(&self, provider_type: ProviderType) -> OfficialStatusResult {
        let url = status_page_url(provider_type);
        let response = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(err) if err.is_timeout() => {
                return unknown(messages::OFFICIAL_STATUS_TIMEOUT);
            }
            Err(err) => {
                warn!(provider = provider_type.as_str(), error = %err, "official-status fetch failed");
                return unknown(messages::OFFICIAL_STATUS_FAILED);
            }
        };

        if !response.status().is_success() {
            return unknown(&messages::http_status(response.status().as_u16()));
        }

        match response.json::<Value>().await {
            Ok(body) => parse_status_summary(&body),
            Err(_) => unknown(messages::OFFICIAL_STATUS_FAILED),
        }
    }
}

fn unknown(message: &str) -> OfficialStatusResult {
    OfficialStatusResult {
        status: OfficialHealthStatus::Unknown,
        message: message.to_string(),
        checked_at: chrono::Utc::now(),
        affected_components: None,
    }
}

/// Parses a statuspage.io-compatible `summary.json` body. The
/// component-override rule is: any component whose status contains
/// "outage" or equals `major_outage` forces `down`; any component
/// containing "degraded" forces at least `degraded`.
fn parse_status_summary(body: &Value) -> OfficialStatusResult {
    let indicator = body
        .get("status")
        .and_then(|s| s.get("indicator"))
        .and_then(|v| v.as_str())
        .unwrap_or("none");

    let mut status = match indicator {
        "none" => OfficialHealthStatus::Operational,
        "minor" => OfficialHealthStatus::Degraded,
        "major" | "critical" => OfficialHealthStatus::Down,
        _ => OfficialHealthStatus::Unknown,
    };

    let mut affected = Vec::new();
    if let Some(components) = body.get("components").and_then(|c| c.as_array()) {
        for component in components {
            let component_status = component
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_lowercase();
            if component_status.is_empty() || component_status == "operational" {
                continue;
            }

            let name = component
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown component")
                .to_string();
            affected.push(name);

            if component_status.contains("outage") || component_status == "major_outage" {
                status = OfficialHealthStatus::Down;
            } else if component_status.contains("degraded")
                && !matches!(status, OfficialHealthStatus::Down)
            {
                status = OfficialHealthStatus::Degraded;
            }
        }
    }

    let message = render_affected_message(&affected, status);

    OfficialStatusResult {
        status,
        message,
        checked_at: chrono::Utc::now(),
        affected_components: if affected.is_empty() {
            None
        } else {
            Some(affected)
        },
    }
}

fn render_affected_message(affected: &[String], status: OfficialHealthStatus) -> String {
    if affected.is_empty() {
        return match status {
            OfficialHealthStatus::Operational => "operational".to_string(),
            OfficialHealthStatus::Degraded => "degraded".to_string(),
            OfficialHealthStatus::Down => "down".to_string(),
            OfficialHealthStatus::Unknown => messages::UNKNOWN.to_string(),
        };
    }
    if affected.len() > 3 {
        format!("{} 等 {} 个组件 受影响", affected[..3].join(", "), affected.len())
    } else {
        format!("{} 受影响", affected.join(", "))
    }
}
