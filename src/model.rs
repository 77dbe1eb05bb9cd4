//! Core data model: provider configuration, probe/check results, official
//! vendor status, and the aggregated timeline/dashboard shapes served over
//! the HTTP surface. Flat, serde-derived structs with explicit wire-format
//! field renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const HISTORY_RING_CAP: usize = 60;
pub const UNGROUPED_SENTINEL: &str = "__ungrouped__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Openai,
    Gemini,
    Anthropic,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Openai => "openai",
            ProviderType::Gemini => "gemini",
            ProviderType::Anthropic => "anthropic",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Some(ProviderType::Openai),
            "gemini" => Some(ProviderType::Gemini),
            "anthropic" => Some(ProviderType::Anthropic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Operational,
    Degraded,
    Failed,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfficialHealthStatus {
    Operational,
    Degraded,
    Down,
    Unknown,
}

/// Target definition loaded from the config repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    pub endpoint: Option<String>,
    pub model: String,
    #[serde(rename = "apiKey")]
    pub api_key: String,
    #[serde(rename = "isMaintenance")]
    pub is_maintenance: bool,
    #[serde(rename = "requestHeaders")]
    pub request_headers: Option<HashMap<String, String>>,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(rename = "groupName")]
    pub group_name: Option<String>,
}

/// One probe outcome; also the history record persisted per config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    pub endpoint: String,
    pub model: String,
    pub status: HealthStatus,
    #[serde(rename = "latencyMs")]
    pub latency_ms: Option<u64>,
    #[serde(rename = "pingLatencyMs")]
    pub ping_latency_ms: Option<u64>,
    #[serde(rename = "checkedAt")]
    pub checked_at: DateTime<Utc>,
    pub message: String,
    #[serde(rename = "groupName")]
    pub group_name: Option<String>,
    #[serde(rename = "officialStatus", skip_serializing_if = "Option::is_none")]
    pub official_status: Option<OfficialStatusResult>,
}

/// Vendor status-page outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficialStatusResult {
    pub status: OfficialHealthStatus,
    pub message: String,
    #[serde(rename = "checkedAt")]
    pub checked_at: DateTime<Utc>,
    #[serde(rename = "affectedComponents", skip_serializing_if = "Option::is_none")]
    pub affected_components: Option<Vec<String>>,
}

/// config id -> ring of CheckResult, newest first, length <= HISTORY_RING_CAP.
pub type HistorySnapshot = HashMap<String, Vec<CheckResult>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTimeline {
    pub id: String,
    pub items: Vec<CheckResult>,
    pub latest: CheckResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupedProviderTimelines {
    #[serde(rename = "groupName")]
    pub group_name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub timelines: Vec<ProviderTimeline>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardData {
    #[serde(rename = "providerTimelines")]
    pub provider_timelines: Vec<ProviderTimeline>,
    #[serde(rename = "groupedTimelines")]
    pub grouped_timelines: Vec<GroupedProviderTimelines>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,
    pub total: usize,
    #[serde(rename = "pollIntervalLabel")]
    pub poll_interval_label: String,
    #[serde(rename = "pollIntervalMs")]
    pub poll_interval_ms: u64,
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDashboardData {
    #[serde(rename = "groupName")]
    pub group_name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "providerTimelines")]
    pub provider_timelines: Vec<ProviderTimeline>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,
    pub total: usize,
    #[serde(rename = "pollIntervalLabel")]
    pub poll_interval_label: String,
    #[serde(rename = "pollIntervalMs")]
    pub poll_interval_ms: u64,
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
}
