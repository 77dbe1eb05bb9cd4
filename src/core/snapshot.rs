//! Snapshot service: per-scope request coalescing. At most one refresh
//! (probe fleet + history append/fetch) is ever in flight per cache key;
//! concurrent callers for the same scope all await the same `Shared`
//! future instead of each triggering their own round of vendor probes.

use crate::core::history::HistoryStore;
use crate::core::official_status::OfficialStatusPoller;
use crate::messages;
use crate::model::{CheckResult, HealthStatus, HistorySnapshot, ProviderConfig, ProviderTimeline};
use crate::probes::{self, ProbeClient};
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

type SharedHistoryFuture = Shared<BoxFuture<'static, HistorySnapshot>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Always,
    Missing,
    Never,
}

/// A cache key plus the active configs that key identifies.
#[derive(Clone)]
pub struct Scope {
    pub key: String,
    pub configs: Vec<ProviderConfig>,
}

impl Scope {
    pub fn ids(&self) -> Vec<String> {
        self.configs.iter().map(|c| c.id.clone()).collect()
    }
}

#[derive(Default)]
struct ScopeState {
    last_ping_at: Option<Instant>,
    history: Option<HistorySnapshot>,
    inflight: Option<SharedHistoryFuture>,
}

pub struct SnapshotService {
    scopes: DashMap<String, Arc<Mutex<ScopeState>>>,
    history_store: Arc<dyn HistoryStore>,
    probe_client: Arc<dyn ProbeClient>,
    poll_interval: Duration,
}

impl SnapshotService {
    pub fn new(
        history_store: Arc<dyn HistoryStore>,
        probe_client: Arc<dyn ProbeClient>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            scopes: DashMap::new(),
            history_store,
            probe_client,
            poll_interval,
        }
    }

    pub async fn load_snapshot(&self, scope: &Scope, mode: RefreshMode) -> HistorySnapshot {
        if scope.configs.is_empty() {
            return HistorySnapshot::new();
        }

        let state_arc = self
            .scopes
            .entry(scope.key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(ScopeState::default())))
            .clone();

        let shared = {
            let mut guard = state_arc.lock().await;

            if let Some(inflight) = guard.inflight.clone() {
                drop(guard);
                return inflight.await;
            }

            match mode {
                RefreshMode::Never => return guard.history.clone().unwrap_or_default(),
                RefreshMode::Missing => {
                    if let Some(history) = &guard.history {
                        if !history.is_empty() {
                            return history.clone();
                        }
                    }
                }
                RefreshMode::Always => {
                    if let (Some(history), Some(last_ping)) =
                        (&guard.history, guard.last_ping_at)
                    {
                        if last_ping.elapsed() < self.poll_interval {
                            return history.clone();
                        }
                    }
                }
            }

            let ids = scope.ids();
            let configs = scope.configs.clone();
            let history_store = Arc::clone(&self.history_store);
            let probe_client = Arc::clone(&self.probe_client);

            let fut: BoxFuture<'static, HistorySnapshot> = Box::pin(async move {
                let results: Vec<CheckResult> = futures::future::join_all(
                    configs.iter().map(|c| probes::probe(c, probe_client.as_ref())),
                )
                .await;
                history_store.append(&results).await;
                history_store.fetch(Some(&ids)).await
            });
            let shared = fut.shared();
            guard.inflight = Some(shared.clone());
            shared
        };

        let result = shared.await;

        {
            let mut guard = state_arc.lock().await;
            guard.history = Some(result.clone());
            guard.last_ping_at = Some(Instant::now());
            guard.inflight = None;
        }

        result
    }
}

/// Merges fetched history with synthesized maintenance placeholders into a
/// name-sorted list of per-provider timelines, attaching the cached
/// official status to each timeline's latest entry.
pub fn build_provider_timelines(
    history: &HistorySnapshot,
    maintenance_configs: &[ProviderConfig],
    official_status: &OfficialStatusPoller,
) -> Vec<ProviderTimeline> {
    let mut timelines: Vec<ProviderTimeline> = Vec::new();

    for (id, items) in history {
        if items.is_empty() {
            continue;
        }
        let mut sorted = items.clone();
        sorted.sort_by(|a, b| b.checked_at.cmp(&a.checked_at));
        let mut latest = sorted[0].clone();
        latest.official_status = official_status.get_official_status(latest.provider_type);

        timelines.push(ProviderTimeline {
            id: id.clone(),
            items: sorted,
            latest,
        });
    }

    for config in maintenance_configs {
        let latest = CheckResult {
            id: config.id.clone(),
            name: config.name.clone(),
            provider_type: config.provider_type,
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| probes::default_endpoint(config.provider_type).to_string()),
            model: config.model.clone(),
            status: HealthStatus::Maintenance,
            latency_ms: None,
            ping_latency_ms: None,
            checked_at: chrono::Utc::now(),
            message: messages::MAINTENANCE.to_string(),
            group_name: config.group_name.clone(),
            official_status: None,
        };
        timelines.push(ProviderTimeline {
            id: config.id.clone(),
            items: Vec::new(),
            latest,
        });
    }

    timelines.sort_by(|a, b| {
        a.latest
            .name
            .to_lowercase()
            .cmp(&b.latest.name.to_lowercase())
    });

    timelines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProviderType;

    fn maintenance_config(id: &str) -> ProviderConfig {
        ProviderConfig {
            id: id.to_string(),
            name: id.to_string(),
            provider_type: ProviderType::Openai,
            endpoint: None,
            model: "gpt-4o-mini".to_string(),
            api_key: "k".to_string(),
            is_maintenance: true,
            request_headers: None,
            metadata: None,
            group_name: None,
        }
    }

    #[test]
    fn maintenance_config_always_yields_empty_items_and_maintenance_latest() {
        let history = HistorySnapshot::new();
        let configs = vec![maintenance_config("M")];
        let poller = OfficialStatusPoller::new().unwrap();
        let timelines = build_provider_timelines(&history, &configs, &poller);
        assert_eq!(timelines.len(), 1);
        assert!(timelines[0].items.is_empty());
        assert!(matches!(timelines[0].latest.status, HealthStatus::Maintenance));
    }

    #[test]
    fn timelines_sort_by_name_case_insensitively() {
        let mut history = HistorySnapshot::new();
        history.insert(
            "a".to_string(),
            vec![sample_result("a", "bravo")],
        );
        history.insert(
            "b".to_string(),
            vec![sample_result("b", "Alpha")],
        );
        let poller = OfficialStatusPoller::new().unwrap();
        let timelines = build_provider_timelines(&history, &[], &poller);
        assert_eq!(timelines[0].latest.name, "Alpha");
        assert_eq!(timelines[1].latest.name, "bravo");
    }

    fn sample_result(id: &str, name: &str) -> CheckResult {
        CheckResult {
            id: id.to_string(),
            name: name.to_string(),
            provider_type: ProviderType::Openai,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            status: HealthStatus::Operational,
            latency_ms: Some(100),
            ping_latency_ms: Some(20),
            checked_at: chrono::Utc::now(),
            message: "ok".to_string(),
            group_name: None,
            official_status: None,
        }
    }

    struct CountingProbeClient {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ProbeClient for CountingProbeClient {
        async fn execute(&self, _request: probes::ProbeRequest) -> Result<(), probes::VendorProbeError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(())
        }
    }

    struct NoopHistoryStore;

    #[async_trait::async_trait]
    impl HistoryStore for NoopHistoryStore {
        async fn fetch(&self, _allowed_ids: Option<&[String]>) -> HistorySnapshot {
            HistorySnapshot::new()
        }
        async fn append(&self, _results: &[CheckResult]) {}
        async fn prune(&self, _limit: i64) {}
    }

    fn active_config(id: &str) -> ProviderConfig {
        ProviderConfig {
            id: id.to_string(),
            name: id.to_string(),
            provider_type: ProviderType::Openai,
            endpoint: Some("https://api.openai.com/v1/chat/completions".to_string()),
            model: "gpt-4o-mini".to_string(),
            api_key: "k".to_string(),
            is_maintenance: false,
            request_headers: None,
            metadata: None,
            group_name: None,
        }
    }

    #[tokio::test]
    async fn concurrent_loads_of_the_same_scope_invoke_the_probe_client_once() {
        let probe_client = Arc::new(CountingProbeClient {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let service = Arc::new(SnapshotService::new(
            Arc::new(NoopHistoryStore),
            probe_client.clone(),
            Duration::from_secs(60),
        ));

        let scope = Scope {
            key: "scope-a".to_string(),
            configs: vec![active_config("A")],
        };

        let (a, b, c) = tokio::join!(
            service.load_snapshot(&scope, RefreshMode::Always),
            service.load_snapshot(&scope, RefreshMode::Always),
            service.load_snapshot(&scope, RefreshMode::Always),
        );

        assert_eq!(a.len(), 0); // NoopHistoryStore.fetch always returns empty
        assert_eq!(b.len(), 0);
        assert_eq!(c.len(), 0);
        assert_eq!(
            probe_client.calls.load(std::sync::atomic::Ordering::SeqCst),
            1,
            "three concurrent callers on the same scope must share a single in-flight refresh"
        );
    }
}
