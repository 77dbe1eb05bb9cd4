//! Integration-level tests for the dashboard aggregator against fake
//! collaborators: grouping, the ungrouped bucket, and the empty-fleet case.

use async_trait::async_trait;
use cx_health::core::config_repo::ConfigRepository;
use cx_health::core::dashboard::DashboardAggregator;
use cx_health::core::history::HistoryStore;
use cx_health::core::official_status::OfficialStatusPoller;
use cx_health::core::snapshot::{RefreshMode, SnapshotService};
use cx_health::model::{CheckResult, HistorySnapshot, ProviderConfig, ProviderType};
use cx_health::probes::client_cache::VendorClientCache;
use cx_health::probes::{ProbeClient, ReqwestProbeClient};
use cx_health::settings::Settings;
use std::sync::Arc;
use std::time::Duration;

struct FakeConfigRepo(Vec<ProviderConfig>);

#[async_trait]
impl ConfigRepository for FakeConfigRepo {
    async fn load_enabled_configs(&self) -> Vec<ProviderConfig> {
        self.0.clone()
    }
}

struct NoopHistoryStore;

#[async_trait]
impl HistoryStore for NoopHistoryStore {
    async fn fetch(&self, _allowed_ids: Option<&[String]>) -> HistorySnapshot {
        HistorySnapshot::new()
    }
    async fn append(&self, _results: &[CheckResult]) {}
    async fn prune(&self, _limit: i64) {}
}

fn maintenance_config(id: &str, group: Option<&str>) -> ProviderConfig {
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
        group_name: group.map(|g| g.to_string()),
    }
}

fn test_settings() -> Settings {
    let mut settings = Settings::load();
    settings.check_poll_interval = Duration::from_secs(60);
    settings
}

fn build_aggregator(configs: Vec<ProviderConfig>) -> DashboardAggregator {
    let config_repo: Arc<dyn ConfigRepository> = Arc::new(FakeConfigRepo(configs));
    let history_store: Arc<dyn HistoryStore> = Arc::new(NoopHistoryStore);
    let probe_client: Arc<dyn ProbeClient> =
        Arc::new(ReqwestProbeClient::new(VendorClientCache::new()));
    let settings = Arc::new(test_settings());
    let snapshot_service = Arc::new(SnapshotService::new(
        history_store,
        probe_client,
        settings.check_poll_interval,
    ));
    let official_status = Arc::new(OfficialStatusPoller::new().unwrap());
    DashboardAggregator::new(config_repo, snapshot_service, official_status, settings)
}

#[tokio::test]
async fn group_404_for_unknown_group() {
    let aggregator = build_aggregator(vec![maintenance_config("A", Some("prod"))]);
    let result = aggregator
        .load_group_dashboard_data("unknown", RefreshMode::Never)
        .await;
    assert!(result.is_none());
}

#[tokio::test]
async fn ungrouped_view_returns_both_configs_with_display_name() {
    let aggregator = build_aggregator(vec![
        maintenance_config("A", None),
        maintenance_config("B", None),
    ]);
    let result = aggregator
        .load_group_dashboard_data("__ungrouped__", RefreshMode::Never)
        .await
        .expect("ungrouped bucket exists");

    assert_eq!(result.display_name, "未分组");
    assert_eq!(result.provider_timelines.len(), 2);
}

#[tokio::test]
async fn empty_config_set_yields_zero_total_dashboard() {
    let aggregator = build_aggregator(vec![]);
    let data = aggregator.load_dashboard_data(RefreshMode::Never).await;
    assert_eq!(data.total, 0);
    assert!(data.last_updated.is_none());
}

#[tokio::test]
async fn maintenance_configs_are_grouped_lexicographically() {
    let aggregator = build_aggregator(vec![
        maintenance_config("Z", Some("zeta")),
        maintenance_config("A", Some("alpha")),
    ]);
    let data = aggregator.load_dashboard_data(RefreshMode::Never).await;
    let names: Vec<&str> = data
        .grouped_timelines
        .iter()
        .map(|g| g.group_name.as_str())
        .collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
}
