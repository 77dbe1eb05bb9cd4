//! Dashboard aggregator: turns the active/maintenance config split and the
//! latest history snapshot into the whole-fleet and per-group dashboard
//! views served over HTTP.

use crate::core::config_repo::ConfigRepository;
use crate::core::official_status::OfficialStatusPoller;
use crate::core::snapshot::{build_provider_timelines, RefreshMode, Scope, SnapshotService};
use crate::messages;
use crate::model::{
    DashboardData, GroupDashboardData, GroupedProviderTimelines, ProviderConfig, ProviderTimeline,
    UNGROUPED_SENTINEL,
};
use crate::settings::Settings;
use std::sync::Arc;

pub struct DashboardAggregator {
    config_repo: Arc<dyn ConfigRepository>,
    snapshot_service: Arc<SnapshotService>,
    official_status: Arc<OfficialStatusPoller>,
    settings: Arc<Settings>,
}

impl DashboardAggregator {
    pub fn new(
        config_repo: Arc<dyn ConfigRepository>,
        snapshot_service: Arc<SnapshotService>,
        official_status: Arc<OfficialStatusPoller>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            config_repo,
            snapshot_service,
            official_status,
            settings,
        }
    }

    pub async fn load_dashboard_data(&self, refresh_mode: RefreshMode) -> DashboardData {
        let configs = self.config_repo.load_enabled_configs().await;
        let (active, maintenance) = split_active_maintenance(configs);

        let cache_key = dashboard_cache_key(self.settings.check_poll_interval.as_millis() as u64, &active);
        let scope = Scope {
            key: cache_key,
            configs: active.clone(),
        };

        let history = self.snapshot_service.load_snapshot(&scope, refresh_mode).await;
        let timelines = build_provider_timelines(&history, &maintenance, &self.official_status);
        let grouped = group_timelines(&timelines);
        let last_updated = newest_checked_at(&timelines);

        DashboardData {
            total: timelines.len(),
            last_updated,
            provider_timelines: timelines,
            grouped_timelines: grouped,
            poll_interval_label: self.settings.poll_interval_label(),
            poll_interval_ms: self.settings.check_poll_interval.as_millis() as u64,
            generated_at: chrono::Utc::now(),
        }
    }

    pub async fn load_group_dashboard_data(
        &self,
        group_name: &str,
        refresh_mode: RefreshMode,
    ) -> Option<GroupDashboardData> {
        let configs = self.config_repo.load_enabled_configs().await;
        let filtered: Vec<ProviderConfig> = configs
            .into_iter()
            .filter(|c| matches_group(c, group_name))
            .collect();

        if filtered.is_empty() {
            return None;
        }

        let (active, maintenance) = split_active_maintenance(filtered);

        let cache_key = format!(
            "group:{}:{}:{}",
            group_name,
            self.settings.check_poll_interval.as_millis(),
            sorted_ids(&active)
        );
        let scope = Scope {
            key: cache_key,
            configs: active,
        };

        let history = self.snapshot_service.load_snapshot(&scope, refresh_mode).await;
        let mut timelines = build_provider_timelines(&history, &maintenance, &self.official_status);
        timelines.sort_by(|a, b| a.latest.name.to_lowercase().cmp(&b.latest.name.to_lowercase()));

        let display_name = if group_name == UNGROUPED_SENTINEL {
            messages::UNGROUPED_DISPLAY_NAME.to_string()
        } else {
            group_name.to_string()
        };

        Some(GroupDashboardData {
            total: timelines.len(),
            last_updated: newest_checked_at(&timelines),
            group_name: group_name.to_string(),
            display_name,
            provider_timelines: timelines,
            poll_interval_label: self.settings.poll_interval_label(),
            poll_interval_ms: self.settings.check_poll_interval.as_millis() as u64,
            generated_at: chrono::Utc::now(),
        })
    }
}

fn matches_group(config: &ProviderConfig, group_name: &str) -> bool {
    if group_name == UNGROUPED_SENTINEL {
        config.group_name.is_none()
    } else {
        config.group_name.as_deref() == Some(group_name)
    }
}

fn split_active_maintenance(configs: Vec<ProviderConfig>) -> (Vec<ProviderConfig>, Vec<ProviderConfig>) {
    configs.into_iter().partition(|c| !c.is_maintenance)
}

fn sorted_ids(configs: &[ProviderConfig]) -> String {
    let mut ids: Vec<&str> = configs.iter().map(|c| c.id.as_str()).collect();
    ids.sort_unstable();
    ids.join("|")
}

fn dashboard_cache_key(poll_interval_ms: u64, active: &[ProviderConfig]) -> String {
    if active.is_empty() {
        format!("dashboard:{}:__empty__", poll_interval_ms)
    } else {
        format!("dashboard:{}:{}", poll_interval_ms, sorted_ids(active))
    }
}

fn newest_checked_at(timelines: &[ProviderTimeline]) -> Option<chrono::DateTime<chrono::Utc>> {
    timelines.iter().map(|t| t.latest.checked_at).max()
}

/// Named groups sorted lexicographically, ungrouped bucket last
/// (displayName "未分组"); within each group, timelines already arrive
/// sorted by `latest.name`.
fn group_timelines(timelines: &[ProviderTimeline]) -> Vec<GroupedProviderTimelines> {
    use std::collections::BTreeMap;

    let mut named: BTreeMap<String, Vec<ProviderTimeline>> = BTreeMap::new();
    let mut ungrouped: Vec<ProviderTimeline> = Vec::new();

    for timeline in timelines {
        match &timeline.latest.group_name {
            Some(group) => named.entry(group.clone()).or_default().push(timeline.clone()),
            None => ungrouped.push(timeline.clone()),
        }
    }

    let mut groups: Vec<GroupedProviderTimelines> = named
        .into_iter()
        .map(|(group_name, timelines)| GroupedProviderTimelines {
            display_name: group_name.clone(),
            group_name,
            timelines,
        })
        .collect();

    if !ungrouped.is_empty() {
        groups.push(GroupedProviderTimelines {
            group_name: UNGROUPED_SENTINEL.to_string(),
            display_name: messages::UNGROUPED_DISPLAY_NAME.to_string(),
            timelines: ungrouped,
        });
    }

    groups
}
