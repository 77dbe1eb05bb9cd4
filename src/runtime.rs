//! Process-wide runtime context: owns the DB pool-backed collaborators, the
//! vendor client cache, the official-status cache, and the background task
//! handles, so none of them are true globals.

use crate::core::config_repo::{ConfigRepository, PgConfigRepository};
use crate::core::dashboard::DashboardAggregator;
use crate::core::history::{HistoryStore, PgHistoryStore};
use crate::core::official_status::OfficialStatusPoller;
use crate::core::poller::BackgroundPoller;
use crate::core::snapshot::SnapshotService;
use crate::error::AppError;
use crate::probes::client_cache::VendorClientCache;
use crate::probes::{ProbeClient, ReqwestProbeClient};
use crate::settings::Settings;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

pub struct RuntimeContext {
    pub settings: Arc<Settings>,
    pub dashboard: Arc<DashboardAggregator>,
    pub official_status: Arc<OfficialStatusPoller>,
    pub background_poller: Arc<BackgroundPoller>,
}

impl RuntimeContext {
    pub async fn init(settings: Settings) -> Result<Self, AppError> {
        let settings = Arc::new(settings);

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&settings.database_url)
            .await?;

        let config_repo: Arc<dyn ConfigRepository> = Arc::new(PgConfigRepository::new(pool.clone()));
        let history_store: Arc<dyn HistoryStore> = Arc::new(PgHistoryStore::new(pool));
        let probe_client: Arc<dyn ProbeClient> =
            Arc::new(ReqwestProbeClient::new(VendorClientCache::new()));
        let official_status = Arc::new(OfficialStatusPoller::new()?);

        let snapshot_service = Arc::new(SnapshotService::new(
            Arc::clone(&history_store),
            Arc::clone(&probe_client),
            settings.check_poll_interval,
        ));

        let dashboard = Arc::new(DashboardAggregator::new(
            config_repo,
            snapshot_service,
            Arc::clone(&official_status),
            Arc::clone(&settings),
        ));

        Ok(Self {
            settings,
            dashboard,
            official_status,
            background_poller: Arc::new(BackgroundPoller::new()),
        })
    }

    /// Starts the background dashboard poller and the official-status
    /// poller. Idempotent: safe to call more than once per process.
    pub fn ensure_background_services(self: &Arc<Self>) {
        self.background_poller
            .ensure_running(Arc::clone(&self.dashboard), self.settings.check_poll_interval);
        self.official_status
            .ensure_running(self.settings.official_status_poll_interval);
    }
}
