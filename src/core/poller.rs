//! Background poller. Runs an unconditional-interval timer that refreshes
//! the full dashboard snapshot, started at most once per process.

use crate::core::dashboard::DashboardAggregator;
use crate::core::snapshot::RefreshMode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct BackgroundPoller {
    started: AtomicBool,
}

impl Default for BackgroundPoller {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundPoller {
    pub fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
        }
    }

    /// Idempotent: calling this `K` times spawns exactly one timer. One
    /// immediate run happens on the first call, before the first sleep.
    pub fn ensure_running(self: &Arc<Self>, aggregator: Arc<DashboardAggregator>, interval: Duration) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        tokio::spawn(async move {
            loop {
                let data = aggregator.load_dashboard_data(RefreshMode::Always).await;
                info!(total = data.total, "background poll tick complete");
                tokio::time::sleep(interval).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unset() {
        let poller = BackgroundPoller::new();
        assert!(!poller.started.load(Ordering::SeqCst));
    }
}
