//! Process-wide runtime configuration, loaded once at start-up from the
//! environment via hand-rolled parsing with explicit `[min, max]` clamping
//! for the interval knobs.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub check_poll_interval: Duration,
    pub official_status_poll_interval: Duration,
}

fn parse_env_u64_clamped(key: &str, default: u64, min: u64, max: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(|v| v.clamp(min, max))
        .unwrap_or(default)
}

impl Settings {
    pub fn load() -> Self {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/cx_health".to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let poll_secs = parse_env_u64_clamped("CHECK_POLL_INTERVAL_SECONDS", 60, 15, 600);
        let official_status_minutes =
            parse_env_u64_clamped("OFFICIAL_STATUS_POLL_INTERVAL_MINUTES", 5, 1, 60);

        Self {
            database_url,
            bind_addr,
            check_poll_interval: Duration::from_secs(poll_secs),
            official_status_poll_interval: Duration::from_secs(official_status_minutes * 60),
        }
    }

    pub fn poll_interval_label(&self) -> String {
        format!("{}s", self.check_poll_interval.as_secs())
    }
}
