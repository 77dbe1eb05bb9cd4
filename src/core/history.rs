//! History store: fetches and appends per-config check history, pruning to
//! a fixed ring size. Each operation tries a server-side stored procedure
//! first and falls back to an equivalent raw query when the procedure is
//! missing, detected by the procedure name appearing in the error message.

use crate::model::{CheckResult, HealthStatus, ProviderType, HISTORY_RING_CAP};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tracing::warn;

const FETCH_PROCEDURE: &str = "fetch_history";
const PRUNE_PROCEDURE: &str = "prune_history";

#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// `allowedIds == Some(&[])` short-circuits to an empty map without
    /// touching the backend.
    async fn fetch(&self, allowed_ids: Option<&[String]>) -> HashMap<String, Vec<CheckResult>>;

    /// Inserts the batch, then prunes to [`HISTORY_RING_CAP`] in the same
    /// logical action. An insert failure logs and returns without pruning.
    async fn append(&self, results: &[CheckResult]);

    async fn prune(&self, limit: i64);
}

pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_via_procedure(
        &self,
        allowed_ids: Option<&[String]>,
    ) -> Result<Vec<HistoryRow>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, config_id, name, type, model, endpoint, group_name, status, \
             latency_ms, ping_latency_ms, checked_at, message \
             FROM fetch_history($1, $2)",
        )
        .bind(allowed_ids)
        .bind(HISTORY_RING_CAP as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_history_row).collect()
    }

    async fn fetch_via_raw_query(
        &self,
        allowed_ids: Option<&[String]>,
    ) -> Result<Vec<HistoryRow>, sqlx::Error> {
        let rows = if let Some(ids) = allowed_ids {
            sqlx::query(
                r#"
                SELECT h.id, h.config_id, c.name, c.type, c.model, c.endpoint,
                       c.group_name, h.status, h.latency_ms, h.ping_latency_ms,
                       h.checked_at, h.message
                FROM (
                    SELECT *, row_number() OVER (
                        PARTITION BY config_id ORDER BY checked_at DESC
                    ) AS rn
                    FROM check_history
                    WHERE config_id = ANY($1)
                ) h
                JOIN check_configs c ON c.id = h.config_id
                WHERE h.rn <= $2
                ORDER BY h.config_id, h.checked_at DESC
                "#,
            )
            .bind(ids)
            .bind(HISTORY_RING_CAP as i64)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                SELECT h.id, h.config_id, c.name, c.type, c.model, c.endpoint,
                       c.group_name, h.status, h.latency_ms, h.ping_latency_ms,
                       h.checked_at, h.message
                FROM (
                    SELECT *, row_number() OVER (
                        PARTITION BY config_id ORDER BY checked_at DESC
                    ) AS rn
                    FROM check_history
                ) h
                JOIN check_configs c ON c.id = h.config_id
                WHERE h.rn <= $1
                ORDER BY h.config_id, h.checked_at DESC
                "#,
            )
            .bind(HISTORY_RING_CAP as i64)
            .fetch_all(&self.pool)
            .await?
        };
        rows.into_iter().map(row_to_history_row).collect()
    }
}

struct HistoryRow {
    config_id: String,
    result: CheckResult,
}

fn row_to_history_row(row: sqlx::postgres::PgRow) -> Result<HistoryRow, sqlx::Error> {
    let config_id: String = row.try_get("config_id")?;
    let type_raw: String = row.try_get("type")?;
    let provider_type = ProviderType::from_str_loose(&type_raw).unwrap_or(ProviderType::Openai);
    let status_raw: String = row.try_get("status")?;
    let status = match status_raw.as_str() {
        "operational" => HealthStatus::Operational,
        "degraded" => HealthStatus::Degraded,
        _ => HealthStatus::Failed,
    };
    let checked_at: DateTime<Utc> = row.try_get("checked_at")?;

    Ok(HistoryRow {
        config_id: config_id.clone(),
        result: CheckResult {
            id: config_id,
            name: row.try_get("name")?,
            provider_type,
            endpoint: row.try_get("endpoint")?,
            model: row.try_get("model")?,
            status,
            latency_ms: row
                .try_get::<Option<i64>, _>("latency_ms")?
                .map(|v| v as u64),
            ping_latency_ms: row
                .try_get::<Option<i64>, _>("ping_latency_ms")?
                .map(|v| v as u64),
            checked_at,
            message: row.try_get("message")?,
            group_name: row.try_get("group_name")?,
            official_status: None,
        },
    })
}

fn is_missing_procedure(err: &sqlx::Error, procedure: &str) -> bool {
    err.to_string().contains(procedure)
}

#[async_trait::async_trait]
impl HistoryStore for PgHistoryStore {
    async fn fetch(&self, allowed_ids: Option<&[String]>) -> HashMap<String, Vec<CheckResult>> {
        if let Some(ids) = allowed_ids {
            if ids.is_empty() {
                return HashMap::new();
            }
        }

        let rows = match self.fetch_via_procedure(allowed_ids).await {
            Ok(rows) => rows,
            Err(err) if is_missing_procedure(&err, FETCH_PROCEDURE) => {
                match self.fetch_via_raw_query(allowed_ids).await {
                    Ok(rows) => rows,
                    Err(err) => {
                        warn!(error = %err, "history fetch raw-query fallback failed");
                        return HashMap::new();
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "history fetch failed");
                return HashMap::new();
            }
        };

        let mut by_id: HashMap<String, Vec<CheckResult>> = HashMap::new();
        for row in rows {
            by_id.entry(row.config_id).or_default().push(row.result);
        }
        for items in by_id.values_mut() {
            items.sort_by(|a, b| b.checked_at.cmp(&a.checked_at));
            items.truncate(HISTORY_RING_CAP);
        }
        by_id
    }

    async fn append(&self, results: &[CheckResult]) {
        if results.is_empty() {
            return;
        }

        for result in results {
            let insert = sqlx::query(
                r#"
                INSERT INTO check_history
                    (config_id, status, latency_ms, ping_latency_ms, checked_at, message)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(&result.id)
            .bind(status_db_value(result.status))
            .bind(result.latency_ms.map(|v| v as i64))
            .bind(result.ping_latency_ms.map(|v| v as i64))
            .bind(result.checked_at)
            .bind(&result.message)
            .execute(&self.pool)
            .await;

            if let Err(err) = insert {
                warn!(id = %result.id, error = %err, "history append failed, skipping prune");
                return;
            }
        }

        self.prune(HISTORY_RING_CAP as i64).await;
    }

    async fn prune(&self, limit: i64) {
        let procedure_result = sqlx::query("SELECT prune_history($1)")
            .bind(limit)
            .execute(&self.pool)
            .await;

        if let Err(err) = procedure_result {
            if !is_missing_procedure(&err, PRUNE_PROCEDURE) {
                warn!(error = %err, "history prune failed");
                return;
            }

            let raw_result = sqlx::query(
                r#"
                DELETE FROM check_history
                WHERE id IN (
                    SELECT id FROM (
                        SELECT id, row_number() OVER (
                            PARTITION BY config_id ORDER BY checked_at DESC
                        ) AS rn
                        FROM check_history
                    ) ranked
                    WHERE ranked.rn > $1
                )
                "#,
            )
            .bind(limit)
            .execute(&self.pool)
            .await;

            if let Err(err) = raw_result {
                warn!(error = %err, "history prune raw-query fallback failed");
            }
        }
    }
}

fn status_db_value(status: HealthStatus) -> &'static str {
    // `maintenance` is never persisted: it is synthesized at read time and
    // must not round-trip through this store.
    match status {
        HealthStatus::Operational => "operational",
        HealthStatus::Degraded => "degraded",
        HealthStatus::Failed | HealthStatus::Maintenance => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maintenance_never_maps_to_a_persisted_status() {
        assert_ne!(status_db_value(HealthStatus::Maintenance), "maintenance");
    }
}
