//! Config repository: loads enabled provider configurations from Postgres.
//! Backend failures degrade to an empty list with a logged warning rather
//! than propagating, since no caller can usefully react to a transient
//! config-load failure mid-poll.

use crate::error::AppError;
use crate::model::{ProviderConfig, ProviderType};
use serde_json::Value;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tracing::warn;

#[async_trait::async_trait]
pub trait ConfigRepository: Send + Sync {
    /// Returns only `enabled = true` records, stable-ordered by id. Never
    /// fails outward: any backend error is logged and yields an empty list.
    async fn load_enabled_configs(&self) -> Vec<ProviderConfig>;
}

pub struct PgConfigRepository {
    pool: PgPool,
}

impl PgConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConfigRepository for PgConfigRepository {
    async fn load_enabled_configs(&self) -> Vec<ProviderConfig> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, type, model, endpoint, api_key, is_maintenance,
                   request_header, metadata, group_name
            FROM check_configs
            WHERE enabled = true
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await;

        let rows = match rows {
            Ok(rows) => rows,
            Err(err) => {
                warn!(error = %err, "config repository: load_enabled_configs failed, degrading to empty");
                return Vec::new();
            }
        };

        rows.into_iter()
            .filter_map(|row| {
                let provider_type_raw: String = row.try_get("type").ok()?;
                let provider_type = ProviderType::from_str_loose(&provider_type_raw)?;
                let request_headers: Option<Value> = row.try_get("request_header").ok();
                let metadata: Option<Value> = row.try_get("metadata").ok();

                Some(ProviderConfig {
                    id: row.try_get::<String, _>("id").ok()?,
                    name: row.try_get("name").ok()?,
                    provider_type,
                    endpoint: row.try_get("endpoint").ok(),
                    model: row.try_get("model").ok()?,
                    api_key: row.try_get("api_key").ok()?,
                    is_maintenance: row.try_get("is_maintenance").ok()?,
                    request_headers: request_headers.and_then(|v| {
                        serde_json::from_value::<HashMap<String, String>>(v)
                            .map_err(|err| {
                                warn!(error = %AppError::from(err), "config request_header column did not decode, dropping");
                            })
                            .ok()
                    }),
                    metadata: metadata.and_then(|v| v.as_object().cloned()),
                    group_name: row.try_get("group_name").ok(),
                })
            })
            .collect()
    }
}
