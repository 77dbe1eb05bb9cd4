//! HTTP surface: the dashboard/group endpoints plus a liveness probe,
//! wrapped in request tracing and permissive CORS for browser clients.

use crate::core::snapshot::RefreshMode;
use crate::error::AppError;
use crate::messages;
use crate::model::GroupDashboardData;
use crate::runtime::RuntimeContext;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn build_router(context: Arc<RuntimeContext>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/group/:group_name", get(get_group_dashboard))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(context)
}

async fn healthz() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn get_dashboard(State(context): State<Arc<RuntimeContext>>) -> impl IntoResponse {
    let data = context
        .dashboard
        .load_dashboard_data(RefreshMode::Always)
        .await;
    Json(data)
}

async fn get_group_dashboard(
    State(context): State<Arc<RuntimeContext>>,
    Path(group_name): Path<String>,
) -> Result<Json<GroupDashboardData>, AppError> {
    context
        .dashboard
        .load_group_dashboard_data(&group_name, RefreshMode::Always)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(messages::GROUP_NOT_FOUND.to_string()))
}
