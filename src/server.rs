//! HTTP surface: thin wrappers around the check engine.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::engine::CheckEngine;
use crate::error::EngineError;
use crate::models::HealthStatus;

/// Default page size for the alert history endpoint.
const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CheckEngine>,
    pub templates: Arc<Handlebars<'static>>,
}

impl AppState {
    /// Build state with the embedded dashboard template registered.
    pub fn new(engine: Arc<CheckEngine>) -> anyhow::Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.register_template_string("dashboard", DASHBOARD_TEMPLATE)?;
        handlebars.register_template_string("index", INDEX_TEMPLATE)?;
        Ok(Self {
            engine,
            templates: Arc::new(handlebars),
        })
    }
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/tasks/run", post(run_check))
        .route("/status", get(get_status))
        .route("/alerts/history", get(get_alert_history))
        .route("/dashboard", get(dashboard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint for monitoring. Always 200.
async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus::ok())
}

/// Run a single product status check and send alerts if needed.
async fn run_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.engine.run_check().await {
        Ok(result) => (StatusCode::OK, Json(json!(result))),
        Err(e) => {
            error!(error = %e, "Manual check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": e.to_string()})),
            )
        }
    }
}

/// Get the current status summary.
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    match state.engine.status_summary().await {
        Ok(summary) => (StatusCode::OK, Json(json!(summary))),
        Err(e) => internal_error(&e),
    }
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

/// Get the history of sent alerts. The limit is capped server-side.
async fn get_alert_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    match state.engine.alert_history(limit).await {
        Ok(entries) => (StatusCode::OK, Json(json!(entries))),
        Err(e) => internal_error(&e),
    }
}

/// One point of the dashboard's 24h series.
#[derive(Debug, Serialize)]
struct ChartPoint {
    timestamp: String,
    disapproved: u64,
    limited: u64,
    suspended: u64,
}

/// Render the monitoring dashboard.
async fn dashboard(State(state): State<AppState>) -> Result<Html<String>, (StatusCode, Json<serde_json::Value>)> {
    let summary = state.engine.status_summary().await.map_err(|e| internal_error(&e))?;
    let recent_alerts = state.engine.alert_history(5).await.map_err(|e| internal_error(&e))?;
    let window = state.engine.window_24h().await.map_err(|e| internal_error(&e))?;

    let chart_data: Vec<ChartPoint> = window
        .iter()
        .map(|s| ChartPoint {
            timestamp: s.timestamp.to_rfc3339(),
            disapproved: s.totals.disapproved,
            limited: s.totals.limited,
            suspended: s.totals.suspended,
        })
        .collect();

    let thresholds = state.engine.thresholds();
    let data = json!({
        "status": summary,
        "recent_alerts": recent_alerts,
        "chart_data": chart_data,
        "settings": {
            "country": thresholds.country,
            "reporting_context": thresholds.reporting_context,
            "threshold_abs": thresholds.absolute_threshold,
            "threshold_delta": thresholds.delta_threshold,
        },
    });

    match state.templates.render("dashboard", &data) {
        Ok(html) => Ok(Html(html)),
        Err(e) => {
            error!(error = %e, "Failed to render dashboard");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": format!("Dashboard error: {e}")})),
            ))
        }
    }
}

/// Landing page listing the available endpoints and active configuration.
async fn root(State(state): State<AppState>) -> Html<String> {
    let thresholds = state.engine.thresholds();
    let data = json!({
        "country": thresholds.country,
        "reporting_context": thresholds.reporting_context,
        "threshold_abs": thresholds.absolute_threshold,
        "threshold_delta": thresholds.delta_threshold,
    });
    // The embedded template cannot fail to render against this data.
    Html(state.templates.render("index", &data).unwrap_or_default())
}

fn internal_error(e: &EngineError) -> (StatusCode, Json<serde_json::Value>) {
    error!(error = %e, "Request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"detail": e.to_string()})),
    )
}

/// Embedded dashboard template.
const DASHBOARD_TEMPLATE: &str = include_str!("../templates/dashboard.hbs");

/// Embedded landing page template.
const INDEX_TEMPLATE: &str = include_str!("../templates/index.hbs");
