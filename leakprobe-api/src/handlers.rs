use std::any::Any;
use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::task;
use tracing::{error, info};

use leakprobe_core::StatsSnapshot;

use crate::error::{ApiError, ErrorBody, GENERIC_ERROR};
use crate::state::ControlState;

pub(crate) const APP_NAME: &str = "Memory Leak Test Application";

/// Directory served by `/`.
pub(crate) const ENDPOINTS: &[(&str, &str)] = &[
    ("/health", "Liveness probe"),
    ("/ready", "Readiness probe"),
    ("/metrics", "Memory metrics"),
    ("/metrics/prometheus", "Prometheus exposition"),
    ("/cleanup", "Manual memory cleanup"),
];

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthReport {
    status: &'static str,
    timestamp: String,
    running: bool,
}

pub(crate) async fn health(State(state): State<ControlState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "healthy",
        timestamp: timestamp(),
        running: state.run_state.is_running(),
    })
}

#[derive(Debug, Serialize)]
pub(crate) struct ReadinessReport {
    status: &'static str,
    timestamp: String,
}

pub(crate) async fn ready(
    State(state): State<ControlState>,
) -> (StatusCode, Json<ReadinessReport>) {
    let ready = state.run_state.is_running();
    let (code, status) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    };
    (
        code,
        Json(ReadinessReport {
            status,
            timestamp: timestamp(),
        }),
    )
}

pub(crate) async fn metrics(
    State(state): State<ControlState>,
) -> Result<Json<StatsSnapshot>, ApiError> {
    let leak_enabled = state.config.leak_enabled;
    // Reads /proc; kept off the runtime threads.
    let snapshot = task::spawn_blocking(move || {
        StatsSnapshot::capture(&state.ledger, &state.sampler, &state.run_state, leak_enabled)
    })
    .await??;
    Ok(Json(snapshot))
}

pub(crate) async fn prometheus(State(state): State<ControlState>) -> Result<Response, ApiError> {
    let stats = state.ledger.stats();
    state.metrics.set_occupancy(stats.chunks, stats.allocated_mb);
    let body = state.metrics.gather_metrics()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

#[derive(Debug, Serialize)]
pub(crate) struct CleanupReport {
    cleanup: &'static str,
    timestamp: String,
}

pub(crate) async fn cleanup(
    State(state): State<ControlState>,
) -> (StatusCode, Json<CleanupReport>) {
    let ledger = state.ledger.clone();
    // Dropping up to the ceiling's worth of pages can take a while.
    let (code, cleanup) = match task::spawn_blocking(move || ledger.release_all()).await {
        Ok(summary) => {
            state.metrics.cleanups.inc();
            info!(
                blocks = summary.blocks,
                megabytes = summary.megabytes,
                "Manual cleanup completed"
            );
            (StatusCode::OK, "success")
        }
        Err(e) => {
            error!("Error during memory cleanup: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed")
        }
    };
    (
        code,
        Json(CleanupReport {
            cleanup,
            timestamp: timestamp(),
        }),
    )
}

#[derive(Debug, Serialize)]
pub(crate) struct EchoedConfig {
    leak_enabled: bool,
    max_memory_mb: u64,
    leak_rate_mb: u64,
    leak_interval_seconds: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct AppInfo {
    app: &'static str,
    version: &'static str,
    endpoints: BTreeMap<&'static str, &'static str>,
    config: EchoedConfig,
}

pub(crate) async fn root(State(state): State<ControlState>) -> Json<AppInfo> {
    let config = &state.config;
    Json(AppInfo {
        app: APP_NAME,
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ENDPOINTS.iter().copied().collect(),
        config: EchoedConfig {
            leak_enabled: config.leak_enabled,
            max_memory_mb: config.max_memory_mb,
            leak_rate_mb: config.leak_rate_mb,
            leak_interval_seconds: config.leak_interval_secs,
        },
    })
}

pub(crate) async fn not_found() -> (StatusCode, Json<ErrorBody>) {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new("Not found")))
}

pub(crate) async fn method_not_allowed() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody::new("Method not allowed")),
    )
}

/// Last line of defence: a panicking handler still yields a JSON 500.
pub(crate) fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {detail}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new(GENERIC_ERROR)),
    )
        .into_response()
}
