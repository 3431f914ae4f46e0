//! # leakprobe API
//!
//! The HTTP control surface: liveness, readiness, memory metrics and manual
//! release, served with axum.
//!
//! Routing is a fixed table; anything outside it falls through to a JSON 404.
//! Handler errors and panics are turned into JSON 500s at the router boundary,
//! so one bad request never takes the server down.

mod error;
mod handlers;
mod state;

use axum::http::{header, HeaderValue};
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::ControlState;

/// Builds the control surface for `state`.
pub fn router(state: ControlState) -> Router {
    with_boundary(routes().with_state(state))
}

fn routes() -> Router<ControlState> {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/metrics", get(handlers::metrics))
        .route("/metrics/prometheus", get(handlers::prometheus))
        .route("/cleanup", get(handlers::cleanup))
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .fallback(handlers::not_found)
}

fn with_boundary(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache"),
            ))
            .layer(CatchPanicLayer::custom(handlers::panic_response)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use serde_json::Value;
    use tower::ServiceExt;

    use leakprobe_config::ProbeConfig;
    use leakprobe_core::{AllocationLedger, ProcessSampler, RunState};
    use leakprobe_telemetry::MetricsRecorder;

    fn state(config: ProbeConfig) -> ControlState {
        let ledger = Arc::new(AllocationLedger::new(config.max_memory_mb));
        ControlState::new(
            Arc::new(config),
            ledger,
            Arc::new(RunState::new()),
            Arc::new(ProcessSampler::new().unwrap()),
            MetricsRecorder::new().unwrap(),
        )
    }

    fn default_state() -> ControlState {
        state(ProbeConfig::new(true, 4, 1.0, 10, 0))
    }

    async fn get(app: &Router, uri: &str) -> Response {
        app.clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn assert_json_headers(response: &Response) {
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    }

    #[tokio::test]
    async fn test_health_reports_running() {
        let app = router(default_state());
        let response = get(&app, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_json_headers(&response);

        let body = json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["running"], true);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_ready_follows_run_state() {
        let state = default_state();
        let app = router(state.clone());

        let response = get(&app, "/ready").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["status"], "ready");

        state.run_state.stop();
        let response = get(&app, "/ready").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_json_headers(&response);
        assert_eq!(json(response).await["status"], "not ready");

        // Liveness stays 200 after readiness drops.
        let response = get(&app, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["running"], false);
    }

    #[tokio::test]
    async fn test_metrics_matches_ledger() {
        let state = default_state();
        state.ledger.allocate(4).unwrap();
        state.ledger.allocate(4).unwrap();
        let app = router(state.clone());

        let response = get(&app, "/metrics").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_json_headers(&response);

        let body = json(response).await;
        assert_eq!(body["allocated_chunks"], 2);
        assert_eq!(body["allocated_memory_mb"], state.ledger.stats().allocated_mb);
        assert_eq!(body["leak_enabled"], true);
        assert_eq!(body["max_memory_mb"], 10);
        for field in [
            "process_memory_mb",
            "process_virtual_memory_mb",
            "memory_percent",
            "uptime_seconds",
        ] {
            assert!(body[field].is_number(), "{field} missing");
        }
    }

    #[tokio::test]
    async fn test_cleanup_releases_everything() {
        let state = default_state();
        state.ledger.allocate(4).unwrap();
        let app = router(state.clone());

        let response = get(&app, "/cleanup").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_json_headers(&response);
        assert_eq!(json(response).await["cleanup"], "success");

        assert_eq!(state.ledger.stats().allocated_mb, 0);
        assert_eq!(state.ledger.stats().chunks, 0);
        assert_eq!(state.metrics.cleanups.get(), 1);

        // Releasing an empty ledger still succeeds.
        let response = get(&app, "/cleanup").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.ledger.release_count(), 2);
    }

    #[tokio::test]
    async fn test_root_describes_app() {
        let app = router(state(ProbeConfig::new(false, 7, 2.5, 300, 0)));
        let response = get(&app, "/").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["app"], handlers::APP_NAME);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["endpoints"]["/ready"], "Readiness probe");
        assert_eq!(body["config"]["leak_enabled"], false);
        assert_eq!(body["config"]["leak_rate_mb"], 7);
        assert_eq!(body["config"]["max_memory_mb"], 300);
        assert_eq!(body["config"]["leak_interval_seconds"], 2.5);
    }

    #[tokio::test]
    async fn test_every_listed_endpoint_is_routed() {
        let app = router(default_state());
        for (path, _) in handlers::ENDPOINTS {
            let response = get(&app, path).await;
            assert_ne!(response.status(), StatusCode::NOT_FOUND, "{path}");
        }
    }

    #[tokio::test]
    async fn test_query_string_does_not_affect_routing() {
        let app = router(default_state());
        let response = get(&app, "/health?verbose=1").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let app = router(default_state());
        let response = get(&app, "/does-not-exist").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_json_headers(&response);
        assert_eq!(json(response).await["error"], "Not found");
    }

    #[tokio::test]
    async fn test_wrong_method_is_json_405() {
        let state = default_state();
        state.ledger.allocate(4).unwrap();
        let app = router(state.clone());

        for (method, uri) in [("POST", "/cleanup"), ("DELETE", "/health")] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
            assert_json_headers(&response);
            assert_eq!(json(response).await["error"], "Method not allowed");
        }

        // The rejected POST must not have released anything.
        assert_eq!(state.ledger.stats().allocated_mb, 4);
    }

    #[tokio::test]
    async fn test_prometheus_exposition() {
        let state = default_state();
        state.ledger.allocate(4).unwrap();
        let app = router(state);

        let response = get(&app, "/metrics/prometheus").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("leakprobe_allocated_megabytes 4"));
        assert!(text.contains("leakprobe_allocated_chunks 1"));
    }

    async fn boom() -> &'static str {
        panic!("boom")
    }

    #[tokio::test]
    async fn test_panicking_handler_becomes_json_500() {
        let app = with_boundary(
            routes()
                .route("/boom", axum::routing::get(boom))
                .with_state(default_state()),
        );

        let response = get(&app, "/boom").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_json_headers(&response);
        assert_eq!(json(response).await["error"], "Internal server error");

        // The router keeps serving afterwards.
        let response = get(&app, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
