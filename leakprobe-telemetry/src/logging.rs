//! ## leakprobe-telemetry::logging
//! **Structured logging with `tracing`**
//!
//! The subscriber honours `RUST_LOG` and falls back to `info`. Lifecycle
//! events are emitted through [`EventLogger::log_event`] so they carry a
//! dedicated span and key/value metadata that log shippers can index.

use opentelemetry::KeyValue;
use tracing::{info_span, Instrument};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

/// Process-level milestones worth a structured record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeEvent {
    Started,
    Stopped,
}

impl ProbeEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            ProbeEvent::Started => "probe_started",
            ProbeEvent::Stopped => "probe_stopped",
        }
    }

    fn message(self) -> &'static str {
        match self {
            ProbeEvent::Started => "Probe accepting requests",
            ProbeEvent::Stopped => "Probe released its memory and exited",
        }
    }
}

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global fmt subscriber. Call once, from the binary.
    pub fn init() {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_thread_names(true)
            .with_span_events(FmtSpan::NONE)
            .init()
    }

    /// Records `event` once, flattening `metadata` into `key=value` pairs.
    pub async fn log_event(event: ProbeEvent, metadata: &[KeyValue]) {
        let span = info_span!(
            "probe_event",
            event_type = event.as_str(),
            otel.kind = "INTERNAL"
        );
        let fields = metadata
            .iter()
            .map(|kv| format!("{}={}", kv.key.as_str(), kv.value))
            .collect::<Vec<_>>()
            .join(" ");

        async {
            tracing::info!(%fields, "{}", event.message());
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_event_names() {
        assert_eq!(ProbeEvent::Started.as_str(), "probe_started");
        assert_eq!(ProbeEvent::Stopped.as_str(), "probe_stopped");
    }

    #[traced_test]
    #[test]
    fn test_logging() {
        tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(EventLogger::log_event(
                ProbeEvent::Started,
                &[
                    KeyValue::new("port", 8080_i64),
                    KeyValue::new("leak_enabled", true),
                ],
            ));
        assert!(logs_contain("Probe accepting requests"));
        assert!(logs_contain("probe_started"));
        assert!(logs_contain("port=8080 leak_enabled=true"));
    }
}
