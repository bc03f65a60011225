use std::{collections::HashMap, sync::Mutex, time::Instant};

use serde_json::Value;

use crate::observability::{
    metrics,
    ports::{LogLevel, ObservabilitySink},
};

struct PendingTimer {
    operation_type: String,
    started_at: Instant,
}

/// Sink that turns collaborator calls into `tracing` events and `metrics` samples.
#[derive(Default)]
pub struct TracingObservability {
    timers: Mutex<HashMap<String, PendingTimer>>,
}

impl TracingObservability {
    pub fn new() -> Self {
        metrics::describe_metrics();
        Self::default()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.lock().map(|timers| timers.len()).unwrap_or(0)
    }
}

impl ObservabilitySink for TracingObservability {
    fn log(&self, level: LogLevel, component: &str, event: &str, metadata: &Value) {
        match level {
            LogLevel::Debug => tracing::debug!(
                target: "observability",
                component = component,
                metadata = %metadata,
                "{event}"
            ),
            LogLevel::Info => tracing::info!(
                target: "observability",
                component = component,
                metadata = %metadata,
                "{event}"
            ),
            LogLevel::Warn => tracing::warn!(
                target: "observability",
                component = component,
                metadata = %metadata,
                "{event}"
            ),
            LogLevel::Error => tracing::error!(
                target: "observability",
                component = component,
                metadata = %metadata,
                "{event}"
            ),
        }
    }

    fn start_timer(&self, operation_id: &str, operation_type: &str, metadata: &Value) {
        let Ok(mut timers) = self.timers.lock() else {
            return;
        };
        timers.insert(
            operation_id.to_string(),
            PendingTimer {
                operation_type: operation_type.to_string(),
                started_at: Instant::now(),
            },
        );
        tracing::trace!(
            target: "observability",
            operation_id = operation_id,
            operation_type = operation_type,
            metadata = %metadata,
            "timer_started"
        );
    }

    fn end_timer(&self, operation_id: &str, metadata: &Value) -> Option<f64> {
        let timer = self.timers.lock().ok()?.remove(operation_id)?;
        let duration_ms = timer.started_at.elapsed().as_secs_f64() * 1000.0;
        metrics::record_operation_duration(&timer.operation_type, duration_ms);
        tracing::debug!(
            target: "observability",
            operation_id = operation_id,
            operation_type = %timer.operation_type,
            duration_ms = duration_ms,
            metadata = %metadata,
            "timer_ended"
        );
        Some(duration_ms)
    }

    fn record_cache_hit(&self, metadata: &Value) {
        metrics::record_cache_hit();
        tracing::debug!(target: "observability", metadata = %metadata, "cache_hit");
    }

    fn record_cache_miss(&self, metadata: &Value) {
        metrics::record_cache_miss();
        tracing::debug!(target: "observability", metadata = %metadata, "cache_miss");
    }

    fn record_fallback(&self, reason: &str, metadata: &Value) {
        metrics::record_fallback(reason);
        tracing::warn!(
            target: "observability",
            reason = reason,
            metadata = %metadata,
            "fallback_recorded"
        );
    }
}
