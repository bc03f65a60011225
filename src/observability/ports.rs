use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Collaborator interface the core reports into.
///
/// Every method is fire-and-forget: implementations swallow their own failures
/// so a broken sink can never change the outcome of a core operation.
pub trait ObservabilitySink: Send + Sync {
    fn log(&self, level: LogLevel, component: &str, event: &str, metadata: &Value);

    fn start_timer(&self, operation_id: &str, operation_type: &str, metadata: &Value);

    /// Returns the elapsed milliseconds, or `None` when the timer was never started.
    fn end_timer(&self, operation_id: &str, metadata: &Value) -> Option<f64>;

    fn record_cache_hit(&self, metadata: &Value);

    fn record_cache_miss(&self, metadata: &Value);

    fn record_fallback(&self, reason: &str, metadata: &Value);
}
