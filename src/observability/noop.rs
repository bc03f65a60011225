use serde_json::Value;

use crate::observability::ports::{LogLevel, ObservabilitySink};

#[derive(Debug, Clone, Default)]
pub struct NoopObservability;

impl ObservabilitySink for NoopObservability {
    fn log(&self, _level: LogLevel, _component: &str, _event: &str, _metadata: &Value) {}

    fn start_timer(&self, _operation_id: &str, _operation_type: &str, _metadata: &Value) {}

    fn end_timer(&self, _operation_id: &str, _metadata: &Value) -> Option<f64> {
        None
    }

    fn record_cache_hit(&self, _metadata: &Value) {}

    fn record_cache_miss(&self, _metadata: &Value) {}

    fn record_fallback(&self, _reason: &str, _metadata: &Value) {}
}
