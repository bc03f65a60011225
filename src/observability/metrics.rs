use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};

pub const CACHE_HITS_METRIC: &str = "hybrid_ops_cache_hits_total";
pub const CACHE_MISSES_METRIC: &str = "hybrid_ops_cache_misses_total";
pub const FALLBACKS_METRIC: &str = "hybrid_ops_fallbacks_total";
pub const OPERATION_DURATION_METRIC: &str = "hybrid_ops_operation_duration_ms";

pub fn describe_metrics() {
    describe_counter!(
        CACHE_HITS_METRIC,
        Unit::Count,
        "Compiled heuristic lookups served from cache."
    );
    describe_counter!(
        CACHE_MISSES_METRIC,
        Unit::Count,
        "Compiled heuristic lookups that required a template compile."
    );
    describe_counter!(
        FALLBACKS_METRIC,
        Unit::Count,
        "Degradation events such as invalid config or triggered vetoes."
    );
    describe_histogram!(
        OPERATION_DURATION_METRIC,
        Unit::Milliseconds,
        "Duration of timed operations by operation type."
    );
}

pub fn record_cache_hit() {
    counter!(CACHE_HITS_METRIC).increment(1);
}

pub fn record_cache_miss() {
    counter!(CACHE_MISSES_METRIC).increment(1);
}

pub fn record_fallback(reason: &str) {
    counter!(FALLBACKS_METRIC, "reason" => reason.to_string()).increment(1);
}

pub fn record_operation_duration(operation_type: &str, duration_ms: f64) {
    histogram!(OPERATION_DURATION_METRIC, "operation" => operation_type.to_string())
        .record(duration_ms);
}
