mod builtins;
mod compiler;

use std::sync::Arc;

use hybrid_ops::{
    heuristics::HeuristicCompiler,
    observability::{NoopObservability, ObservabilitySink},
};

pub fn compiler() -> HeuristicCompiler {
    let observability: Arc<dyn ObservabilitySink> = Arc::new(NoopObservability);
    HeuristicCompiler::new(observability)
}
