use std::{
    collections::BTreeMap,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Mutex},
};

use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    config::{Configuration, HeuristicParams},
    heuristics::{
        error::{HeuristicError, invalid_template, unknown_heuristic},
        template::{CustomTemplate, DecisionFunction, HeuristicTemplate},
        types::BuiltinHeuristic,
    },
    observability::{LogLevel, ObservabilitySink},
};

const COMPONENT: &str = "heuristic_compiler";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeuristicSummary {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub custom: bool,
    pub compiled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerStats {
    pub cache_size: usize,
    pub cached_ids: Vec<String>,
    pub builtin_templates: usize,
    pub custom_templates: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_clears: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidationReport {
    pub cleared: usize,
    pub recompiled: BTreeMap<String, Result<(), String>>,
}

impl InvalidationReport {
    pub fn all_recompiled(&self) -> bool {
        self.recompiled.values().all(Result::is_ok)
    }
}

#[derive(Default)]
struct CompilerState {
    templates: BTreeMap<String, HeuristicTemplate>,
    cache: BTreeMap<String, Arc<DecisionFunction>>,
    cache_hits: u64,
    cache_misses: u64,
    cache_clears: u64,
}

/// Template registry plus compiled-function cache.
///
/// The cache is keyed by heuristic id alone: a cached id is returned as-is no
/// matter which params the caller passes, until the cache is cleared. All state
/// sits behind one lock so a config-driven clear-and-recompile is observed by
/// other callers either entirely before or entirely after.
pub struct HeuristicCompiler {
    state: Mutex<CompilerState>,
    observability: Arc<dyn ObservabilitySink>,
}

impl HeuristicCompiler {
    pub fn new(observability: Arc<dyn ObservabilitySink>) -> Self {
        let templates = BuiltinHeuristic::ALL
            .into_iter()
            .map(|builtin| (builtin.id().to_string(), HeuristicTemplate::builtin(builtin)))
            .collect();

        Self {
            state: Mutex::new(CompilerState {
                templates,
                ..CompilerState::default()
            }),
            observability,
        }
    }

    pub fn compile(
        &self,
        id: &str,
        params: &HeuristicParams,
    ) -> Result<Arc<DecisionFunction>, HeuristicError> {
        let mut state = self.state.lock().expect("lock poisoned");
        self.compile_locked(&mut state, id, params)
    }

    pub fn compile_default(&self, id: &str) -> Result<Arc<DecisionFunction>, HeuristicError> {
        self.compile(id, &HeuristicParams::default())
    }

    /// Compiles every request independently; a failed id maps to `None`.
    pub fn compile_multiple(
        &self,
        requests: &[(String, HeuristicParams)],
    ) -> BTreeMap<String, Option<Arc<DecisionFunction>>> {
        let mut state = self.state.lock().expect("lock poisoned");
        requests
            .iter()
            .map(|(id, params)| {
                let compiled = match self.compile_locked(&mut state, id, params) {
                    Ok(function) => Some(function),
                    Err(err) => {
                        self.observability.log(
                            LogLevel::Warn,
                            COMPONENT,
                            "heuristic_compile_failed",
                            &json!({ "heuristicId": id, "error": err.to_string() }),
                        );
                        None
                    }
                };
                (id.clone(), compiled)
            })
            .collect()
    }

    pub fn register_custom_template(
        &self,
        id: &str,
        template: CustomTemplate,
    ) -> Result<(), HeuristicError> {
        if id.trim().is_empty() {
            return Err(invalid_template("Template id cannot be empty"));
        }
        if BuiltinHeuristic::from_id(id).is_some() {
            return Err(invalid_template(format!(
                "Template id {id} is reserved for a built-in heuristic"
            )));
        }
        template.validate_shape()?;

        let mut state = self.state.lock().expect("lock poisoned");
        let name = template.name.clone();
        state
            .templates
            .insert(id.to_string(), HeuristicTemplate::Custom(template));
        state.cache.remove(id);
        drop(state);

        self.observability.log(
            LogLevel::Info,
            COMPONENT,
            "custom_template_registered",
            &json!({ "heuristicId": id, "name": name }),
        );
        Ok(())
    }

    pub fn clear_cache(&self, reason: &str) -> usize {
        let mut state = self.state.lock().expect("lock poisoned");
        self.clear_locked(&mut state, reason)
    }

    /// Clears the cache and, when `recompile` is set, rebuilds the built-ins
    /// from `new_config` before releasing the lock.
    pub fn invalidate_on_config_change(
        &self,
        new_config: Option<&Configuration>,
        recompile: bool,
    ) -> InvalidationReport {
        let mut state = self.state.lock().expect("lock poisoned");
        let cleared = self.clear_locked(&mut state, "configuration changed");

        let mut recompiled = BTreeMap::new();
        if recompile {
            for builtin in BuiltinHeuristic::ALL {
                let params = new_config
                    .map(|config| config.params_for(builtin.id()))
                    .unwrap_or_default();
                let outcome = self
                    .compile_locked(&mut state, builtin.id(), &params)
                    .map(|_| ())
                    .map_err(|err| err.to_string());
                recompiled.insert(builtin.id().to_string(), outcome);
            }
        }
        drop(state);

        let failed = recompiled.values().filter(|outcome| outcome.is_err()).count();
        self.observability.log(
            if failed == 0 { LogLevel::Info } else { LogLevel::Warn },
            COMPONENT,
            "cache_invalidated_on_config_change",
            &json!({
                "cleared": cleared,
                "recompile": recompile,
                "recompiled": recompiled.len() - failed,
                "failed": failed,
            }),
        );

        InvalidationReport {
            cleared,
            recompiled,
        }
    }

    pub fn available_heuristics(&self) -> Vec<HeuristicSummary> {
        let state = self.state.lock().expect("lock poisoned");
        state
            .templates
            .iter()
            .map(|(id, template)| summarize(&state, id, template))
            .collect()
    }

    pub fn heuristic_metadata(&self, id: &str) -> Option<HeuristicSummary> {
        let state = self.state.lock().expect("lock poisoned");
        state
            .templates
            .get(id)
            .map(|template| summarize(&state, id, template))
    }

    pub fn stats(&self) -> CompilerStats {
        let state = self.state.lock().expect("lock poisoned");
        let custom_templates = state
            .templates
            .values()
            .filter(|template| template.is_custom())
            .count();
        CompilerStats {
            cache_size: state.cache.len(),
            cached_ids: state.cache.keys().cloned().collect(),
            builtin_templates: state.templates.len() - custom_templates,
            custom_templates,
            cache_hits: state.cache_hits,
            cache_misses: state.cache_misses,
            cache_clears: state.cache_clears,
        }
    }

    fn compile_locked(
        &self,
        state: &mut CompilerState,
        id: &str,
        params: &HeuristicParams,
    ) -> Result<Arc<DecisionFunction>, HeuristicError> {
        if let Some(cached) = state.cache.get(id) {
            state.cache_hits += 1;
            if cached.config != *params && *params != HeuristicParams::default() {
                tracing::debug!(
                    target: "heuristics",
                    heuristic_id = id,
                    "cached_function_returned_for_different_params"
                );
            }
            self.observability
                .record_cache_hit(&json!({ "heuristicId": id, "cacheSize": state.cache.len() }));
            return Ok(Arc::clone(cached));
        }

        state.cache_misses += 1;
        self.observability
            .record_cache_miss(&json!({ "heuristicId": id, "cacheSize": state.cache.len() }));

        let template = state
            .templates
            .get(id)
            .cloned()
            .ok_or_else(|| unknown_heuristic(id))?;

        let operation_id = format!("compile_{id}_{}", Uuid::now_v7());
        self.observability.start_timer(
            &operation_id,
            "heuristic_compilation",
            &json!({ "heuristicId": id }),
        );

        let compiled = catch_unwind(AssertUnwindSafe(|| template.compile(id, params)))
            .unwrap_or_else(|_| {
                Err(invalid_template(format!(
                    "compile function for {id} panicked"
                )))
            });
        let duration_ms = self
            .observability
            .end_timer(&operation_id, &json!({ "heuristicId": id }));
        let function = Arc::new(compiled?);

        state.cache.insert(id.to_string(), Arc::clone(&function));
        self.observability.log(
            LogLevel::Info,
            COMPONENT,
            "heuristic_compiled",
            &json!({
                "heuristicId": id,
                "name": function.name,
                "domain": function.domain,
                "durationMs": duration_ms,
                "cacheSize": state.cache.len(),
            }),
        );
        Ok(function)
    }

    fn clear_locked(&self, state: &mut CompilerState, reason: &str) -> usize {
        let cleared = state.cache.len();
        state.cache.clear();
        state.cache_clears += 1;
        self.observability.log(
            LogLevel::Info,
            COMPONENT,
            "cache_cleared",
            &json!({ "cleared": cleared, "reason": reason }),
        );
        cleared
    }
}

fn summarize(state: &CompilerState, id: &str, template: &HeuristicTemplate) -> HeuristicSummary {
    HeuristicSummary {
        id: id.to_string(),
        name: template.name().to_string(),
        domain: template.domain().to_string(),
        custom: template.is_custom(),
        compiled: state.cache.contains_key(id),
    }
}
