use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock, Weak},
    time::Instant,
};

use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    config::{
        ConfigDocument, ConfigSource, ConfigStore, ConfigSubscriber, Configuration, EnvOverrides,
        validated_configuration,
    },
    heuristics::{BuiltinHeuristic, DecisionFunction, HeuristicCompiler},
    mind::{
        agent::{Agent, AgentCapabilities, DecisionFunctions, ValidationRules},
        artifacts::{
            ArtifactLocations, DECISION_HEURISTICS_PATH, DEFAULT_MIND_ID, META_AXIOMS_PATH,
            MarkdownArtifact, MindArtifacts, SYSTEM_PROMPT_PATH, TASK_PLAYBOOK_PATH,
        },
        error::{MindError, artifact_read, compilation, load_failed, not_loaded},
    },
    observability::{LogLevel, ObservabilitySink},
};

const COMPONENT: &str = "mind_loader";

#[derive(Debug, Clone)]
pub struct MindLoaderOptions {
    pub root: PathBuf,
    pub mind_id: String,
    pub env: EnvOverrides,
}

impl MindLoaderOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mind_id: DEFAULT_MIND_ID.to_string(),
            env: EnvOverrides::from_env(),
        }
    }

    pub fn with_mind_id(mut self, mind_id: impl Into<String>) -> Self {
        self.mind_id = mind_id.into();
        self
    }

    pub fn with_env(mut self, env: EnvOverrides) -> Self {
        self.env = env;
        self
    }
}

/// Everything a loaded mind exposes, swapped as a whole on hot reload.
#[derive(Debug, Clone)]
pub struct MindBundle {
    pub artifacts: Arc<MindArtifacts>,
    pub decision_functions: DecisionFunctions,
    pub config: Option<Arc<Configuration>>,
    pub config_source: ConfigSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MindMetadata {
    pub loaded: bool,
    pub mind_id: String,
    pub base_path: Option<PathBuf>,
    pub artifacts: Vec<&'static str>,
    pub heuristics: Vec<String>,
    pub config_source: ConfigSource,
    pub config_version: Option<String>,
}

#[derive(Debug, Clone)]
struct ActiveConfig {
    config: Option<Arc<Configuration>>,
    source: ConfigSource,
}

impl Default for ActiveConfig {
    fn default() -> Self {
        Self {
            config: None,
            source: ConfigSource::Defaults,
        }
    }
}

#[derive(Default)]
struct LoaderState {
    active: ActiveConfig,
    bundle: Option<Arc<MindBundle>>,
}

pub struct MindLoader {
    options: MindLoaderOptions,
    locations: ArtifactLocations,
    store: Arc<ConfigStore>,
    compiler: Arc<HeuristicCompiler>,
    observability: Arc<dyn ObservabilitySink>,
    state: RwLock<LoaderState>,
    artifact_cache: Mutex<HashMap<String, Arc<MarkdownArtifact>>>,
    load_guard: tokio::sync::Mutex<()>,
}

impl MindLoader {
    /// Builds the loader and subscribes it to configuration changes.
    pub fn new(
        store: Arc<ConfigStore>,
        compiler: Arc<HeuristicCompiler>,
        observability: Arc<dyn ObservabilitySink>,
        options: MindLoaderOptions,
    ) -> Arc<Self> {
        let locations = ArtifactLocations::for_mind(&options.root, &options.mind_id);
        let loader = Arc::new(Self {
            options,
            locations,
            store: Arc::clone(&store),
            compiler,
            observability,
            state: RwLock::new(LoaderState::default()),
            artifact_cache: Mutex::new(HashMap::new()),
            load_guard: tokio::sync::Mutex::new(()),
        });

        store.watch(Arc::new(HotReload {
            loader: Arc::downgrade(&loader),
        }));
        loader
    }

    pub fn mind_id(&self) -> &str {
        &self.options.mind_id
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().expect("lock poisoned").bundle.is_some()
    }

    pub fn bundle(&self) -> Option<Arc<MindBundle>> {
        self.state.read().expect("lock poisoned").bundle.clone()
    }

    pub fn compiler(&self) -> &Arc<HeuristicCompiler> {
        &self.compiler
    }

    pub fn config_source(&self) -> ConfigSource {
        self.state.read().expect("lock poisoned").active.source
    }

    pub fn active_config(&self) -> Option<Arc<Configuration>> {
        self.state.read().expect("lock poisoned").active.config.clone()
    }

    /// Configuration, then artifacts, then compilation. A no-op once loaded.
    pub async fn load(&self) -> Result<(), MindError> {
        let _guard = self.load_guard.lock().await;
        if self.is_loaded() {
            tracing::debug!(target: "mind", mind_id = %self.options.mind_id, "mind_already_loaded");
            self.observability.record_cache_hit(&json!({
                "component": COMPONENT,
                "operation": "load",
            }));
            return Ok(());
        }

        let started = Instant::now();
        let operation_id = format!("mind_load_{}", Uuid::now_v7());
        self.observability
            .start_timer(&operation_id, "mind_load", &json!({ "cached": false }));
        self.observability.log(
            LogLevel::Info,
            COMPONENT,
            "mind_loading_started",
            &json!({ "mindId": self.options.mind_id }),
        );

        let active = self.load_configuration();
        self.state.write().expect("lock poisoned").active = active.clone();

        let outcome = match self.load_artifacts().await {
            Ok(artifacts) => {
                // Anything compiled before this load ran without the active params.
                self.refresh_compiled(&active);
                self.compile_bundle(Arc::new(artifacts), &active).map(Arc::new)
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(bundle) => {
                self.state.write().expect("lock poisoned").bundle = Some(bundle);
                let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
                self.observability.end_timer(
                    &operation_id,
                    &json!({
                        "configSource": active.source,
                        "cachedArtifacts": self.cached_artifact_count(),
                    }),
                );
                tracing::info!(
                    target: "mind",
                    mind_id = %self.options.mind_id,
                    config_source = %active.source,
                    duration_ms = duration_ms,
                    "mind_loaded"
                );
                Ok(())
            }
            Err(err) => {
                self.observability.end_timer(
                    &operation_id,
                    &json!({ "success": false, "error": err.message }),
                );
                self.observability.log(
                    LogLevel::Error,
                    COMPONENT,
                    "mind_loading_failed",
                    &json!({ "error": err.message, "kind": err.kind }),
                );
                Err(load_failed(&err))
            }
        }
    }

    pub fn apply_to_agent(&self, agent: &mut Agent) -> Result<(), MindError> {
        let bundle = self.bundle().ok_or_else(not_loaded)?;
        agent.capabilities = Some(AgentCapabilities {
            cognitive_layer: Arc::clone(&bundle.artifacts),
            decision_functions: bundle.decision_functions.clone(),
            validation_rules: Arc::new(ValidationRules::extract()),
        });
        tracing::info!(
            target: "mind",
            mind_id = %self.options.mind_id,
            agent_id = %agent.id,
            "mind_applied_to_agent"
        );
        Ok(())
    }

    pub fn metadata(&self) -> MindMetadata {
        let state = self.state.read().expect("lock poisoned");
        let bundle = state.bundle.as_ref();
        MindMetadata {
            loaded: bundle.is_some(),
            mind_id: self.options.mind_id.clone(),
            base_path: bundle.map(|bundle| bundle.artifacts.base_path.clone()),
            artifacts: bundle
                .map(|bundle| bundle.artifacts.keys())
                .unwrap_or_default(),
            heuristics: self
                .compiler
                .available_heuristics()
                .into_iter()
                .map(|summary| summary.id)
                .collect(),
            config_source: state.active.source,
            config_version: state
                .active
                .config
                .as_ref()
                .map(|config| config.version.clone()),
        }
    }

    /// Drops the bundle and the artifact cache; the next `load()` starts over.
    pub fn reset(&self) {
        {
            let mut state = self.state.write().expect("lock poisoned");
            state.bundle = None;
            state.active = ActiveConfig::default();
        }
        self.artifact_cache.lock().expect("lock poisoned").clear();
        tracing::info!(target: "mind", mind_id = %self.options.mind_id, "mind_reset");
    }

    fn cached_artifact_count(&self) -> usize {
        self.artifact_cache.lock().expect("lock poisoned").len()
    }

    fn load_configuration(&self) -> ActiveConfig {
        let file_document = self.store.get();
        let overlaid = self.options.env.apply(
            file_document.as_ref().map(|document| &document.value),
            Configuration::skeleton_value,
        );

        let (value, source) = match (overlaid, file_document) {
            (Some(value), _) => (value, ConfigSource::EnvAndFile),
            (None, Some(document)) => (document.value.clone(), ConfigSource::File),
            (None, None) => {
                tracing::info!(target: "mind", reason = "no_file_found", "config_using_defaults");
                return ActiveConfig::default();
            }
        };

        match validated_configuration(&value) {
            Ok(config) => {
                tracing::info!(target: "mind", source = %source, "config_validated");
                ActiveConfig {
                    config: Some(Arc::new(config)),
                    source,
                }
            }
            Err(errors) => {
                self.observability.record_fallback(
                    "config_validation_failed",
                    &json!({
                        "component": COMPONENT,
                        "errorsCount": errors.len(),
                        "configSource": source,
                    }),
                );
                self.observability.log(
                    LogLevel::Warn,
                    COMPONENT,
                    "config_validation_failed",
                    &json!({ "errors": errors, "fallback": "defaults" }),
                );
                ActiveConfig::default()
            }
        }
    }

    async fn load_artifacts(&self) -> Result<MindArtifacts, MindError> {
        let base = self.locations.resolve().await?;
        let meta_axioms = self.load_markdown(&base.path, META_AXIOMS_PATH).await?;
        let decision_heuristics = self
            .load_markdown(&base.path, DECISION_HEURISTICS_PATH)
            .await?;
        let task_playbook = self.load_markdown(&base.path, TASK_PLAYBOOK_PATH).await?;

        let prompt_path = base.path.join(SYSTEM_PROMPT_PATH);
        let system_prompt = tokio::fs::read_to_string(&prompt_path)
            .await
            .map_err(|err| artifact_read(&prompt_path, err))?;

        Ok(MindArtifacts {
            base_path: base.path,
            meta_axioms,
            decision_heuristics,
            task_playbook,
            system_prompt: Arc::from(system_prompt),
        })
    }

    async fn load_markdown(
        &self,
        base: &Path,
        relative: &str,
    ) -> Result<Arc<MarkdownArtifact>, MindError> {
        let cached = self
            .artifact_cache
            .lock()
            .expect("lock poisoned")
            .get(relative)
            .cloned();
        if let Some(artifact) = cached {
            self.observability.record_cache_hit(&json!({
                "component": COMPONENT,
                "artifact": relative,
            }));
            return Ok(artifact);
        }
        self.observability.record_cache_miss(&json!({
            "component": COMPONENT,
            "artifact": relative,
        }));

        let path = base.join(relative);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| artifact_read(&path, err))?;
        let artifact = Arc::new(MarkdownArtifact::parse(&content));
        tracing::debug!(
            target: "mind",
            artifact = relative,
            sections = artifact.sections.len(),
            "artifact_loaded"
        );

        self.artifact_cache
            .lock()
            .expect("lock poisoned")
            .insert(relative.to_string(), Arc::clone(&artifact));
        Ok(artifact)
    }

    fn compile_bundle(
        &self,
        artifacts: Arc<MindArtifacts>,
        active: &ActiveConfig,
    ) -> Result<MindBundle, MindError> {
        let compile = |builtin: BuiltinHeuristic| -> Result<Arc<DecisionFunction>, MindError> {
            let params = active
                .config
                .as_ref()
                .map(|config| config.params_for(builtin.id()))
                .unwrap_or_default();
            self.compiler
                .compile(builtin.id(), &params)
                .map_err(|err| compilation(&err))
        };

        let decision_functions = DecisionFunctions {
            back_casting: compile(BuiltinHeuristic::BackCasting)?,
            coherence_scan: compile(BuiltinHeuristic::CoherenceScan)?,
            automation_check: compile(BuiltinHeuristic::AutomationCheck)?,
        };
        self.observability.log(
            LogLevel::Info,
            COMPONENT,
            "heuristics_compiled",
            &json!({
                "count": BuiltinHeuristic::ALL.len(),
                "source": active.source,
            }),
        );

        Ok(MindBundle {
            artifacts,
            decision_functions,
            config: active.config.clone(),
            config_source: active.source,
        })
    }

    fn on_config_changed(&self, document: &ConfigDocument) {
        self.observability.log(
            LogLevel::Info,
            COMPONENT,
            "config_change_detected",
            &json!({ "path": document.path.display().to_string() }),
        );

        let (value, source) = match self
            .options
            .env
            .apply(Some(&document.value), Configuration::skeleton_value)
        {
            Some(value) => (value, ConfigSource::EnvAndFile),
            None => (document.value.clone(), ConfigSource::File),
        };

        let config = match validated_configuration(&value) {
            Ok(config) => Arc::new(config),
            Err(errors) => {
                self.observability.log(
                    LogLevel::Warn,
                    COMPONENT,
                    "config_reload_validation_failed",
                    &json!({ "errors": errors, "action": "keeping_old_config" }),
                );
                return;
            }
        };

        let active = ActiveConfig {
            config: Some(Arc::clone(&config)),
            source,
        };

        let Some(current_bundle) = self.bundle() else {
            self.state.write().expect("lock poisoned").active = active;
            tracing::info!(target: "mind", source = %source, version = %config.version, "config_reloaded");
            return;
        };

        self.refresh_compiled(&active);
        let bundle = match self.compile_bundle(Arc::clone(&current_bundle.artifacts), &active) {
            Ok(bundle) => Arc::new(bundle),
            Err(err) => {
                self.observability.log(
                    LogLevel::Error,
                    COMPONENT,
                    "hot_reload_recompile_failed",
                    &json!({ "error": err.message, "action": "keeping_old_config" }),
                );
                return;
            }
        };

        {
            let mut state = self.state.write().expect("lock poisoned");
            if state.bundle.is_none() {
                return;
            }
            state.active = active;
            state.bundle = Some(bundle);
        }
        tracing::info!(target: "mind", source = %source, version = %config.version, "config_reloaded");
    }

    /// Clears the compiler cache and rebuilds the built-ins from `active` under
    /// one compiler lock.
    fn refresh_compiled(&self, active: &ActiveConfig) {
        let report = self
            .compiler
            .invalidate_on_config_change(active.config.as_deref(), true);
        if !report.all_recompiled() {
            tracing::warn!(target: "mind", report = ?report.recompiled, "partial_recompile");
        }
    }
}

/// Store subscription that does not keep the loader alive.
struct HotReload {
    loader: Weak<MindLoader>,
}

impl ConfigSubscriber for HotReload {
    fn on_config_changed(&self, new: &Arc<ConfigDocument>, _old: Option<&Arc<ConfigDocument>>) {
        if let Some(loader) = self.loader.upgrade() {
            loader.on_config_changed(new);
        }
    }
}
