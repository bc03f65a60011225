mod loader;
mod session;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use hybrid_ops::{
    config::{ConfigStore, EnvOverrides},
    heuristics::HeuristicCompiler,
    mind::{MindLoader, MindLoaderOptions},
    observability::{LogLevel, ObservabilitySink},
};
use serde_json::Value;
use uuid::Uuid;

pub const MIND_ID: &str = "test_mind";

pub const VALID_CONFIG_YAML: &str = r#"version: "1.0"
heuristics:
  PV_BS_001:
    weights: { end_state_vision: 0.9, current_market_signals: 0.1 }
    thresholds: { confidence: 0.8, priority: 0.8 }
  PV_PA_001:
    weights: { truthfulness: 1.0, system_adherence: 0.8, skill: 0.3 }
    thresholds: { veto: 0.7, review: 0.75, approve: 0.85 }
  PV_PM_001:
    weights: { frequency: 0.7, standardization: 0.9, guardrails: 1.0 }
    thresholds: { tipping_point: 2, standardization: 0.7, automate: 0.75 }
validation:
  strict_mode: false
"#;

/// Mind root with artifacts under `minds/<id>` (or the legacy location) and
/// a config file next to it.
pub struct MindFixture {
    pub root: PathBuf,
    pub config_path: PathBuf,
}

impl MindFixture {
    pub fn new() -> Self {
        let fixture = Self::empty();
        fixture.write_artifacts(&fixture.root.join("minds").join(MIND_ID));
        fixture
    }

    pub fn legacy() -> Self {
        let fixture = Self::empty();
        fixture.write_artifacts(&fixture.root.join("outputs").join("minds").join(MIND_ID));
        fixture
    }

    pub fn empty() -> Self {
        let root = std::env::temp_dir().join(format!("hybrid-ops-mind-{}", Uuid::now_v7()));
        fs::create_dir_all(&root).expect("temp root should be created");
        let config_path = root.join("heuristics.yaml");
        Self { root, config_path }
    }

    pub fn with_config(self, content: &str) -> Self {
        fs::write(&self.config_path, content).expect("config should be written");
        self
    }

    pub fn primary_base(&self) -> PathBuf {
        self.root.join("minds").join(MIND_ID)
    }

    fn write_artifacts(&self, base: &Path) {
        write(
            base,
            "artifacts/meta_axioms.md",
            "# Meta Axioms\n\n## Level -4: Existential\nPurpose before process.\n\n## Level -2: Social\n```yaml\nveto: incoherence\n```\n",
        );
        write(
            base,
            "artifacts/decision_heuristics.md",
            "# Decision Heuristics\n\n## PV_BS_001\nBack-cast from the end state.\n",
        );
        write(
            base,
            "sources/documents/task_management_playbook.md",
            "# Task Management\n\n## Task Anatomy\nEvery task names an executor.\n",
        );
        write(base, "system_prompts/system_prompt.md", "You are a systems thinker.");
    }

    pub fn loader(&self, env: EnvOverrides) -> (Arc<ConfigStore>, Arc<MindLoader>) {
        self.loader_with(env, Arc::new(RecordingSink::default()))
    }

    pub fn loader_with(
        &self,
        env: EnvOverrides,
        observability: Arc<dyn ObservabilitySink>,
    ) -> (Arc<ConfigStore>, Arc<MindLoader>) {
        let store = ConfigStore::without_file_watching(&self.config_path);
        let compiler = Arc::new(HeuristicCompiler::new(Arc::clone(&observability)));
        let loader = MindLoader::new(
            Arc::clone(&store),
            compiler,
            observability,
            MindLoaderOptions::new(&self.root)
                .with_mind_id(MIND_ID)
                .with_env(env),
        );
        (store, loader)
    }
}

impl Drop for MindFixture {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn write(base: &Path, relative: &str, content: &str) {
    let path = base.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("artifact dir should be created");
    }
    fs::write(path, content).expect("artifact should be written");
}

pub fn no_env() -> EnvOverrides {
    EnvOverrides::from_pairs(Vec::<(String, String)>::new())
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<String>>,
    pub fallbacks: Mutex<Vec<String>>,
}

impl ObservabilitySink for RecordingSink {
    fn log(&self, _level: LogLevel, _component: &str, event: &str, _metadata: &Value) {
        self.events.lock().expect("lock").push(event.to_string());
    }

    fn start_timer(&self, _operation_id: &str, _operation_type: &str, _metadata: &Value) {}

    fn end_timer(&self, _operation_id: &str, _metadata: &Value) -> Option<f64> {
        None
    }

    fn record_cache_hit(&self, _metadata: &Value) {}

    fn record_cache_miss(&self, _metadata: &Value) {}

    fn record_fallback(&self, reason: &str, _metadata: &Value) {
        self.fallbacks.lock().expect("lock").push(reason.to_string());
    }
}
