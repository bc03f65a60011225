use std::{
    fs,
    sync::{Arc, Mutex, OnceLock, Weak},
};

use hybrid_ops::{
    config::{ConfigSource, ConfigStore, EnvOverrides, ReloadOutcome},
    heuristics::HeuristicCompiler,
    mind::{Agent, MindErrorKind, MindLoader, MindLoaderOptions, SectionBody},
    observability::{LogLevel, ObservabilitySink},
};
use serde_json::{Value, json};

use crate::{MIND_ID, MindFixture, RecordingSink, VALID_CONFIG_YAML, no_env};

#[tokio::test]
async fn given_primary_artifacts_and_valid_config_when_loaded_then_bundle_uses_file_config() {
    let fixture = MindFixture::new().with_config(VALID_CONFIG_YAML);
    let (_store, loader) = fixture.loader(no_env());

    loader.load().await.expect("mind should load");

    assert!(loader.is_loaded());
    assert_eq!(loader.config_source(), ConfigSource::File);
    let bundle = loader.bundle().expect("bundle should exist");
    assert_eq!(bundle.artifacts.base_path, fixture.primary_base());
    assert_eq!(bundle.decision_functions.coherence_scan.threshold("review", 0.0), 0.75);
    assert_eq!(&*bundle.artifacts.system_prompt, "You are a systems thinker.");
    assert!(matches!(
        bundle.artifacts.meta_axioms.section("Meta Axioms"),
        Some(SectionBody::Structured(_))
    ));

    let metadata = loader.metadata();
    assert!(metadata.loaded);
    assert_eq!(metadata.mind_id, MIND_ID);
    assert_eq!(metadata.heuristics.len(), 3);
    assert_eq!(metadata.config_version.as_deref(), Some("1.0"));
}

#[tokio::test]
async fn given_loaded_mind_when_loaded_again_then_same_bundle_is_kept() {
    let fixture = MindFixture::new().with_config(VALID_CONFIG_YAML);
    let (_store, loader) = fixture.loader(no_env());

    loader.load().await.expect("mind should load");
    let first = loader.bundle().expect("bundle should exist");
    loader.load().await.expect("second load is a no-op");

    assert!(Arc::ptr_eq(&first, &loader.bundle().expect("bundle should exist")));
}

#[tokio::test]
async fn given_invalid_config_when_loaded_then_defaults_are_compiled_and_fallback_recorded() {
    let invalid = VALID_CONFIG_YAML.replace("veto: 0.7", "veto: 0.95");
    let fixture = MindFixture::new().with_config(&invalid);
    let sink = Arc::new(RecordingSink::default());
    let (_store, loader) = fixture.loader_with(no_env(), sink.clone());

    loader.load().await.expect("mind should load with defaults");

    assert_eq!(loader.config_source(), ConfigSource::Defaults);
    assert!(loader.active_config().is_none());
    let bundle = loader.bundle().expect("bundle should exist");
    assert_eq!(bundle.decision_functions.coherence_scan.threshold("veto", 0.7), 0.7);
    assert_eq!(
        sink.fallbacks.lock().expect("lock").as_slice(),
        ["config_validation_failed".to_string()]
    );
}

#[tokio::test]
async fn given_env_overrides_when_loaded_then_source_is_env_and_file_and_env_wins() {
    let fixture = MindFixture::new().with_config(VALID_CONFIG_YAML);
    let env = EnvOverrides::from_pairs([("HEURISTIC_PM001_AUTOMATE_THRESHOLD", "0.9")]);
    let (_store, loader) = fixture.loader(env);

    loader.load().await.expect("mind should load");

    assert_eq!(loader.config_source(), ConfigSource::EnvAndFile);
    let bundle = loader.bundle().expect("bundle should exist");
    assert_eq!(bundle.decision_functions.automation_check.threshold("automate", 0.0), 0.9);
}

#[tokio::test]
async fn given_no_config_file_when_loaded_then_defaults_are_used() {
    let fixture = MindFixture::new();
    let (_store, loader) = fixture.loader(no_env());

    loader.load().await.expect("mind should load");

    assert_eq!(loader.config_source(), ConfigSource::Defaults);
    assert!(loader.is_loaded());
}

#[tokio::test]
async fn given_missing_mind_directory_when_loaded_then_error_lists_both_locations() {
    let fixture = MindFixture::empty().with_config(VALID_CONFIG_YAML);
    let (_store, loader) = fixture.loader(no_env());

    let err = loader.load().await.expect_err("load should fail");

    assert_eq!(err.kind, MindErrorKind::LoadFailed);
    assert!(err.message.contains("not found in any location"), "{}", err.message);
    assert!(err.message.contains("(co-located)"));
    assert!(err.message.contains("(legacy)"));
    assert!(!loader.is_loaded());
    assert!(!loader.metadata().loaded);
}

#[tokio::test]
async fn given_missing_system_prompt_when_loaded_then_load_fails_and_stays_unloaded() {
    let fixture = MindFixture::new().with_config(VALID_CONFIG_YAML);
    fs::remove_file(fixture.primary_base().join("system_prompts/system_prompt.md"))
        .expect("prompt should be removed");
    let (_store, loader) = fixture.loader(no_env());

    let err = loader.load().await.expect_err("load should fail");

    assert_eq!(err.kind, MindErrorKind::LoadFailed);
    assert!(err.message.starts_with("Mind loading failed:"));
    assert!(!loader.is_loaded());
}

#[tokio::test]
async fn given_only_legacy_location_when_loaded_then_legacy_base_is_used() {
    let fixture = MindFixture::legacy().with_config(VALID_CONFIG_YAML);
    let (_store, loader) = fixture.loader(no_env());

    loader.load().await.expect("legacy mind should load");

    let bundle = loader.bundle().expect("bundle should exist");
    assert!(bundle.artifacts.base_path.ends_with("outputs/minds/test_mind"));
}

#[tokio::test]
async fn given_loaded_mind_when_config_changes_then_bundle_is_rebuilt_with_new_thresholds() {
    let fixture = MindFixture::new().with_config(VALID_CONFIG_YAML);
    let (store, loader) = fixture.loader(no_env());
    loader.load().await.expect("mind should load");
    let before = loader.bundle().expect("bundle should exist");

    fs::write(
        &fixture.config_path,
        VALID_CONFIG_YAML
            .replace("version: \"1.0\"", "version: \"1.1\"")
            .replace("veto: 0.7", "veto: 0.6"),
    )
    .expect("config should be rewritten");
    let outcome = store.reconcile().await;

    assert_eq!(outcome, ReloadOutcome::Applied { notified: 1 });
    let after = loader.bundle().expect("bundle should survive reload");
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(Arc::ptr_eq(&before.artifacts, &after.artifacts));
    assert_eq!(after.decision_functions.coherence_scan.threshold("veto", 0.0), 0.6);
    assert_eq!(loader.metadata().config_version.as_deref(), Some("1.1"));
}

#[tokio::test]
async fn given_loaded_mind_when_config_becomes_invalid_then_old_config_is_kept() {
    let fixture = MindFixture::new().with_config(VALID_CONFIG_YAML);
    let (store, loader) = fixture.loader(no_env());
    loader.load().await.expect("mind should load");
    let before = loader.bundle().expect("bundle should exist");

    fs::write(
        &fixture.config_path,
        VALID_CONFIG_YAML.replace("review: 0.75", "review: 0.5"),
    )
    .expect("config should be rewritten");
    store.reconcile().await;

    let config = loader.active_config().expect("old config should stay active");
    assert_eq!(config.params_for("PV_PA_001").threshold("review", 0.0), 0.75);
    assert!(Arc::ptr_eq(&before, &loader.bundle().expect("bundle should exist")));
}

#[tokio::test]
async fn given_agent_when_applied_before_and_after_load_then_only_loaded_mind_enhances_it() {
    let fixture = MindFixture::new().with_config(VALID_CONFIG_YAML);
    let (_store, loader) = fixture.loader(no_env());
    let mut agent = Agent::new("agent-1");

    let err = loader
        .apply_to_agent(&mut agent)
        .expect_err("unloaded mind cannot enhance");
    assert_eq!(err.kind, MindErrorKind::IllegalState);
    assert!(!agent.is_enhanced());

    loader.load().await.expect("mind should load");
    loader.apply_to_agent(&mut agent).expect("loaded mind enhances");

    let capabilities = agent.capabilities.expect("capabilities should be set");
    assert_eq!(capabilities.decision_functions.back_casting.id, "PV_BS_001");
    assert!(!capabilities.validation_rules.task_anatomy.required_fields.is_empty());
}

#[tokio::test]
async fn given_loaded_mind_when_reset_then_next_load_starts_over() {
    let fixture = MindFixture::new().with_config(VALID_CONFIG_YAML);
    let (_store, loader) = fixture.loader(no_env());
    loader.load().await.expect("mind should load");

    loader.reset();

    assert!(!loader.is_loaded());
    assert_eq!(loader.config_source(), ConfigSource::Defaults);
    loader.load().await.expect("mind should load again");
    assert!(loader.is_loaded());
}

#[tokio::test]
async fn given_compiler_warmed_with_defaults_when_mind_loads_then_functions_use_file_params() {
    let fixture =
        MindFixture::new().with_config(&VALID_CONFIG_YAML.replace("veto: 0.7", "veto: 0.6"));
    let observability: Arc<dyn ObservabilitySink> = Arc::new(RecordingSink::default());
    let compiler = Arc::new(HeuristicCompiler::new(Arc::clone(&observability)));
    let warmed = compiler
        .compile_default("PV_PA_001")
        .expect("built-in should compile");
    assert_eq!(warmed.threshold("veto", -1.0), -1.0);

    let loader = MindLoader::new(
        ConfigStore::without_file_watching(&fixture.config_path),
        Arc::clone(&compiler),
        observability,
        MindLoaderOptions::new(&fixture.root)
            .with_mind_id(MIND_ID)
            .with_env(no_env()),
    );
    loader.load().await.expect("mind should load");

    assert_eq!(loader.config_source(), ConfigSource::File);
    let bundle = loader.bundle().expect("bundle should exist");
    let coherence = &bundle.decision_functions.coherence_scan;
    assert_eq!(coherence.threshold("veto", -1.0), 0.6);
    let decision = coherence
        .evaluate(&json!({ "truthfulness": 0.65, "systemAdherence": 0.9, "skill": 0.9 }))
        .expect("evaluation should succeed");
    assert!(!decision.veto);

    let shared = compiler
        .compile_default("PV_PA_001")
        .expect("cached function should be returned");
    assert!(Arc::ptr_eq(&shared, coherence));
}

/// Captures what the loader publishes while its bundle is being compiled.
#[derive(Default)]
struct MidCompileSnapshots {
    loader: OnceLock<Weak<MindLoader>>,
    snapshots: Mutex<Vec<(Option<String>, Option<String>)>>,
}

impl ObservabilitySink for MidCompileSnapshots {
    fn log(&self, _level: LogLevel, _component: &str, event: &str, _metadata: &Value) {
        if event != "heuristics_compiled" {
            return;
        }
        let Some(loader) = self.loader.get().and_then(Weak::upgrade) else {
            return;
        };
        let Some(bundle) = loader.bundle() else {
            return;
        };
        let active_version = loader.active_config().map(|config| config.version.clone());
        let bundle_version = bundle.config.as_ref().map(|config| config.version.clone());
        self.snapshots
            .lock()
            .expect("lock")
            .push((active_version, bundle_version));
    }

    fn start_timer(&self, _operation_id: &str, _operation_type: &str, _metadata: &Value) {}

    fn end_timer(&self, _operation_id: &str, _metadata: &Value) -> Option<f64> {
        None
    }

    fn record_cache_hit(&self, _metadata: &Value) {}

    fn record_cache_miss(&self, _metadata: &Value) {}

    fn record_fallback(&self, _reason: &str, _metadata: &Value) {}
}

#[tokio::test]
async fn given_hot_reload_in_progress_when_state_is_read_then_config_and_bundle_agree() {
    let fixture = MindFixture::new().with_config(VALID_CONFIG_YAML);
    let sink = Arc::new(MidCompileSnapshots::default());
    let observability: Arc<dyn ObservabilitySink> = Arc::clone(&sink) as _;
    let (store, loader) = fixture.loader_with(no_env(), observability);
    sink.loader
        .set(Arc::downgrade(&loader))
        .expect("loader should be set once");
    loader.load().await.expect("mind should load");

    fs::write(
        &fixture.config_path,
        VALID_CONFIG_YAML.replace("version: \"1.0\"", "version: \"1.1\""),
    )
    .expect("config should be rewritten");
    store.reconcile().await;

    let snapshots = sink.snapshots.lock().expect("lock").clone();
    assert_eq!(snapshots, vec![(Some("1.0".to_string()), Some("1.0".to_string()))]);
    assert_eq!(loader.metadata().config_version.as_deref(), Some("1.1"));
    let bundle = loader.bundle().expect("bundle should exist");
    assert_eq!(
        bundle.config.as_ref().map(|config| config.version.as_str()),
        Some("1.1")
    );
}
