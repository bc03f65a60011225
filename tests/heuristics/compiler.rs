use std::sync::Arc;

use hybrid_ops::{
    config::{Configuration, HeuristicParams},
    heuristics::{
        CustomTemplate, DecisionResult, HeuristicError, HeuristicErrorKind, Recommendation,
    },
};
use serde_json::{Value, json};

use crate::compiler;

fn echo_template(name: &str) -> CustomTemplate {
    CustomTemplate::new(name, "testing", |params: &HeuristicParams| {
        let bias = params.weight("bias", 0.5);
        Ok(Arc::new(move |context: &Value| -> Result<DecisionResult, HeuristicError> {
            let signal = context.get("signal").and_then(Value::as_f64).unwrap_or(0.0);
            Ok(DecisionResult::new(
                "CUSTOM_ECHO",
                (signal + bias) / 2.0,
                Recommendation::Custom("ECHO".to_string()),
            ))
        }))
    })
}

#[test]
fn given_cached_id_when_compiled_again_with_other_params_then_same_function_is_returned() {
    let compiler = compiler();
    let first = compiler
        .compile("PV_PA_001", &HeuristicParams::default())
        .expect("should compile");
    let second = compiler
        .compile(
            "PV_PA_001",
            &HeuristicParams::default().with_threshold("veto", 0.2),
        )
        .expect("should compile");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.threshold("veto", 0.7), 0.7);
    let stats = compiler.stats();
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_misses, 1);
}

#[test]
fn given_cleared_cache_when_compiled_again_then_a_new_function_is_built() {
    let compiler = compiler();
    let first = compiler.compile_default("PV_BS_001").expect("should compile");

    assert_eq!(compiler.clear_cache("test"), 1);
    let second = compiler.compile_default("PV_BS_001").expect("should compile");

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(compiler.stats().cache_clears, 1);
}

#[test]
fn given_unknown_id_when_compiled_then_unknown_heuristic_error() {
    let err = compiler()
        .compile_default("PV_XX_999")
        .expect_err("unknown id should fail");

    assert_eq!(err.kind, HeuristicErrorKind::UnknownHeuristicId);
    assert!(err.message.contains("PV_XX_999"));
}

#[test]
fn given_batch_with_unknown_id_when_compiled_then_other_ids_still_compile() {
    let compiler = compiler();
    let compiled = compiler.compile_multiple(&[
        ("PV_BS_001".to_string(), HeuristicParams::default()),
        ("NOPE".to_string(), HeuristicParams::default()),
        ("PV_PM_001".to_string(), HeuristicParams::default()),
    ]);

    assert!(compiled["PV_BS_001"].is_some());
    assert!(compiled["NOPE"].is_none());
    assert!(compiled["PV_PM_001"].is_some());
}

#[test]
fn given_new_configuration_when_invalidated_with_recompile_then_builtins_carry_new_params() {
    let compiler = compiler();
    let stale = compiler.compile_default("PV_PA_001").expect("should compile");
    let config = Configuration::from_value(&json!({
        "version": "2.0",
        "heuristics": {
            "PV_PA_001": {"weights": {}, "thresholds": {"veto": 0.5}}
        }
    }))
    .expect("config should convert");

    let report = compiler.invalidate_on_config_change(Some(&config), true);

    assert_eq!(report.cleared, 1);
    assert!(report.all_recompiled());
    assert_eq!(report.recompiled.len(), 3);
    let fresh = compiler.compile_default("PV_PA_001").expect("should compile");
    assert!(!Arc::ptr_eq(&stale, &fresh));
    assert_eq!(fresh.threshold("veto", 0.7), 0.5);
    let result = fresh
        .evaluate(&json!({"truthfulness": 0.6, "systemAdherence": 0.6, "skill": 0.6}))
        .expect("should evaluate");
    assert!(!result.veto);
}

#[test]
fn given_custom_template_when_registered_then_it_compiles_and_evaluates() {
    let compiler = compiler();
    compiler
        .register_custom_template("CUSTOM_ECHO", echo_template("Echo"))
        .expect("registration should succeed");

    let function = compiler
        .compile("CUSTOM_ECHO", &HeuristicParams::default().with_weight("bias", 1.0))
        .expect("custom should compile");
    let result = function
        .evaluate(&json!({"signal": 0.5}))
        .expect("custom should evaluate");

    assert!(!function.is_builtin());
    assert_eq!(result.score, 0.75);
    assert_eq!(result.recommendation.as_str(), "ECHO");
    let metadata = compiler
        .heuristic_metadata("CUSTOM_ECHO")
        .expect("metadata should exist");
    assert!(metadata.custom);
    assert!(metadata.compiled);
    assert_eq!(compiler.available_heuristics().len(), 4);
}

#[test]
fn given_builtin_id_or_blank_name_when_registering_then_template_is_rejected() {
    let compiler = compiler();

    let reserved = compiler
        .register_custom_template("PV_BS_001", echo_template("Shadow"))
        .expect_err("built-in ids are reserved");
    let blank = compiler
        .register_custom_template("CUSTOM_BLANK", echo_template("  "))
        .expect_err("blank names are rejected");

    assert_eq!(reserved.kind, HeuristicErrorKind::InvalidTemplate);
    assert_eq!(blank.kind, HeuristicErrorKind::InvalidTemplate);
    assert!(blank.message.contains("name"));
}

#[test]
fn given_panicking_custom_function_when_evaluated_then_execution_error() {
    let compiler = compiler();
    compiler
        .register_custom_template(
            "CUSTOM_PANIC",
            CustomTemplate::new("Panic", "testing", |_params: &HeuristicParams| {
                Ok(Arc::new(|_context: &Value| -> Result<DecisionResult, HeuristicError> {
                    panic!("boom")
                }))
            }),
        )
        .expect("registration should succeed");

    let err = compiler
        .compile_default("CUSTOM_PANIC")
        .expect("should compile")
        .evaluate(&json!({}))
        .expect_err("panic should be contained");

    assert_eq!(err.kind, HeuristicErrorKind::Execution);
}
