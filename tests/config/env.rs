use hybrid_ops::config::{Configuration, EnvOverrides, validate_config};
use serde_json::json;

use crate::valid_config_value;

#[test]
fn given_no_mapped_variables_when_applied_then_no_overlay_is_produced() {
    let env = EnvOverrides::from_pairs([("UNRELATED_VARIABLE", "1")]);

    assert!(env.is_empty());
    assert!(env.apply(Some(&valid_config_value()), Configuration::skeleton_value).is_none());
}

#[test]
fn given_file_and_env_values_when_applied_then_env_wins() {
    let env = EnvOverrides::from_pairs([
        ("HEURISTIC_PA001_VETO_THRESHOLD", "0.65"),
        ("VALIDATION_STRICT_MODE", "false"),
    ]);

    let merged = env
        .apply(Some(&valid_config_value()), Configuration::skeleton_value)
        .expect("overrides should apply");

    assert_eq!(merged["heuristics"]["PV_PA_001"]["thresholds"]["veto"], json!(0.65));
    assert_eq!(merged["validation"]["strict_mode"], json!(false));
    assert_eq!(merged["heuristics"]["PV_PA_001"]["thresholds"]["review"], json!(0.6));
    assert_eq!(merged["version"], "1.0");
}

#[test]
fn given_no_file_when_env_present_then_skeleton_receives_overrides() {
    let env = EnvOverrides::from_pairs([
        ("HEURISTIC_BS001_END_STATE_WEIGHT", "0.7"),
        ("HEURISTIC_BS001_MARKET_WEIGHT", "0.3"),
    ]);

    let merged = env
        .apply(None, Configuration::skeleton_value)
        .expect("overrides should apply");

    assert_eq!(merged["version"], "1.0");
    assert_eq!(merged["heuristics"]["PV_BS_001"]["weights"]["end_state_vision"], json!(0.7));
    for id in ["PV_BS_001", "PV_PA_001", "PV_PM_001"] {
        assert!(merged["heuristics"][id]["thresholds"].is_object(), "{id} should exist");
    }
    assert!(validate_config(&merged).valid, "{}", validate_config(&merged).format());
}

#[test]
fn given_non_numeric_value_when_applied_then_it_stays_a_string_and_fails_validation() {
    let env = EnvOverrides::from_pairs([("HEURISTIC_PM001_AUTOMATE_THRESHOLD", "high")]);

    let merged = env
        .apply(Some(&valid_config_value()), Configuration::skeleton_value)
        .expect("overrides should apply");

    assert_eq!(merged["heuristics"]["PV_PM_001"]["thresholds"]["automate"], json!("high"));
    let report = validate_config(&merged);
    assert!(!report.valid);
    assert!(report.errors.iter().any(|error| error.contains("PV_PM_001.thresholds.automate")));
}
