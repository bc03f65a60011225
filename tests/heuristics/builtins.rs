use hybrid_ops::{
    config::HeuristicParams,
    heuristics::{
        AutomationRecommendation, BackCastingRecommendation, CoherenceRecommendation, Priority,
        Recommendation,
    },
};
use serde_json::json;

use crate::compiler;

#[test]
fn given_valid_weight_splits_when_back_casting_then_score_is_bounded_and_priority_matches_threshold()
{
    for step in 0..=10 {
        let end_state_weight = step as f64 / 10.0;
        for priority_threshold in [0.5, 0.8, 0.95] {
            let compiler = compiler();
            let params = HeuristicParams::default()
                .with_weight("end_state_vision", end_state_weight)
                .with_weight("current_market_signals", 1.0 - end_state_weight)
                .with_threshold("priority", priority_threshold);
            let function = compiler
                .compile("PV_BS_001", &params)
                .expect("back-casting should compile");

            for clarity in [0.0, 0.35, 0.7, 1.0] {
                for alignment in [0.0, 0.5, 1.0] {
                    let result = function
                        .evaluate(&json!({
                            "endStateVision": {"clarity": clarity},
                            "marketSignals": {"alignment": alignment}
                        }))
                        .expect("evaluation should succeed");

                    assert!((0.0..=1.0 + 1e-9).contains(&result.score), "score {}", result.score);
                    assert_eq!(
                        result.priority == Some(Priority::High),
                        result.score >= priority_threshold,
                        "score {} threshold {priority_threshold}",
                        result.score
                    );
                }
            }
        }
    }
}

#[test]
fn given_clear_vision_when_back_casting_then_recommendation_is_proceed() {
    let function = compiler()
        .compile_default("PV_BS_001")
        .expect("should compile");

    let result = function
        .evaluate(&json!({"endStateClarity": 0.95, "marketAlignment": 0.2}))
        .expect("should evaluate");

    assert_eq!(
        result.recommendation,
        Recommendation::BackCasting(BackCastingRecommendation::Proceed)
    );
    assert!((result.score - (0.95 * 0.9 + 0.2 * 0.1)).abs() < 1e-9);
}

#[test]
fn given_low_truthfulness_when_coherence_scan_then_veto_rejects_with_zero_score() {
    let function = compiler()
        .compile_default("PV_PA_001")
        .expect("should compile");

    let result = function
        .evaluate(&json!({"truthfulness": 0.5, "systemAdherence": 0.9, "skill": 0.9}))
        .expect("should evaluate");

    assert!(result.veto);
    assert_eq!(result.score, 0.0);
    assert_eq!(
        result.recommendation,
        Recommendation::Coherence(CoherenceRecommendation::Reject)
    );
    assert!(
        result
            .veto_reason
            .as_deref()
            .is_some_and(|reason| reason.starts_with("TRUTHFULNESS_BELOW_THRESHOLD"))
    );
}

#[test]
fn given_strong_executor_when_coherence_scan_then_weighted_score_approves() {
    let function = compiler()
        .compile_default("PV_PA_001")
        .expect("should compile");

    let result = function
        .evaluate(&json!({"truthfulnessCoherence": 0.95, "systemAdherencePotential": 0.9, "technicalSkill": 0.5}))
        .expect("should evaluate");

    let expected = (0.95 * 1.0 + 0.9 * 0.8 + 0.5 * 0.3) / 2.1;
    assert!(!result.veto);
    assert!((result.score - expected).abs() < 1e-9);
    assert_eq!(
        result.recommendation,
        Recommendation::Coherence(CoherenceRecommendation::Approve)
    );
}

#[test]
fn given_missing_guardrails_when_automation_check_then_veto_overrides_frequency() {
    let function = compiler()
        .compile_default("PV_PM_001")
        .expect("should compile");

    let result = function
        .evaluate(&json!({"frequency": 10, "standardizable": 0.9, "hasGuardrails": false}))
        .expect("should evaluate");

    assert!(result.veto);
    assert_eq!(result.ready_to_automate, Some(false));
    assert_eq!(result.score, 0.0);
    assert_eq!(
        result.recommendation,
        Recommendation::Automation(AutomationRecommendation::AddGuardrailsFirst)
    );
}

#[test]
fn given_moderate_frequency_when_automation_check_then_score_follows_weighted_formula() {
    let function = compiler()
        .compile_default("PV_PM_001")
        .expect("should compile");

    let result = function
        .evaluate(&json!({"frequency": 5, "standardizable": 0.8, "hasGuardrails": true}))
        .expect("should evaluate");

    let expected = (0.25 * 0.7 + 0.8 * 0.9 + 1.0) / 2.6;
    assert_eq!(result.tipping_point, Some(true));
    assert!((result.score - expected).abs() < 1e-9, "score {}", result.score);
    assert!(result.score < 0.75);
    assert_eq!(
        result.recommendation,
        Recommendation::Automation(AutomationRecommendation::PlanAutomation)
    );
}

#[test]
fn given_zero_weights_when_compiled_then_explicit_zero_is_honoured() {
    let params = HeuristicParams::default()
        .with_weight("truthfulness", 0.0)
        .with_weight("system_adherence", 0.0)
        .with_weight("skill", 0.0);
    let function = compiler()
        .compile("PV_PA_001", &params)
        .expect("should compile");

    let result = function
        .evaluate(&json!({"truthfulness": 0.9, "systemAdherence": 0.9, "skill": 0.9}))
        .expect("should evaluate");

    assert_eq!(result.score, 0.0);
    assert!(!result.veto);
}

#[test]
fn given_out_of_range_input_when_evaluated_then_invalid_input_error() {
    let function = compiler()
        .compile_default("PV_PA_001")
        .expect("should compile");

    let err = function
        .evaluate(&json!({"truthfulness": 1.5, "systemAdherence": 0.9, "skill": 0.9}))
        .expect_err("out of range should fail");

    assert_eq!(err.kind, hybrid_ops::heuristics::HeuristicErrorKind::InvalidInput);
}
