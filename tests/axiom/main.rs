use std::sync::Arc;

use hybrid_ops::{
    axiom::{
        AxiomLevel, AxiomRecommendation, AxiomValidationOptions, AxiomValidator,
        SOCIAL_VETO_REASON, Severity, generate_report,
    },
    config::ValidationSettings,
    observability::NoopObservability,
};
use serde_json::json;

fn validator() -> AxiomValidator {
    AxiomValidator::new(Arc::new(NoopObservability))
}

#[test]
fn given_operational_only_when_validated_then_single_level_score_equals_overall() {
    let validator = validator();

    let result = validator.validate(
        "Precisamos de repetição com eficiência",
        &AxiomValidationOptions::only(&[AxiomLevel::Operational]),
    );

    assert_eq!(result.level_scores.len(), 1);
    let operational = &result.level_scores[&AxiomLevel::Operational];
    assert_eq!(result.overall_score, operational.score);
    assert!((operational.score - 6.4).abs() < 1e-9, "score {}", operational.score);
    assert!(!result.veto);
}

#[test]
fn given_incoherence_without_coherence_keywords_when_validated_then_social_veto_is_raised() {
    let validator = validator();

    let result = validator.validate(
        "O plano é incoerente com a estratégia",
        &AxiomValidationOptions::default(),
    );

    let social = &result.level_scores[&AxiomLevel::Social];
    assert_eq!(social.score, 0.0);
    assert!(social.veto);
    assert_eq!(social.veto_reason.as_deref(), Some(SOCIAL_VETO_REASON));
    assert!(result.veto);
    assert!(
        result
            .violations
            .iter()
            .any(|violation| violation.level == AxiomLevel::Social
                && violation.severity == Severity::Critical)
    );
}

#[test]
fn given_incoherence_offset_by_coherence_keywords_when_validated_then_no_veto() {
    let result = validator().validate(
        "Parece incoerente, mas o alinhamento com a verdade do sistema se mantém",
        &AxiomValidationOptions::default(),
    );

    assert!(!result.veto);
    assert!(!result.level_scores[&AxiomLevel::Social].veto);
}

#[test]
fn given_strict_settings_when_veto_fires_then_recommendation_is_reject_veto() {
    let settings = ValidationSettings {
        strict_mode: Some(true),
        minimum_score: Some(7.0),
        enable_veto: Some(true),
    };
    let options = AxiomValidationOptions::from_settings(&settings);
    assert!(options.strict);

    let result = validator().validate("Tudo contraditório", &options);

    assert_eq!(result.recommendation, AxiomRecommendation::RejectVeto);
}

#[test]
fn given_disabled_veto_when_strict_mode_then_options_are_not_strict() {
    let settings = ValidationSettings {
        strict_mode: Some(true),
        minimum_score: None,
        enable_veto: Some(false),
    };

    assert!(!AxiomValidationOptions::from_settings(&settings).strict);
}

#[test]
fn given_structured_content_when_validated_then_it_is_scored_as_text() {
    let content = json!({"plan": "automação com documentação do processo"});

    let result = validator().validate(
        &content,
        &AxiomValidationOptions::only(&[AxiomLevel::Operational]),
    );

    assert!(result.overall_score > 5.0);
    assert!(!result.strengths.is_empty());
}

#[test]
fn given_neutral_content_when_validated_then_baseline_scores_recommend_review() {
    let result = validator().validate("lorem ipsum", &AxiomValidationOptions::default());

    assert_eq!(result.level_scores.len(), 4);
    assert!((result.overall_score - 5.0).abs() < 1e-9);
    assert_eq!(result.recommendation, AxiomRecommendation::RejectLowScore);
}

#[test]
fn given_many_validations_when_history_is_bounded_then_oldest_entries_are_evicted() {
    let validator = validator().with_history_capacity(2);

    validator.validate("primeiro", &AxiomValidationOptions::default());
    validator.validate("segundo", &AxiomValidationOptions::default());
    validator.validate("terceiro", &AxiomValidationOptions::default());

    assert_eq!(validator.history_len(), 2);
    let history = validator.history(10);
    assert_eq!(history[0].content, "segundo");
    assert_eq!(history[1].content, "terceiro");
    assert_eq!(validator.history(1)[0].content, "terceiro");

    validator.clear_history();
    assert_eq!(validator.history_len(), 0);
}

#[test]
fn given_vetoed_result_when_report_generated_then_veto_line_and_levels_are_listed() {
    let result = validator().validate("plano incoerente", &AxiomValidationOptions::default());

    let report = generate_report(&result);

    assert!(report.contains("VETO"));
    assert!(report.contains("SOCIAL"), "{report}");
    assert!(report.contains("Violations"));
}
