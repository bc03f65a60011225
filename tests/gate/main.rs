use std::sync::Arc;

use hybrid_ops::{
    axiom::AxiomValidator,
    gate::{
        FeedbackSeverity, GateRecommendation, GateSeverity, PhaseSpec, SKIPPED_MESSAGE,
        StructuralValidator, ValidationGate, ValidationSpec, Veto, format_checkpoint_name,
        summary,
    },
    heuristics::HeuristicCompiler,
    observability::{NoopObservability, ObservabilitySink},
};
use serde_json::json;

fn gate() -> ValidationGate {
    let observability: Arc<dyn ObservabilitySink> = Arc::new(NoopObservability);
    ValidationGate::new(
        Arc::new(HeuristicCompiler::new(Arc::clone(&observability))),
        Arc::new(AxiomValidator::new(Arc::clone(&observability))),
        observability,
    )
}

fn phase(spec: ValidationSpec) -> PhaseSpec {
    PhaseSpec::new("phase-under-test", Some(spec))
}

#[test]
fn given_phase_without_validation_when_executed_then_gate_is_skipped() {
    let result = gate().execute(&PhaseSpec::new("discovery", None), &json!({}));

    assert!(result.passed);
    assert!(result.skipped);
    assert_eq!(result.message.as_deref(), Some(SKIPPED_MESSAGE));
    assert!(result.feedback.is_none());
}

#[test]
fn given_yaml_validation_none_when_parsed_then_phase_has_no_validation() {
    let phase: PhaseSpec =
        serde_yaml::from_str("name: discovery\nvalidation: none\n").expect("phase should parse");

    assert!(phase.validation.is_none());
}

#[test]
fn given_yaml_checkpoint_with_legacy_validator_name_when_executed_then_axiom_validator_runs() {
    let phase: PhaseSpec = serde_yaml::from_str(
        "name: alignment\nvalidation:\n  checkpoint: axioma-compliance\n  validator: axioma-validator\n  criteria:\n    - \"overall score >= 6.0\"\n",
    )
    .expect("phase should parse");

    let result = gate().execute(&phase, &json!({}));

    assert!(result.passed, "{result:?}");
    assert_eq!(result.validator_name.as_deref(), Some("axiom-validator"));
    assert_eq!(result.score, Some(7.0));
}

#[test]
fn given_low_truthfulness_executor_when_coherence_gate_runs_then_veto_short_circuits_criteria() {
    let spec = ValidationSpec::heuristic("executor-assignment", "PV_PA_001")
        .with_criteria(["overall score >= 0.1"]);
    let context = json!({
        "truthfulness": 0.9,
        "systemAdherence": 0.9,
        "skill": 0.8,
        "executors": [
            { "name": "Ana", "truthfulness": 0.95 },
            { "name": "Bruno", "truthfulness": 0.4 }
        ]
    });

    let result = gate().execute(&phase(spec), &context);

    assert!(!result.passed);
    assert!(result.veto);
    assert!(result.criteria_results.is_empty());
    assert_eq!(result.recommendation, Some(GateRecommendation::FixRequired));
    assert_eq!(result.severity, Some(GateSeverity::Critical));
    assert_eq!(result.vetoes.len(), 1);
    match &result.vetoes[0] {
        Veto::Truthfulness {
            executor,
            value,
            threshold,
            ..
        } => {
            assert_eq!(executor, "Bruno");
            assert_eq!(*value, 0.4);
            assert_eq!(*threshold, 0.7);
        }
        other => panic!("unexpected veto {other:?}"),
    }
    let feedback = result.feedback.expect("veto feedback");
    assert_eq!(feedback.severity, FeedbackSeverity::Critical);
    assert!(feedback.headline.contains("VETO TRIGGERED"));
}

#[test]
fn given_healthy_context_when_criteria_hold_then_gate_passes_with_results() {
    let spec = ValidationSpec::heuristic("executor-assignment", "PV_PA_001")
        .with_criteria(["overall score >= 0.7", "no vetoes", "skill ≥ 0.5"]);
    let context = json!({
        "truthfulness": 0.9,
        "systemAdherence": 0.9,
        "skill": 0.8,
        "executors": [{ "name": "Ana", "truthfulness": 0.95 }]
    });

    let result = gate().execute(&phase(spec), &context);

    assert!(result.passed, "{result:?}");
    assert!(!result.veto);
    assert_eq!(result.heuristic_id.as_deref(), Some("PV_PA_001"));
    assert_eq!(result.criteria_results.len(), 3);
    assert!(result.criteria_results.iter().all(|criterion| criterion.passed));
    let score = result.score.expect("score");
    assert!((score - 1.86 / 2.1).abs() < 1e-9);
    assert!(
        result
            .message
            .as_deref()
            .is_some_and(|message| message.contains("passed"))
    );
}

#[test]
fn given_unmet_criterion_when_gate_runs_then_review_and_fix_is_recommended() {
    let spec = ValidationSpec::heuristic("executor-assignment", "PV_PA_001")
        .with_criteria(["overall score >= 0.95", "no vetoes"]);
    let context = json!({ "truthfulness": 0.9, "systemAdherence": 0.9, "skill": 0.8 });

    let result = gate().execute(&phase(spec), &context);

    assert!(!result.passed);
    assert!(!result.veto);
    assert_eq!(result.recommendation, Some(GateRecommendation::ReviewAndFix));
    assert_eq!(result.severity, Some(GateSeverity::Major));
    let failed = result.failed_criteria().collect::<Vec<_>>();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].criterion, "overall score >= 0.95");
    assert_eq!(
        result.feedback.as_ref().map(|feedback| feedback.severity),
        Some(FeedbackSeverity::Major)
    );
}

#[test]
fn given_unknown_heuristic_when_gate_runs_then_error_asks_to_check_configuration() {
    let spec = ValidationSpec::heuristic("mystery", "PV_XX_999");

    let result = gate().execute(&phase(spec), &json!({}));

    assert!(!result.passed);
    assert!(result.error);
    assert_eq!(result.recommendation, Some(GateRecommendation::CheckConfiguration));
    assert_eq!(result.severity, Some(GateSeverity::Critical));
    let message = result.message.expect("error message");
    assert!(message.contains("heuristic PV_XX_999"), "{message}");
}

#[test]
fn given_unknown_validator_name_when_gate_runs_then_error_result_is_returned() {
    let spec = ValidationSpec {
        checkpoint: "custom".to_string(),
        validator: Some("spellcheck".to_string()),
        ..ValidationSpec::default()
    };

    let result = gate().execute(&phase(spec), &json!({}));

    assert!(result.error);
    assert_eq!(result.message.as_deref(), Some("Unknown validator: spellcheck"));
}

#[test]
fn given_malformed_criterion_when_gate_runs_then_error_names_the_criterion() {
    let spec = ValidationSpec::heuristic("executor-assignment", "PV_PA_001")
        .with_criteria(["overall score >="]);
    let context = json!({ "truthfulness": 0.9, "systemAdherence": 0.9, "skill": 0.8 });

    let result = gate().execute(&phase(spec), &context);

    assert!(result.error);
    assert_eq!(result.recommendation, Some(GateRecommendation::CheckConfiguration));
    let message = result.message.expect("error message");
    assert!(message.contains("overall score >="), "{message}");
}

#[test]
fn given_missing_guardrails_when_automation_gate_runs_then_guardrail_veto_fires() {
    let spec = ValidationSpec::heuristic("automation-readiness", "PV_PM_001");
    let context = json!({ "frequency": 10, "standardization": 0.9 });

    let result = gate().execute(&phase(spec), &context);

    assert!(result.veto);
    assert!(matches!(result.vetoes.as_slice(), [Veto::Guardrails { .. }]));
}

#[test]
fn given_guardrails_when_automation_gate_runs_then_presence_criterion_passes() {
    let spec = ValidationSpec::heuristic("automation-readiness", "PV_PM_001")
        .with_criteria(["guardrails present"]);
    let context = json!({ "frequency": 10, "standardization": 0.9, "guardrails": true });

    let result = gate().execute(&phase(spec), &context);

    assert!(result.passed, "{result:?}");
    assert_eq!(result.criteria_results[0].message, "Guardrails defined");
}

#[test]
fn given_dimension_below_minimum_when_axiom_gate_runs_then_one_veto_per_dimension() {
    let spec = ValidationSpec::validator("axioma-compliance", StructuralValidator::Axiom);
    let context = json!({ "axioma": { "Truthfulness": 5.0, "Coherence": 4.5, "Adaptability": 9.0 } });

    let result = gate().execute(&phase(spec), &context);

    assert!(result.veto);
    let dimensions = result
        .vetoes
        .iter()
        .filter_map(|veto| match veto {
            Veto::AxiomaMinimum { dimension, .. } => Some(dimension.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(dimensions, ["Truthfulness", "Coherence"]);
}

#[test]
fn given_floor_criterion_when_axiom_gate_runs_then_floor_sets_the_minimum() {
    let spec = ValidationSpec::validator("axioma-compliance", StructuralValidator::Axiom)
        .with_criteria(["no dimension below 5.0"]);
    let context = json!({ "axioma": { "Truthfulness": 5.5 } });

    let result = gate().execute(&phase(spec), &context);

    assert!(!result.veto, "{result:?}");
    assert!(result.passed);
}

#[test]
fn given_tasks_missing_fields_when_task_anatomy_runs_then_missing_fields_are_reported() {
    let spec = ValidationSpec::validator("task-anatomy", StructuralValidator::TaskAnatomy);
    let context = json!({
        "tasks": [
            {
                "name": "Complete",
                "description": "d",
                "status": "todo",
                "assignee": "ana",
                "due date": "2026-01-01",
                "dependencies": "none",
                "automation trigger": "manual",
                "validation criteria": "reviewed"
            },
            { "name": "Sketchy", "description": "only two fields" }
        ]
    });

    let result = gate().execute(&phase(spec), &context);

    assert!(result.veto);
    assert_eq!(result.validator_name.as_deref(), Some("task-anatomy"));
    assert_eq!(result.score, Some(5.0));
    match result.vetoes.as_slice() {
        [Veto::MissingFields { task, missing, .. }] => {
            assert_eq!(task, "Sketchy");
            assert_eq!(missing.len(), 6);
            assert!(missing.contains(&"Assignee".to_string()));
        }
        other => panic!("unexpected vetoes {other:?}"),
    }
}

#[test]
fn given_veto_result_when_rendered_then_feedback_lists_issues_and_next_actions() {
    let spec = ValidationSpec::heuristic("automation-readiness", "PV_PM_001");
    let result = gate().execute(&phase(spec), &json!({ "frequency": 3 }));

    let rendered = result.feedback.as_ref().expect("feedback").render();

    assert!(rendered.contains("AUTOMATION READINESS - VETO TRIGGERED"), "{rendered}");
    assert!(rendered.contains("ISSUES:"));
    assert!(rendered.contains("[ABORT WORKFLOW]"));
    assert_eq!(
        summary(&result),
        "Automation Readiness - VETO TRIGGERED (CRITICAL)"
    );
}

#[test]
fn given_checkpoint_names_when_formatted_then_words_are_title_cased() {
    assert_eq!(format_checkpoint_name("strategic-alignment"), "Strategic Alignment");
    assert_eq!(format_checkpoint_name("task_anatomy"), "Task Anatomy");
}
