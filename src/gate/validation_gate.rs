use std::sync::Arc;

use serde_json::{Value, json};

use crate::{
    axiom::{AxiomValidationOptions, AxiomValidator},
    gate::{
        criteria::{
            self, CriteriaError, EvaluationScope, ParsedCriterion, parse_criterion,
        },
        dispatch::{self, DEFAULT_MINIMUM_DIMENSION_SCORE, Dispatch},
        feedback::FeedbackGenerator,
        types::{
            CriterionSpec, GateRecommendation, GateResult, GateSeverity, PhaseSpec,
            StructuralValidator, ValidationSpec,
        },
    },
    heuristics::{HeuristicCompiler, HeuristicError},
    observability::{LogLevel, ObservabilitySink},
};

const COMPONENT: &str = "validation_gate";

pub const SKIPPED_MESSAGE: &str = "No validation configured for this phase";

/// Runs one checkpoint: dispatch, vetoes, then criteria.
pub struct ValidationGate {
    compiler: Arc<HeuristicCompiler>,
    axiom_validator: Arc<AxiomValidator>,
    axiom_options: AxiomValidationOptions,
    feedback: FeedbackGenerator,
    observability: Arc<dyn ObservabilitySink>,
}

enum GateFailure {
    Heuristic(HeuristicError),
    Criteria { label: String, error: CriteriaError },
    Configuration(String),
}

impl GateFailure {
    fn describe(&self, spec: &ValidationSpec) -> String {
        let subject = match (&spec.heuristic, &spec.validator) {
            (Some(id), _) => format!("heuristic {id}"),
            (None, Some(validator)) => format!("validator {validator}"),
            (None, None) => format!("checkpoint {}", spec.checkpoint),
        };
        match self {
            GateFailure::Heuristic(err) => format!("Validation with {subject} failed: {err}"),
            GateFailure::Criteria { label, error } => {
                format!("Validation with {subject} failed: criterion \"{label}\" is invalid: {error}")
            }
            GateFailure::Configuration(message) => message.clone(),
        }
    }
}

impl ValidationGate {
    pub fn new(
        compiler: Arc<HeuristicCompiler>,
        axiom_validator: Arc<AxiomValidator>,
        observability: Arc<dyn ObservabilitySink>,
    ) -> Self {
        Self {
            compiler,
            axiom_validator,
            axiom_options: AxiomValidationOptions::default(),
            feedback: FeedbackGenerator::default(),
            observability,
        }
    }

    pub fn with_axiom_options(mut self, options: AxiomValidationOptions) -> Self {
        self.axiom_options = options;
        self
    }

    pub fn with_feedback(mut self, feedback: FeedbackGenerator) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn execute(&self, phase: &PhaseSpec, context: &Value) -> GateResult {
        let Some(spec) = &phase.validation else {
            return GateResult {
                gate: phase.name.clone(),
                passed: true,
                skipped: true,
                message: Some(SKIPPED_MESSAGE.to_string()),
                ..GateResult::default()
            };
        };

        let result = match self.run(spec, context) {
            Ok(result) => result,
            Err(failure) => self.error_result(spec, &failure),
        };

        self.observability.log(
            if result.passed { LogLevel::Info } else { LogLevel::Warn },
            COMPONENT,
            "validation_gate_executed",
            &json!({
                "checkpoint": spec.checkpoint,
                "passed": result.passed,
                "veto": result.veto,
                "error": result.error,
                "score": result.score,
            }),
        );
        result
    }

    fn run(&self, spec: &ValidationSpec, context: &Value) -> Result<GateResult, GateFailure> {
        let parsed = spec
            .criteria
            .iter()
            .map(|criterion| (criterion.label(), parse_spec(criterion)))
            .collect::<Vec<_>>();

        let dispatch = self.dispatch(spec, &parsed, context)?;
        let mut result = GateResult {
            gate: spec.checkpoint.clone(),
            score: Some(dispatch.score),
            heuristic_id: dispatch.heuristic_id.clone(),
            validator_name: dispatch.validator_name.clone(),
            ..GateResult::default()
        };

        if !dispatch.vetoes.is_empty() {
            result.veto = true;
            result.vetoes = dispatch.vetoes;
            result.recommendation = Some(GateRecommendation::FixRequired);
            result.severity = Some(GateSeverity::Critical);
            result.feedback = Some(self.feedback.veto(&result));
            return Ok(result);
        }

        let scope = EvaluationScope {
            context,
            details: &dispatch.details,
            score: dispatch.score,
            min_dimension: dispatch.min_dimension(),
            veto_count: 0,
            total_tasks: dispatch.total_tasks,
            compliant_tasks: dispatch.compliant_tasks,
        };
        let mut criteria_results = Vec::with_capacity(parsed.len());
        for (label, criterion) in parsed {
            let criterion = criterion.map_err(|error| GateFailure::Criteria {
                label: label.clone(),
                error,
            })?;
            criteria_results.push(criteria::evaluate(&label, &criterion, &scope));
        }
        result.criteria_results = criteria_results;

        if result.criteria_results.iter().all(|criterion| criterion.passed) {
            result.passed = true;
            let feedback = self.feedback.success(&result);
            result.message = Some(feedback.headline.clone());
            result.feedback = Some(feedback);
            return Ok(result);
        }

        result.recommendation = Some(GateRecommendation::ReviewAndFix);
        result.severity = Some(GateSeverity::Major);
        result.dimensions = dispatch.dimensions;
        result.min_score = dispatch.min_score;
        result.missing_fields = dispatch.missing_fields;
        result.feedback = Some(self.feedback.criteria_failure(&result));
        Ok(result)
    }

    fn dispatch(
        &self,
        spec: &ValidationSpec,
        parsed: &[(String, Result<ParsedCriterion, CriteriaError>)],
        context: &Value,
    ) -> Result<Dispatch, GateFailure> {
        if let Some(heuristic_id) = &spec.heuristic {
            let function = self
                .compiler
                .compile_default(heuristic_id)
                .map_err(GateFailure::Heuristic)?;
            return dispatch::heuristic(&function, context).map_err(GateFailure::Heuristic);
        }

        let Some(name) = &spec.validator else {
            return Err(GateFailure::Configuration(format!(
                "Validation gate {} has neither heuristic nor validator configured",
                spec.checkpoint
            )));
        };
        match StructuralValidator::from_name(name) {
            Some(StructuralValidator::Axiom) => {
                let minimum = spec
                    .minimum_dimension_score
                    .or_else(|| {
                        parsed
                            .iter()
                            .find_map(|(_, criterion)| criterion.as_ref().ok()?.floor_threshold())
                    })
                    .unwrap_or(DEFAULT_MINIMUM_DIMENSION_SCORE);
                Ok(dispatch::axiom(
                    &self.axiom_validator,
                    &self.axiom_options,
                    spec.dimensions.as_deref(),
                    minimum,
                    context,
                ))
            }
            Some(StructuralValidator::TaskAnatomy) => Ok(dispatch::task_anatomy(
                spec.required_fields.as_deref(),
                context,
            )),
            None => Err(GateFailure::Configuration(format!(
                "Unknown validator: {name}"
            ))),
        }
    }

    fn error_result(&self, spec: &ValidationSpec, failure: &GateFailure) -> GateResult {
        let message = failure.describe(spec);
        self.observability.log(
            LogLevel::Error,
            COMPONENT,
            "validation_gate_error",
            &json!({ "checkpoint": spec.checkpoint, "error": message }),
        );
        let mut result = GateResult {
            gate: spec.checkpoint.clone(),
            error: true,
            message: Some(message),
            recommendation: Some(GateRecommendation::CheckConfiguration),
            severity: Some(GateSeverity::Critical),
            heuristic_id: spec.heuristic.clone(),
            validator_name: spec.validator.clone(),
            ..GateResult::default()
        };
        result.feedback = Some(self.feedback.error(&result));
        result
    }
}

fn parse_spec(criterion: &CriterionSpec) -> Result<ParsedCriterion, CriteriaError> {
    match criterion {
        CriterionSpec::Text(text) => parse_criterion(text),
        CriterionSpec::Structured {
            field,
            operator,
            threshold,
        } => {
            let comparator = criteria::Comparator::parse(operator).ok_or_else(|| CriteriaError {
                kind: criteria::CriteriaErrorKind::UnknownOperator,
                message: format!("unknown comparator `{operator}`"),
                position: 0,
            })?;
            Ok(ParsedCriterion::compare(field.clone(), comparator, *threshold))
        }
    }
}
