use std::collections::BTreeMap;

use serde_json::Value;

use crate::{
    axiom::{AxiomValidationOptions, AxiomValidator},
    gate::{
        criteria::is_truthy,
        types::{DimensionScore, Veto},
    },
    heuristics::{BuiltinHeuristic, DecisionFunction, HeuristicError},
};

pub const DEFAULT_TRUTHFULNESS_VETO: f64 = 0.7;
pub const DEFAULT_DIMENSION_SCORE: f64 = 7.0;
pub const DEFAULT_MINIMUM_DIMENSION_SCORE: f64 = 6.0;

pub const DEFAULT_AXIOM_DIMENSIONS: [&str; 10] = [
    "Truthfulness",
    "Coherence",
    "Strategic Alignment",
    "Operational Excellence",
    "Innovation Capacity",
    "Risk Management",
    "Resource Optimization",
    "Stakeholder Value",
    "Sustainability",
    "Adaptability",
];

pub const DEFAULT_TASK_FIELDS: [&str; 8] = [
    "Name",
    "Description",
    "Status",
    "Assignee",
    "Due Date",
    "Dependencies",
    "Automation Trigger",
    "Validation Criteria",
];

/// What a heuristic or structural validator produced for one checkpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dispatch {
    pub score: f64,
    pub vetoes: Vec<Veto>,
    pub heuristic_id: Option<String>,
    pub validator_name: Option<String>,
    pub details: Value,
    pub dimensions: Vec<DimensionScore>,
    pub min_score: Option<f64>,
    pub missing_fields: BTreeMap<String, Vec<String>>,
    pub total_tasks: Option<usize>,
    pub compliant_tasks: Option<usize>,
}

impl Dispatch {
    pub fn min_dimension(&self) -> Option<f64> {
        self.dimensions
            .iter()
            .map(|dimension| dimension.score)
            .reduce(f64::min)
    }
}

/// Runs a compiled heuristic and derives the checkpoint vetoes from the
/// context, not from the decision's own veto flag.
pub fn heuristic(function: &DecisionFunction, context: &Value) -> Result<Dispatch, HeuristicError> {
    let result = function.evaluate(context)?;
    let vetoes = match BuiltinHeuristic::from_id(&function.id) {
        Some(BuiltinHeuristic::CoherenceScan) => truthfulness_vetoes(
            context,
            function.threshold("veto", DEFAULT_TRUTHFULNESS_VETO),
        ),
        Some(BuiltinHeuristic::AutomationCheck) => guardrail_vetoes(context),
        Some(BuiltinHeuristic::BackCasting) | None => Vec::new(),
    };

    Ok(Dispatch {
        score: result.score,
        vetoes,
        heuristic_id: Some(function.id.clone()),
        details: result.to_value(),
        ..Dispatch::default()
    })
}

fn truthfulness_vetoes(context: &Value, threshold: f64) -> Vec<Veto> {
    let Some(executors) = context.get("executors").and_then(Value::as_array) else {
        return Vec::new();
    };

    executors
        .iter()
        .enumerate()
        .filter_map(|(index, executor)| {
            let truthfulness = executor.get("truthfulness")?.as_f64()?;
            if truthfulness >= threshold {
                return None;
            }
            let name = executor
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Executor {}", index + 1));
            Some(Veto::Truthfulness {
                message: format!(
                    "Executor \"{name}\" has truthfulness {truthfulness} < {threshold} (VETO)"
                ),
                executor: name,
                value: truthfulness,
                threshold,
            })
        })
        .collect()
}

fn guardrail_vetoes(context: &Value) -> Vec<Veto> {
    if context.get("guardrails").is_some_and(is_truthy) {
        return Vec::new();
    }
    vec![Veto::Guardrails {
        message: "Missing safety guardrails (VETO)".to_string(),
        required: "At least one guardrail must be defined before automation".to_string(),
    }]
}

/// Dimension scores come from `context.axioma`, or from the axiom levels of
/// `context.content` when no explicit scores are given.
pub fn axiom(
    validator: &AxiomValidator,
    options: &AxiomValidationOptions,
    dimensions: Option<&[String]>,
    minimum: f64,
    context: &Value,
) -> Dispatch {
    let explicit = context.get("axioma").and_then(Value::as_object);
    let content = context.get("content").filter(|value| !value.is_null());

    let scored = match (explicit, content) {
        (None, Some(content)) => {
            let result = validator.validate(content, options);
            result
                .level_scores
                .iter()
                .map(|(level, score)| DimensionScore {
                    name: capitalize(level.label()),
                    score: score.score,
                })
                .collect::<Vec<_>>()
        }
        _ => {
            let names = dimensions.map(<[String]>::to_vec).unwrap_or_else(|| {
                DEFAULT_AXIOM_DIMENSIONS
                    .iter()
                    .map(|name| name.to_string())
                    .collect()
            });
            names
                .into_iter()
                .map(|name| {
                    let score = explicit
                        .and_then(|scores| scores.get(&name))
                        .and_then(Value::as_f64)
                        .unwrap_or(DEFAULT_DIMENSION_SCORE);
                    DimensionScore { name, score }
                })
                .collect()
        }
    };

    let score = if scored.is_empty() {
        0.0
    } else {
        scored.iter().map(|dimension| dimension.score).sum::<f64>() / scored.len() as f64
    };
    let vetoes = scored
        .iter()
        .filter(|dimension| dimension.score < minimum)
        .map(|dimension| Veto::AxiomaMinimum {
            dimension: dimension.name.clone(),
            value: dimension.score,
            threshold: minimum,
            message: format!(
                "Dimension \"{}\" scored {} < {minimum} (VETO)",
                dimension.name, dimension.score
            ),
        })
        .collect();

    let mut dispatch = Dispatch {
        score,
        vetoes,
        validator_name: Some("axiom-validator".to_string()),
        dimensions: scored,
        ..Dispatch::default()
    };
    dispatch.min_score = dispatch.min_dimension();
    dispatch
}

pub fn task_anatomy(required_fields: Option<&[String]>, context: &Value) -> Dispatch {
    let fields = required_fields.map(<[String]>::to_vec).unwrap_or_else(|| {
        DEFAULT_TASK_FIELDS
            .iter()
            .map(|field| field.to_string())
            .collect()
    });
    let tasks = context
        .get("tasks")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut vetoes = Vec::new();
    let mut missing_fields = BTreeMap::new();
    for (index, task) in tasks.iter().enumerate() {
        let missing = fields
            .iter()
            .filter(|field| !has_field(task, field))
            .cloned()
            .collect::<Vec<_>>();
        if missing.is_empty() {
            continue;
        }
        let name = task
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Task {}", index + 1));
        vetoes.push(Veto::MissingFields {
            message: format!("Task \"{name}\" missing {} required fields", missing.len()),
            task: name.clone(),
            missing: missing.clone(),
        });
        missing_fields.insert(name, missing);
    }

    let total = tasks.len();
    let compliant = total - vetoes.len();
    Dispatch {
        score: if total > 0 {
            compliant as f64 / total as f64 * 10.0
        } else {
            0.0
        },
        vetoes,
        validator_name: Some("task-anatomy".to_string()),
        missing_fields,
        total_tasks: Some(total),
        compliant_tasks: Some(compliant),
        ..Dispatch::default()
    }
}

fn has_field(task: &Value, field: &str) -> bool {
    task.get(field).is_some_and(is_truthy) || task.get(field.to_lowercase()).is_some_and(is_truthy)
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
