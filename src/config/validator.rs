use serde::Serialize;
use serde_json::{Map, Value};

use crate::{config::types::Configuration, heuristics::BuiltinHeuristic};

const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn format(&self) -> String {
        if self.valid {
            return "Configuration is valid".to_string();
        }

        let mut rendered = format!(
            "Configuration validation failed with {} error(s):",
            self.errors.len()
        );
        for (index, error) in self.errors.iter().enumerate() {
            rendered.push_str(&format!("\n  {}. {}", index + 1, error));
        }
        rendered
    }
}

/// Validates `value` and converts it into the typed view in one step.
pub fn validated_configuration(value: &Value) -> Result<Configuration, Vec<String>> {
    let report = validate_config(value);
    if !report.valid {
        return Err(report.errors);
    }
    Configuration::from_value(value).map_err(|err| vec![err.to_string()])
}

/// Structural and cross-field validation of a raw configuration document.
///
/// All problems are collected in one pass; only a missing `heuristics` section
/// stops the walk early because nothing below it can be checked.
pub fn validate_config(config: &Value) -> ValidationReport {
    let Some(root) = config.as_object() else {
        return ValidationReport::from_errors(vec![
            "Configuration object is required".to_string(),
        ]);
    };

    let mut errors = Vec::new();

    match root.get("version") {
        None => errors.push("Missing required field: version".to_string()),
        Some(version) if !version.is_string() => {
            errors.push("version: Must be a string".to_string())
        }
        Some(_) => {}
    }

    let heuristics = match root.get("heuristics") {
        None => {
            errors.push("Missing required field: heuristics".to_string());
            return ValidationReport::from_errors(errors);
        }
        Some(Value::Object(heuristics)) => heuristics,
        Some(_) => {
            errors.push("heuristics: Must be an object".to_string());
            return ValidationReport::from_errors(errors);
        }
    };

    for builtin in BuiltinHeuristic::ALL {
        let id = builtin.id();
        match heuristics.get(id) {
            None => errors.push(format!("Missing required heuristic: {id}")),
            Some(entry) => validate_heuristic(id, entry, &mut errors),
        }
    }

    validate_back_casting_weights(heuristics, &mut errors);
    validate_coherence_thresholds(heuristics, &mut errors);
    validate_automation_thresholds(heuristics, &mut errors);

    if let Some(validation) = root.get("validation") {
        validate_validation_block(validation, &mut errors);
    }

    ValidationReport::from_errors(errors)
}

fn validate_heuristic(id: &str, entry: &Value, errors: &mut Vec<String>) {
    match entry.get("weights") {
        Some(Value::Object(weights)) => {
            for (key, value) in weights {
                match value.as_f64() {
                    None => errors.push(format!(
                        "{id}.weights.{key}: Must be a number (got {})",
                        json_type_name(value)
                    )),
                    Some(weight) if weight < 0.0 => errors.push(format!(
                        "{id}.weights.{key}: Cannot be negative (got {weight})"
                    )),
                    Some(_) => {}
                }
            }
        }
        _ => errors.push(format!("{id}: Missing weights section")),
    }

    match entry.get("thresholds") {
        Some(Value::Object(thresholds)) => {
            for (key, value) in thresholds {
                let Some(threshold) = value.as_f64() else {
                    errors.push(format!(
                        "{id}.thresholds.{key}: Must be a number (got {})",
                        json_type_name(value)
                    ));
                    continue;
                };

                if key == "tipping_point" {
                    if threshold.fract() != 0.0 || threshold < 1.0 {
                        errors.push(format!(
                            "{id}.thresholds.{key}: Must be integer ≥ 1 (got {threshold})"
                        ));
                    }
                } else if !(0.0..=1.0).contains(&threshold) {
                    errors.push(format!(
                        "{id}.thresholds.{key}: Must be between 0 and 1 (got {threshold})"
                    ));
                }
            }
        }
        _ => errors.push(format!("{id}: Missing thresholds section")),
    }
}

fn validate_back_casting_weights(heuristics: &Map<String, Value>, errors: &mut Vec<String>) {
    let id = BuiltinHeuristic::BackCasting.id();
    let Some(weights) = section(heuristics, id, "weights") else {
        return;
    };

    let sum = number_or_zero(weights, "end_state_vision")
        + number_or_zero(weights, "current_market_signals");
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        errors.push(format!("{id}.weights: Sum should equal 1.0 (got {sum:.2})"));
    }
}

fn validate_coherence_thresholds(heuristics: &Map<String, Value>, errors: &mut Vec<String>) {
    let id = BuiltinHeuristic::CoherenceScan.id();
    let Some(thresholds) = section(heuristics, id, "thresholds") else {
        return;
    };

    let veto = number(thresholds, "veto");
    let review = number(thresholds, "review");
    let approve = number(thresholds, "approve");

    if let (Some(veto), Some(review)) = (veto, review)
        && veto >= review
    {
        errors.push(format!(
            "{id}.thresholds: veto ({veto}) must be < review ({review})"
        ));
    }
    if let (Some(review), Some(approve)) = (review, approve)
        && review >= approve
    {
        errors.push(format!(
            "{id}.thresholds: review ({review}) must be < approve ({approve})"
        ));
    }
}

fn validate_automation_thresholds(heuristics: &Map<String, Value>, errors: &mut Vec<String>) {
    let id = BuiltinHeuristic::AutomationCheck.id();
    let Some(thresholds) = section(heuristics, id, "thresholds") else {
        return;
    };

    if let (Some(standardization), Some(automate)) = (
        number(thresholds, "standardization"),
        number(thresholds, "automate"),
    ) && standardization > automate
    {
        errors.push(format!(
            "{id}.thresholds: standardization ({standardization}) should be ≤ automate ({automate})"
        ));
    }
}

fn validate_validation_block(validation: &Value, errors: &mut Vec<String>) {
    let Some(block) = validation.as_object() else {
        errors.push("validation: Must be an object".to_string());
        return;
    };

    if let Some(strict_mode) = block.get("strict_mode")
        && !strict_mode.is_boolean()
    {
        errors.push("validation.strict_mode: Must be a boolean".to_string());
    }

    if let Some(minimum_score) = block.get("minimum_score") {
        let in_range = minimum_score
            .as_f64()
            .is_some_and(|score| (0.0..=10.0).contains(&score));
        if !in_range {
            errors.push("validation.minimum_score: Must be a number between 0 and 10".to_string());
        }
    }

    if let Some(enable_veto) = block.get("enable_veto")
        && !enable_veto.is_boolean()
    {
        errors.push("validation.enable_veto: Must be a boolean".to_string());
    }
}

fn section<'a>(
    heuristics: &'a Map<String, Value>,
    id: &str,
    name: &str,
) -> Option<&'a Map<String, Value>> {
    heuristics.get(id)?.get(name)?.as_object()
}

fn number(section: &Map<String, Value>, key: &str) -> Option<f64> {
    section.get(key).and_then(Value::as_f64)
}

fn number_or_zero(section: &Map<String, Value>, key: &str) -> f64 {
    number(section, key).unwrap_or(0.0)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
