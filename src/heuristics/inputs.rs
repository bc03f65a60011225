//! Single adaptation boundary between loosely shaped caller context and the
//! canonical inputs the built-in heuristics evaluate.
//!
//! Every accepted alias is listed here and nowhere else. Missing values
//! default to zero (or `false`); values of the wrong type are rejected.

use serde::Serialize;
use serde_json::{Map, Value};
use validator::Validate;

use crate::heuristics::error::{HeuristicError, invalid_input};

pub const END_STATE_CLARITY_ALIASES: &[&[&str]] = &[&["endStateVision", "clarity"], &["endStateClarity"]];
pub const MARKET_ALIGNMENT_ALIASES: &[&[&str]] = &[&["marketSignals", "alignment"], &["marketAlignment"]];
pub const TRUTHFULNESS_ALIASES: &[&[&str]] = &[&["truthfulness"], &["truthfulnessCoherence"]];
pub const SYSTEM_ADHERENCE_ALIASES: &[&[&str]] =
    &[&["systemAdherence"], &["systemAdherencePotential"]];
pub const SKILL_ALIASES: &[&[&str]] = &[&["skill"], &["technicalSkill"]];
pub const FREQUENCY_ALIASES: &[&[&str]] = &[&["executionsPerMonth"], &["frequency"]];
pub const STANDARDIZABLE_ALIASES: &[&[&str]] = &[&["standardizable"], &["standardization"]];
pub const GUARDRAILS_ALIASES: &[&[&str]] = &[&["hasGuardrails"], &["guardrails"]];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BackCastingInput {
    #[validate(range(min = 0.0, max = 1.0))]
    pub end_state_clarity: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub market_alignment: f64,
}

impl BackCastingInput {
    pub fn from_context(context: &Value) -> Result<Self, HeuristicError> {
        let fields = object(context)?;
        let input = Self {
            end_state_clarity: number(fields, END_STATE_CLARITY_ALIASES)?.unwrap_or(0.0),
            market_alignment: number(fields, MARKET_ALIGNMENT_ALIASES)?.unwrap_or(0.0),
        };
        checked(input)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CoherenceInput {
    #[validate(range(min = 0.0, max = 1.0))]
    pub truthfulness: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub system_adherence: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub skill: f64,
}

impl CoherenceInput {
    pub fn from_context(context: &Value) -> Result<Self, HeuristicError> {
        let fields = object(context)?;
        let input = Self {
            truthfulness: number(fields, TRUTHFULNESS_ALIASES)?.unwrap_or(0.0),
            system_adherence: number(fields, SYSTEM_ADHERENCE_ALIASES)?.unwrap_or(0.0),
            skill: number(fields, SKILL_ALIASES)?.unwrap_or(0.0),
        };
        checked(input)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AutomationInput {
    #[validate(range(min = 0.0))]
    pub frequency: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub standardizable: f64,
    pub has_guardrails: bool,
}

impl AutomationInput {
    pub fn from_context(context: &Value) -> Result<Self, HeuristicError> {
        let fields = object(context)?;
        let input = Self {
            frequency: number(fields, FREQUENCY_ALIASES)?.unwrap_or(0.0),
            standardizable: number(fields, STANDARDIZABLE_ALIASES)?.unwrap_or(0.0),
            has_guardrails: guardrails(fields)?,
        };
        checked(input)
    }
}

fn object(context: &Value) -> Result<&Map<String, Value>, HeuristicError> {
    context
        .as_object()
        .ok_or_else(|| invalid_input("context must be a JSON object"))
}

fn checked<T: Validate>(input: T) -> Result<T, HeuristicError> {
    input
        .validate()
        .map_err(|errors| invalid_input(format!("input out of range: {errors}")))?;
    Ok(input)
}

fn lookup<'a>(fields: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = fields.get(*first)?;
    for segment in rest {
        current = current.get(*segment)?;
    }
    (!current.is_null()).then_some(current)
}

/// First alias that is present wins.
fn resolve<'a>(fields: &'a Map<String, Value>, aliases: &[&[&str]]) -> Option<(String, &'a Value)> {
    aliases
        .iter()
        .find_map(|path| lookup(fields, path).map(|value| (path.join("."), value)))
}

fn number(fields: &Map<String, Value>, aliases: &[&[&str]]) -> Result<Option<f64>, HeuristicError> {
    match resolve(fields, aliases) {
        None => Ok(None),
        Some((name, value)) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| invalid_input(format!("{name} must be a number"))),
    }
}

fn guardrails(fields: &Map<String, Value>) -> Result<bool, HeuristicError> {
    match resolve(fields, GUARDRAILS_ALIASES) {
        None => Ok(false),
        Some((_, Value::Bool(flag))) => Ok(*flag),
        Some((_, Value::Array(items))) => Ok(!items.is_empty()),
        Some((name, _)) => Err(invalid_input(format!(
            "{name} must be a boolean or a list of guardrails"
        ))),
    }
}
