use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::gate::feedback::Feedback;

/// One workflow phase as far as the gate cares about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub name: String,
    #[serde(default, deserialize_with = "validation_or_none")]
    pub validation: Option<ValidationSpec>,
}

impl PhaseSpec {
    pub fn new(name: impl Into<String>, validation: Option<ValidationSpec>) -> Self {
        Self {
            name: name.into(),
            validation,
        }
    }
}

/// `validation: none` reads the same as an absent block.
fn validation_or_none<'de, D>(deserializer: D) -> Result<Option<ValidationSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Keyword(String),
        Spec(Box<ValidationSpec>),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Keyword(keyword)) if keyword.eq_ignore_ascii_case("none") => Ok(None),
        Some(Raw::Keyword(keyword)) => Err(serde::de::Error::custom(format!(
            "unexpected validation keyword `{keyword}`"
        ))),
        Some(Raw::Spec(spec)) => Ok(Some(*spec)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructuralValidator {
    #[serde(rename = "axiom-validator", alias = "axioma-validator")]
    Axiom,
    #[serde(rename = "task-anatomy")]
    TaskAnatomy,
}

impl StructuralValidator {
    pub fn name(self) -> &'static str {
        match self {
            StructuralValidator::Axiom => "axiom-validator",
            StructuralValidator::TaskAnatomy => "task-anatomy",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "axiom-validator" | "axioma-validator" => Some(StructuralValidator::Axiom),
            "task-anatomy" => Some(StructuralValidator::TaskAnatomy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CriterionSpec {
    Text(String),
    Structured {
        field: String,
        operator: String,
        threshold: f64,
    },
}

impl CriterionSpec {
    pub fn label(&self) -> String {
        match self {
            CriterionSpec::Text(text) => text.clone(),
            CriterionSpec::Structured {
                field,
                operator,
                threshold,
            } => format!("{field} {operator} {threshold}"),
        }
    }
}

impl From<&str> for CriterionSpec {
    fn from(text: &str) -> Self {
        CriterionSpec::Text(text.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSpec {
    pub checkpoint: String,
    #[serde(default)]
    pub heuristic: Option<String>,
    /// Kept as text so an unknown name surfaces as a configuration error
    /// at execution time rather than failing the whole workflow parse.
    #[serde(default)]
    pub validator: Option<String>,
    #[serde(default)]
    pub criteria: Vec<CriterionSpec>,
    #[serde(default)]
    pub veto_conditions: Vec<String>,
    #[serde(default)]
    pub dimensions: Option<Vec<String>>,
    #[serde(default)]
    pub required_fields: Option<Vec<String>>,
    #[serde(default)]
    pub minimum_dimension_score: Option<f64>,
}

impl ValidationSpec {
    pub fn heuristic(checkpoint: impl Into<String>, heuristic_id: impl Into<String>) -> Self {
        Self {
            checkpoint: checkpoint.into(),
            heuristic: Some(heuristic_id.into()),
            ..Self::default()
        }
    }

    pub fn validator(checkpoint: impl Into<String>, validator: StructuralValidator) -> Self {
        Self {
            checkpoint: checkpoint.into(),
            validator: Some(validator.name().to_string()),
            ..Self::default()
        }
    }

    pub fn with_criteria<I, C>(mut self, criteria: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CriterionSpec>,
    {
        self.criteria = criteria.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Veto {
    Truthfulness {
        executor: String,
        value: f64,
        threshold: f64,
        message: String,
    },
    Guardrails {
        message: String,
        required: String,
    },
    AxiomaMinimum {
        dimension: String,
        value: f64,
        threshold: f64,
        message: String,
    },
    MissingFields {
        task: String,
        missing: Vec<String>,
        message: String,
    },
}

impl Veto {
    pub fn kind(&self) -> &'static str {
        match self {
            Veto::Truthfulness { .. } => "truthfulness",
            Veto::Guardrails { .. } => "guardrails",
            Veto::AxiomaMinimum { .. } => "axioma_minimum",
            Veto::MissingFields { .. } => "missing_fields",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Veto::Truthfulness { message, .. }
            | Veto::Guardrails { message, .. }
            | Veto::AxiomaMinimum { message, .. }
            | Veto::MissingFields { message, .. } => message,
        }
    }

    /// `(value, threshold)` for vetoes that compare a number.
    pub fn measurement(&self) -> Option<(f64, f64)> {
        match self {
            Veto::Truthfulness {
                value, threshold, ..
            }
            | Veto::AxiomaMinimum {
                value, threshold, ..
            } => Some((*value, *threshold)),
            Veto::Guardrails { .. } | Veto::MissingFields { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateRecommendation {
    FixRequired,
    ReviewAndFix,
    CheckConfiguration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateSeverity {
    Major,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum ValueSource {
    Score,
    MinDimension,
    Context(String),
    Details(String),
    ScoreFallback,
    Presence,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionResult {
    pub criterion: String,
    pub passed: bool,
    pub actual: serde_json::Value,
    pub expected: String,
    pub message: String,
    pub source: ValueSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionScore {
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateResult {
    pub gate: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    pub veto: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<GateRecommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<GateSeverity>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vetoes: Vec<Veto>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub criteria_results: Vec<CriterionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heuristic_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<DimensionScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub missing_fields: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

impl GateResult {
    pub fn failed_criteria(&self) -> impl Iterator<Item = &CriterionResult> {
        self.criteria_results.iter().filter(|result| !result.passed)
    }
}
