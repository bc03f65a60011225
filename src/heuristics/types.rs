use std::{collections::BTreeMap, fmt};

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuiltinHeuristic {
    BackCasting,
    CoherenceScan,
    AutomationCheck,
}

impl BuiltinHeuristic {
    pub const ALL: [BuiltinHeuristic; 3] = [
        BuiltinHeuristic::BackCasting,
        BuiltinHeuristic::CoherenceScan,
        BuiltinHeuristic::AutomationCheck,
    ];

    pub fn id(self) -> &'static str {
        match self {
            BuiltinHeuristic::BackCasting => "PV_BS_001",
            BuiltinHeuristic::CoherenceScan => "PV_PA_001",
            BuiltinHeuristic::AutomationCheck => "PV_PM_001",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinHeuristic::BackCasting => "Future System Back-Casting",
            BuiltinHeuristic::CoherenceScan => "Systemic Coherence Scan",
            BuiltinHeuristic::AutomationCheck => "Automation Tipping Point",
        }
    }

    pub fn domain(self) -> &'static str {
        match self {
            BuiltinHeuristic::BackCasting => "business_strategy",
            BuiltinHeuristic::CoherenceScan => "people_assessment",
            BuiltinHeuristic::AutomationCheck => "process_management",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.id() == id)
    }
}

impl fmt::Display for BuiltinHeuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackCastingRecommendation {
    Proceed,
    Review,
    Defer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoherenceRecommendation {
    Approve,
    Review,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutomationRecommendation {
    AutomateNow,
    PlanAutomation,
    StandardizeFirst,
    AddGuardrails,
    AddGuardrailsFirst,
    KeepManual,
}

/// Per-heuristic recommendation; custom templates carry their own label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Recommendation {
    BackCasting(BackCastingRecommendation),
    Coherence(CoherenceRecommendation),
    Automation(AutomationRecommendation),
    Custom(String),
}

impl Recommendation {
    pub fn as_str(&self) -> &str {
        match self {
            Recommendation::BackCasting(recommendation) => match recommendation {
                BackCastingRecommendation::Proceed => "PROCEED",
                BackCastingRecommendation::Review => "REVIEW",
                BackCastingRecommendation::Defer => "DEFER",
            },
            Recommendation::Coherence(recommendation) => match recommendation {
                CoherenceRecommendation::Approve => "APPROVE",
                CoherenceRecommendation::Review => "REVIEW",
                CoherenceRecommendation::Reject => "REJECT",
            },
            Recommendation::Automation(recommendation) => match recommendation {
                AutomationRecommendation::AutomateNow => "AUTOMATE_NOW",
                AutomationRecommendation::PlanAutomation => "PLAN_AUTOMATION",
                AutomationRecommendation::StandardizeFirst => "STANDARDIZE_FIRST",
                AutomationRecommendation::AddGuardrails => "ADD_GUARDRAILS",
                AutomationRecommendation::AddGuardrailsFirst => "ADD_GUARDRAILS_FIRST",
                AutomationRecommendation::KeepManual => "KEEP_MANUAL",
            },
            Recommendation::Custom(label) => label,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResult {
    pub heuristic: String,
    pub score: f64,
    pub recommendation: Recommendation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipping_point: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_to_automate: Option<bool>,
    pub veto: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub veto_reason: Option<String>,
    pub breakdown: BTreeMap<String, Value>,
    pub metadata: BTreeMap<String, Value>,
}

impl DecisionResult {
    pub fn new(heuristic: impl Into<String>, score: f64, recommendation: Recommendation) -> Self {
        Self {
            heuristic: heuristic.into(),
            score,
            recommendation,
            priority: None,
            confidence: None,
            tipping_point: None,
            ready_to_automate: None,
            veto: false,
            veto_reason: None,
            breakdown: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn vetoed(mut self, reason: impl Into<String>) -> Self {
        self.veto = true;
        self.veto_reason = Some(reason.into());
        self
    }

    pub fn with_breakdown(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.breakdown.insert(key.to_string(), value.into());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
