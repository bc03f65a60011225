use serde::Serialize;
use serde_json::json;

use crate::{
    config::HeuristicParams,
    heuristics::{
        inputs::AutomationInput,
        types::{AutomationRecommendation, BuiltinHeuristic, DecisionResult, Recommendation},
    },
};

pub const FREQUENCY_WEIGHT_KEY: &str = "frequency";
pub const STANDARDIZATION_WEIGHT_KEY: &str = "standardization";
pub const GUARDRAILS_WEIGHT_KEY: &str = "guardrails";
pub const TIPPING_POINT_KEY: &str = "tipping_point";
pub const STANDARDIZATION_THRESHOLD_KEY: &str = "standardization";
pub const AUTOMATE_THRESHOLD_KEY: &str = "automate";

/// Monthly executions at which the frequency factor saturates.
const FREQUENCY_CEILING: f64 = 20.0;
const PLAN_AUTOMATION_FLOOR: f64 = 0.5;

pub const GUARDRAIL_NEXT_STEPS: [&str; 4] = [
    "Define error handling procedures",
    "Create validation checkpoints",
    "Establish rollback mechanisms",
    "Document edge cases",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AutomationParams {
    pub frequency_weight: f64,
    pub standardization_weight: f64,
    pub guardrails_weight: f64,
    pub tipping_point: f64,
    pub standardization_minimum: f64,
    pub automate_threshold: f64,
}

impl Default for AutomationParams {
    fn default() -> Self {
        Self {
            frequency_weight: 0.7,
            standardization_weight: 0.9,
            guardrails_weight: 1.0,
            tipping_point: 2.0,
            standardization_minimum: 0.7,
            automate_threshold: 0.75,
        }
    }
}

impl AutomationParams {
    pub fn from_params(params: &HeuristicParams) -> Self {
        let defaults = Self::default();
        Self {
            frequency_weight: params.weight(FREQUENCY_WEIGHT_KEY, defaults.frequency_weight),
            standardization_weight: params
                .weight(STANDARDIZATION_WEIGHT_KEY, defaults.standardization_weight),
            guardrails_weight: params.weight(GUARDRAILS_WEIGHT_KEY, defaults.guardrails_weight),
            tipping_point: params.threshold(TIPPING_POINT_KEY, defaults.tipping_point),
            standardization_minimum: params
                .threshold(STANDARDIZATION_THRESHOLD_KEY, defaults.standardization_minimum),
            automate_threshold: params.threshold(AUTOMATE_THRESHOLD_KEY, defaults.automate_threshold),
        }
    }

    pub fn evaluate(&self, input: &AutomationInput) -> DecisionResult {
        let tipping_point = input.frequency > self.tipping_point;

        if !input.has_guardrails {
            let mut result = DecisionResult::new(
                BuiltinHeuristic::AutomationCheck.id(),
                0.0,
                Recommendation::Automation(AutomationRecommendation::AddGuardrailsFirst),
            )
            .vetoed("MISSING_GUARDRAILS - Cannot automate without safety mechanisms")
            .with_breakdown("frequency", input.frequency)
            .with_breakdown("standardizable", input.standardizable)
            .with_breakdown("hasGuardrails", false)
            .with_metadata("vetoPower", "GUARDRAILS")
            .with_metadata("criticalFailure", true)
            .with_metadata("nextSteps", json!(GUARDRAIL_NEXT_STEPS));
            result.tipping_point = Some(tipping_point);
            result.ready_to_automate = Some(false);
            return result;
        }

        let normalized_frequency = (input.frequency / FREQUENCY_CEILING).min(1.0);
        let frequency_weighted = normalized_frequency * self.frequency_weight;
        let standardizable_weighted = input.standardizable * self.standardization_weight;
        let guardrails_weighted = self.guardrails_weight;
        let total_weight = self.frequency_weight + self.standardization_weight + self.guardrails_weight;
        let score = if total_weight > 0.0 {
            (frequency_weighted + standardizable_weighted + guardrails_weighted) / total_weight
        } else {
            0.0
        };

        let standardized = input.standardizable >= self.standardization_minimum;
        let ready_to_automate = tipping_point && standardized && input.has_guardrails;

        let recommendation = if score >= self.automate_threshold && ready_to_automate {
            AutomationRecommendation::AutomateNow
        } else if score >= PLAN_AUTOMATION_FLOOR && tipping_point {
            AutomationRecommendation::PlanAutomation
        } else if tipping_point && !ready_to_automate {
            if standardized {
                AutomationRecommendation::AddGuardrails
            } else {
                AutomationRecommendation::StandardizeFirst
            }
        } else {
            AutomationRecommendation::KeepManual
        };

        let roi_estimate = if ready_to_automate {
            "HIGH"
        } else if tipping_point {
            "MEDIUM"
        } else {
            "LOW"
        };
        let time_to_automate = if input.standardizable >= 0.9 {
            "1-2 weeks"
        } else if input.standardizable >= 0.7 {
            "2-4 weeks"
        } else {
            "1-2 months"
        };

        let mut result = DecisionResult::new(
            BuiltinHeuristic::AutomationCheck.id(),
            score,
            Recommendation::Automation(recommendation),
        )
        .with_breakdown("frequency", input.frequency)
        .with_breakdown("frequencyNormalized", normalized_frequency)
        .with_breakdown("frequencyWeighted", frequency_weighted)
        .with_breakdown("standardizable", input.standardizable)
        .with_breakdown("standardizableWeighted", standardizable_weighted)
        .with_breakdown("hasGuardrails", true)
        .with_breakdown("guardrailsWeighted", guardrails_weighted)
        .with_metadata("roiEstimate", roi_estimate)
        .with_metadata("timeToAutomate", time_to_automate)
        .with_metadata("riskLevel", "LOW")
        .with_metadata("annualSavings", input.frequency * 12.0);
        result.tipping_point = Some(tipping_point);
        result.ready_to_automate = Some(ready_to_automate);
        result
    }
}
