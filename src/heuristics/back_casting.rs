use serde::Serialize;

use crate::{
    config::HeuristicParams,
    heuristics::{
        inputs::BackCastingInput,
        types::{
            BackCastingRecommendation, BuiltinHeuristic, Confidence, DecisionResult, Priority,
            Recommendation,
        },
    },
};

pub const END_STATE_WEIGHT_KEY: &str = "end_state_vision";
pub const MARKET_WEIGHT_KEY: &str = "current_market_signals";
pub const CONFIDENCE_THRESHOLD_KEY: &str = "confidence";
pub const PRIORITY_THRESHOLD_KEY: &str = "priority";

const MEDIUM_PRIORITY_FACTOR: f64 = 0.625;
const MEDIUM_CONFIDENCE_FLOOR: f64 = 0.5;
const DEFER_BELOW: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BackCastingParams {
    pub end_state_weight: f64,
    pub market_weight: f64,
    pub confidence_threshold: f64,
    pub priority_threshold: f64,
}

impl Default for BackCastingParams {
    fn default() -> Self {
        Self {
            end_state_weight: 0.9,
            market_weight: 0.1,
            confidence_threshold: 0.8,
            priority_threshold: 0.8,
        }
    }
}

impl BackCastingParams {
    pub fn from_params(params: &HeuristicParams) -> Self {
        let defaults = Self::default();
        Self {
            end_state_weight: params.weight(END_STATE_WEIGHT_KEY, defaults.end_state_weight),
            market_weight: params.weight(MARKET_WEIGHT_KEY, defaults.market_weight),
            confidence_threshold: params
                .threshold(CONFIDENCE_THRESHOLD_KEY, defaults.confidence_threshold),
            priority_threshold: params.threshold(PRIORITY_THRESHOLD_KEY, defaults.priority_threshold),
        }
    }

    pub fn evaluate(&self, input: &BackCastingInput) -> DecisionResult {
        let end_state_contribution = input.end_state_clarity * self.end_state_weight;
        let market_contribution = input.market_alignment * self.market_weight;
        let score = end_state_contribution + market_contribution;

        let priority = if score >= self.priority_threshold {
            Priority::High
        } else if score >= self.priority_threshold * MEDIUM_PRIORITY_FACTOR {
            Priority::Medium
        } else {
            Priority::Low
        };

        let confidence = if input.end_state_clarity >= self.confidence_threshold {
            Confidence::High
        } else if input.end_state_clarity >= MEDIUM_CONFIDENCE_FLOOR {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        let recommendation = if score >= self.priority_threshold && confidence == Confidence::High
        {
            BackCastingRecommendation::Proceed
        } else if score < DEFER_BELOW {
            BackCastingRecommendation::Defer
        } else {
            BackCastingRecommendation::Review
        };

        let accuracy_estimate = match confidence {
            Confidence::High => "85%",
            Confidence::Medium => "70%",
            Confidence::Low => "50%",
        };
        let decision_speed = if score >= self.confidence_threshold {
            "< 1 hour"
        } else {
            "1-3 days"
        };

        let mut result = DecisionResult::new(
            BuiltinHeuristic::BackCasting.id(),
            score,
            Recommendation::BackCasting(recommendation),
        )
        .with_breakdown("endStateContribution", end_state_contribution)
        .with_breakdown("marketContribution", market_contribution)
        .with_breakdown("endStateClarity", input.end_state_clarity)
        .with_breakdown("marketAlignment", input.market_alignment)
        .with_metadata("decisionSpeed", decision_speed)
        .with_metadata("accuracyEstimate", accuracy_estimate)
        .with_metadata("timeHorizon", "3-5 years");
        result.priority = Some(priority);
        result.confidence = Some(confidence);
        result
    }
}
