use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    config::HeuristicParams,
    heuristics::{
        inputs::CoherenceInput,
        types::{BuiltinHeuristic, CoherenceRecommendation, DecisionResult, Recommendation},
    },
};

pub const TRUTHFULNESS_WEIGHT_KEY: &str = "truthfulness";
pub const SYSTEM_WEIGHT_KEY: &str = "system_adherence";
pub const SKILL_WEIGHT_KEY: &str = "skill";
pub const VETO_THRESHOLD_KEY: &str = "veto";
pub const APPROVE_THRESHOLD_KEY: &str = "approve";
pub const REVIEW_THRESHOLD_KEY: &str = "review";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoherenceParams {
    pub truthfulness_weight: f64,
    pub system_weight: f64,
    pub skill_weight: f64,
    pub veto_threshold: f64,
    pub approve_threshold: f64,
    pub review_threshold: f64,
}

impl Default for CoherenceParams {
    fn default() -> Self {
        Self {
            truthfulness_weight: 1.0,
            system_weight: 0.8,
            skill_weight: 0.3,
            veto_threshold: 0.7,
            approve_threshold: 0.8,
            review_threshold: 0.6,
        }
    }
}

impl CoherenceParams {
    pub fn from_params(params: &HeuristicParams) -> Self {
        let defaults = Self::default();
        Self {
            truthfulness_weight: params.weight(TRUTHFULNESS_WEIGHT_KEY, defaults.truthfulness_weight),
            system_weight: params.weight(SYSTEM_WEIGHT_KEY, defaults.system_weight),
            skill_weight: params.weight(SKILL_WEIGHT_KEY, defaults.skill_weight),
            veto_threshold: params.threshold(VETO_THRESHOLD_KEY, defaults.veto_threshold),
            approve_threshold: params.threshold(APPROVE_THRESHOLD_KEY, defaults.approve_threshold),
            review_threshold: params.threshold(REVIEW_THRESHOLD_KEY, defaults.review_threshold),
        }
    }

    pub fn evaluate(&self, input: &CoherenceInput) -> DecisionResult {
        // Truthfulness vetoes before any weighting happens.
        if input.truthfulness < self.veto_threshold {
            return DecisionResult::new(
                BuiltinHeuristic::CoherenceScan.id(),
                0.0,
                Recommendation::Coherence(CoherenceRecommendation::Reject),
            )
            .vetoed(format!(
                "TRUTHFULNESS_BELOW_THRESHOLD ({:.2} < {})",
                input.truthfulness, self.veto_threshold
            ))
            .with_breakdown("truthfulness", input.truthfulness)
            .with_breakdown("systemAdherence", input.system_adherence)
            .with_breakdown("skill", input.skill)
            .with_metadata("vetoPower", "TRUTHFULNESS")
            .with_metadata("criticalFailure", true);
        }

        let truthfulness_weighted = input.truthfulness * self.truthfulness_weight;
        let system_weighted = input.system_adherence * self.system_weight;
        let skill_weighted = input.skill * self.skill_weight;
        let total_weight = self.truthfulness_weight + self.system_weight + self.skill_weight;
        let score = if total_weight > 0.0 {
            (truthfulness_weighted + system_weighted + skill_weighted) / total_weight
        } else {
            0.0
        };

        let recommendation = if score >= self.approve_threshold {
            CoherenceRecommendation::Approve
        } else if score >= self.review_threshold {
            CoherenceRecommendation::Review
        } else {
            CoherenceRecommendation::Reject
        };

        DecisionResult::new(
            BuiltinHeuristic::CoherenceScan.id(),
            score,
            Recommendation::Coherence(recommendation),
        )
        .with_breakdown("truthfulness", input.truthfulness)
        .with_breakdown("truthfulnessWeighted", truthfulness_weighted)
        .with_breakdown("systemAdherence", input.system_adherence)
        .with_breakdown("systemAdherenceWeighted", system_weighted)
        .with_breakdown("skill", input.skill)
        .with_breakdown("skillWeighted", skill_weighted)
        .with_metadata("hierarchyRank", hierarchy_rank(score))
        .with_metadata("criticalFactors", self.critical_factors(input))
    }

    fn critical_factors(&self, input: &CoherenceInput) -> Value {
        let mut factors = Vec::new();
        if input.truthfulness >= 0.9 {
            factors.push("High truthfulness");
        }
        if input.system_adherence >= 0.8 {
            factors.push("Good system fit");
        } else if input.system_adherence < 0.5 {
            factors.push("Poor system fit");
        }
        if input.skill >= 0.8 {
            factors.push("Strong skills");
        }
        json!(factors)
    }
}

fn hierarchy_rank(score: f64) -> &'static str {
    if score >= 0.9 {
        "EXCELLENT"
    } else if score >= 0.8 {
        "GOOD"
    } else if score >= 0.6 {
        "ACCEPTABLE"
    } else {
        "POOR"
    }
}
