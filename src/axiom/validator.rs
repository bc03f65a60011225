use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex},
};

use serde::Serialize;
use serde_json::{Value, json};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::{
    axiom::catalog::{AxiomLevel, AxiomSet, LevelAxioms, Severity},
    config::ValidationSettings,
    observability::{LogLevel, ObservabilitySink},
};

const COMPONENT: &str = "axiom_validator";
const BASELINE_SCORE: f64 = 5.0;
const MAX_SCORE: f64 = 10.0;
const REVIEW_FACTOR: f64 = 0.8;
const SNIPPET_CHARS: usize = 200;
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
pub const DEFAULT_MIN_SCORE: f64 = 7.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxiomValidationOptions {
    pub levels: Vec<AxiomLevel>,
    pub min_score: f64,
    pub strict: bool,
}

impl Default for AxiomValidationOptions {
    fn default() -> Self {
        Self {
            levels: AxiomLevel::ALL.to_vec(),
            min_score: DEFAULT_MIN_SCORE,
            strict: false,
        }
    }
}

impl AxiomValidationOptions {
    pub fn only(levels: &[AxiomLevel]) -> Self {
        Self {
            levels: levels.to_vec(),
            ..Self::default()
        }
    }

    /// `strict` needs both `strict_mode` and a veto that is not disabled.
    pub fn from_settings(settings: &ValidationSettings) -> Self {
        Self {
            min_score: settings.minimum_score.unwrap_or(DEFAULT_MIN_SCORE),
            strict: settings.strict_mode.unwrap_or(false) && settings.enable_veto.unwrap_or(true),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub level: AxiomLevel,
    pub axiom: String,
    pub reason: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Strength {
    pub level: AxiomLevel,
    pub axiom: String,
    pub reason: String,
    pub score_impact: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelScore {
    pub score: f64,
    pub violations: Vec<Violation>,
    pub strengths: Vec<Strength>,
    pub veto: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub veto_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AxiomRecommendation {
    Approve,
    Review,
    RejectLowScore,
    RejectVeto,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxiomValidationResult {
    pub overall_score: f64,
    pub level_scores: BTreeMap<AxiomLevel, LevelScore>,
    pub violations: Vec<Violation>,
    pub strengths: Vec<Strength>,
    pub recommendation: AxiomRecommendation,
    pub veto: bool,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub content: String,
    pub result: AxiomValidationResult,
    pub timestamp: String,
}

/// Content to score; structured values are stringified before matching.
#[derive(Debug, Clone, Copy)]
pub enum AxiomContent<'a> {
    Text(&'a str),
    Structured(&'a Value),
}

impl<'a> From<&'a str> for AxiomContent<'a> {
    fn from(text: &'a str) -> Self {
        AxiomContent::Text(text)
    }
}

impl<'a> From<&'a String> for AxiomContent<'a> {
    fn from(text: &'a String) -> Self {
        AxiomContent::Text(text)
    }
}

impl<'a> From<&'a Value> for AxiomContent<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::String(text) => AxiomContent::Text(text),
            other => AxiomContent::Structured(other),
        }
    }
}

impl AxiomContent<'_> {
    fn to_text(self) -> String {
        match self {
            AxiomContent::Text(text) => text.to_string(),
            AxiomContent::Structured(value) => value.to_string(),
        }
    }
}

pub struct AxiomValidator {
    axioms: AxiomSet,
    history: Mutex<VecDeque<HistoryEntry>>,
    history_capacity: usize,
    observability: Arc<dyn ObservabilitySink>,
}

impl AxiomValidator {
    pub fn new(observability: Arc<dyn ObservabilitySink>) -> Self {
        Self::with_axioms(AxiomSet::core(), observability)
    }

    pub fn with_axioms(axioms: AxiomSet, observability: Arc<dyn ObservabilitySink>) -> Self {
        Self {
            axioms,
            history: Mutex::new(VecDeque::new()),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            observability,
        }
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity.max(1);
        self
    }

    pub fn axioms(&self) -> &AxiomSet {
        &self.axioms
    }

    pub fn validate<'a>(
        &self,
        content: impl Into<AxiomContent<'a>>,
        options: &AxiomValidationOptions,
    ) -> AxiomValidationResult {
        let text = content.into().to_text();
        let lowered = text.to_lowercase();
        let operation_id = format!("validation_{}", Uuid::now_v7());
        self.observability.start_timer(
            &operation_id,
            "validation",
            &json!({
                "contentLength": text.chars().count(),
                "levelsCount": options.levels.len(),
                "strictMode": options.strict,
            }),
        );

        let mut level_scores = BTreeMap::new();
        for level in AxiomLevel::ALL {
            if !options.levels.contains(&level) {
                continue;
            }
            if let Some(axioms) = self.axioms.level(level) {
                level_scores.insert(level, score_level(axioms, &lowered));
            }
        }

        let overall_score = if level_scores.is_empty() {
            0.0
        } else {
            level_scores.values().map(|level| level.score).sum::<f64>() / level_scores.len() as f64
        };
        let veto = level_scores
            .iter()
            .any(|(level, score)| level.has_veto_authority() && score.veto);

        let violations = level_scores
            .values()
            .flat_map(|level| level.violations.iter().cloned())
            .collect::<Vec<_>>();
        let strengths = level_scores
            .values()
            .flat_map(|level| level.strengths.iter().cloned())
            .collect::<Vec<_>>();

        let recommendation = if veto && options.strict {
            AxiomRecommendation::RejectVeto
        } else if overall_score >= options.min_score {
            AxiomRecommendation::Approve
        } else if overall_score >= options.min_score * REVIEW_FACTOR {
            AxiomRecommendation::Review
        } else {
            AxiomRecommendation::RejectLowScore
        };

        let timestamp = now_rfc3339();
        let result = AxiomValidationResult {
            overall_score,
            level_scores,
            violations,
            strengths,
            recommendation,
            veto,
            timestamp: timestamp.clone(),
        };

        self.push_history(HistoryEntry {
            content: text.chars().take(SNIPPET_CHARS).collect(),
            result: result.clone(),
            timestamp,
        });

        self.observability.end_timer(
            &operation_id,
            &json!({
                "score": result.overall_score,
                "recommendation": result.recommendation,
                "veto": result.veto,
            }),
        );
        self.observability.log(
            LogLevel::Info,
            COMPONENT,
            "validation_completed",
            &json!({
                "overallScore": format!("{:.1}", result.overall_score),
                "recommendation": result.recommendation,
                "veto": result.veto,
                "violationsCount": result.violations.len(),
                "strengthsCount": result.strengths.len(),
            }),
        );

        if result.veto {
            let veto_violation = result
                .violations
                .iter()
                .find(|violation| violation.severity == Severity::Critical);
            let metadata = json!({
                "component": COMPONENT,
                "overallScore": result.overall_score,
                "vetoReason": veto_violation.map(|violation| violation.reason.as_str()),
                "vetoLevel": veto_violation.map(|violation| violation.level),
            });
            self.observability
                .record_fallback("validation_veto_triggered", &metadata);
            self.observability
                .log(LogLevel::Warn, COMPONENT, "validation_veto_triggered", &metadata);
        }

        result
    }

    /// Most recent `limit` entries, oldest first.
    pub fn history(&self, limit: usize) -> Vec<HistoryEntry> {
        let history = self.history.lock().expect("lock poisoned");
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().expect("lock poisoned").len()
    }

    pub fn clear_history(&self) {
        self.history.lock().expect("lock poisoned").clear();
    }

    fn push_history(&self, entry: HistoryEntry) {
        let mut history = self.history.lock().expect("lock poisoned");
        while history.len() >= self.history_capacity {
            history.pop_front();
        }
        history.push_back(entry);
    }
}

fn score_level(axioms: &LevelAxioms, content: &str) -> LevelScore {
    let level = axioms.level;
    let mut score = BASELINE_SCORE;
    let mut strengths = Vec::new();
    let mut violations = Vec::new();
    let mut hits_by_belief = BTreeMap::new();

    for belief in &axioms.beliefs {
        let hits = count_keywords(content, belief.keywords);
        hits_by_belief.insert(belief.key, hits);
        if hits == 0 {
            continue;
        }
        let bonus = (hits as f64 * belief.per_hit_weight).min(belief.cap);
        score += bonus;
        strengths.push(Strength {
            level,
            axiom: belief.key.to_string(),
            reason: belief.strength.to_string(),
            score_impact: bonus,
        });
    }

    for rule in &axioms.penalties {
        if rule.matcher.matches(content) {
            score -= rule.penalty;
            violations.push(Violation {
                level,
                axiom: rule.axiom.to_string(),
                reason: rule.reason.to_string(),
                severity: rule.severity,
            });
        }
    }

    let mut veto_reason = None;
    if let Some(rule) = &axioms.veto {
        let offset_hits = hits_by_belief.get(rule.offset_belief).copied().unwrap_or(0);
        let marked = rule.markers.iter().any(|marker| content.contains(marker));
        if offset_hits == 0 && marked {
            score = 0.0;
            veto_reason = Some(rule.reason.to_string());
            violations.push(Violation {
                level,
                axiom: rule.offset_belief.to_string(),
                reason: rule.reason.to_string(),
                severity: Severity::Critical,
            });
        }
    }

    tracing::debug!(
        target: "axiom",
        level = %level,
        score = score,
        violations = violations.len(),
        strengths = strengths.len(),
        veto = veto_reason.is_some(),
        "level_validation_completed"
    );

    LevelScore {
        score: score.clamp(0.0, MAX_SCORE),
        violations,
        strengths,
        veto: veto_reason.is_some(),
        veto_reason,
    }
}

/// Number of distinct keywords that occur anywhere in `content`.
fn count_keywords(content: &str, keywords: &[&str]) -> usize {
    keywords
        .iter()
        .filter(|keyword| content.contains(&keyword.to_lowercase()))
        .count()
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}
