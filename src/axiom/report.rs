use std::fmt::Write;

use crate::axiom::{
    catalog::Severity,
    validator::AxiomValidationResult,
};

pub fn generate_report(result: &AxiomValidationResult) -> String {
    let mut report = String::from("=== AXIOM VALIDATION REPORT ===\n\n");
    writeln!(report, "Overall Score: {:.1}/10.0", result.overall_score).ok();
    writeln!(report, "Recommendation: {}", recommendation_label(result)).ok();
    if result.veto {
        report.push_str("VETO APPLIED - critical coherence violation detected\n");
    }
    report.push('\n');

    report.push_str("--- Level Scores ---\n");
    for (level, score) in &result.level_scores {
        writeln!(
            report,
            "  {}: {:.1}/10.0",
            level.label().to_uppercase(),
            score.score
        )
        .ok();
    }
    report.push('\n');

    if !result.strengths.is_empty() {
        report.push_str("--- Strengths ---\n");
        for strength in &result.strengths {
            writeln!(
                report,
                "  + [{}] {} (+{:.1})",
                strength.level, strength.reason, strength.score_impact
            )
            .ok();
        }
        report.push('\n');
    }

    if !result.violations.is_empty() {
        report.push_str("--- Violations ---\n");
        for violation in &result.violations {
            let marker = match violation.severity {
                Severity::Critical => "!!",
                Severity::Medium => "! ",
                Severity::Low => "- ",
            };
            writeln!(report, "  {marker} [{}] {}", violation.level, violation.reason).ok();
        }
        report.push('\n');
    }

    report.push_str("===============================\n");
    report
}

fn recommendation_label(result: &AxiomValidationResult) -> String {
    serde_json::to_value(result.recommendation)
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_default()
}
