use std::fmt::Write;

use serde::Serialize;

use crate::gate::types::{CriterionResult, GateResult, GateSeverity, Veto};

pub const DEFAULT_DOCS_BASE: &str = "docs/hybrid-ops";

const RULE_WIDTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeedbackSeverity {
    Info,
    Major,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixSuggestion {
    pub title: String,
    pub steps: Vec<String>,
}

impl FixSuggestion {
    fn new(title: impl Into<String>, steps: &[&str]) -> Self {
        Self {
            title: title.into(),
            steps: steps.iter().map(|step| step.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocLink {
    pub description: String,
    pub path: String,
}

/// Remediation feedback attached to every non-skipped gate result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub severity: FeedbackSeverity,
    pub headline: String,
    pub issues: Vec<String>,
    pub fixes: Vec<FixSuggestion>,
    pub documentation: Vec<DocLink>,
    pub next_actions: Vec<String>,
}

impl Feedback {
    pub fn render(&self) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        let mut out = String::new();
        if self.severity == FeedbackSeverity::Info {
            writeln!(out, "{}", self.headline).ok();
            for issue in &self.issues {
                writeln!(out, "   {issue}").ok();
            }
            return out;
        }

        writeln!(out, "{rule}\n{}\n{rule}", self.headline).ok();
        if !self.issues.is_empty() {
            out.push_str("\nISSUES:\n");
            for (index, issue) in self.issues.iter().enumerate() {
                writeln!(out, "   {}. {issue}", index + 1).ok();
            }
        }
        if !self.fixes.is_empty() {
            out.push_str("\nFIXES:\n");
            for (index, fix) in self.fixes.iter().enumerate() {
                writeln!(out, "   {}. {}", index + 1, fix.title).ok();
                for step in &fix.steps {
                    writeln!(out, "      - {step}").ok();
                }
            }
        }
        if !self.documentation.is_empty() {
            out.push_str("\nDOCUMENTATION:\n");
            for link in &self.documentation {
                writeln!(out, "   - {}\n     {}", link.description, link.path).ok();
            }
        }
        writeln!(out, "\n{rule}\nChoose: {}\n{rule}", self.next_actions.join(" ")).ok();
        out
    }
}

struct DocEntry {
    key: &'static str,
    description: &'static str,
    primary: Option<(&'static str, &'static str)>,
    guide: Option<&'static str>,
}

const DOC_ENTRIES: &[DocEntry] = &[
    DocEntry {
        key: "PV_BS_001",
        description: "Future System Back-Casting (Strategic Alignment)",
        primary: Some(("Heuristic", "heuristics/PV_BS_001-future-back-casting.md")),
        guide: Some("guides/strategic-alignment-guide.md"),
    },
    DocEntry {
        key: "PV_PA_001",
        description: "Systemic Coherence Scan (Executor Truthfulness)",
        primary: Some(("Heuristic", "heuristics/PV_PA_001-coherence-scan.md")),
        guide: Some("guides/executor-coherence-guide.md"),
    },
    DocEntry {
        key: "PV_PM_001",
        description: "Automation Tipping Point Assessment",
        primary: Some(("Heuristic", "heuristics/PV_PM_001-automation-tipping-point.md")),
        guide: Some("guides/automation-readiness-guide.md"),
    },
    DocEntry {
        key: "axiom-validator",
        description: "Axiom 10-Dimensional Quality Framework",
        primary: Some(("Validator", "validators/axiom-validator.md")),
        guide: Some("guides/axiom-compliance-guide.md"),
    },
    DocEntry {
        key: "task-anatomy",
        description: "Task Anatomy 8-Field Structure",
        primary: Some(("Validator", "validators/task-anatomy-validator.md")),
        guide: Some("guides/task-anatomy-guide.md"),
    },
    DocEntry {
        key: "strategic-alignment",
        description: "Strategic Alignment Checkpoint",
        primary: Some(("Checkpoint", "checkpoints/strategic-alignment.md")),
        guide: None,
    },
    DocEntry {
        key: "coherence-scan",
        description: "Coherence Scan Checkpoint",
        primary: Some(("Checkpoint", "checkpoints/coherence-scan.md")),
        guide: None,
    },
    DocEntry {
        key: "automation-readiness",
        description: "Automation Readiness Checkpoint",
        primary: Some(("Checkpoint", "checkpoints/automation-readiness.md")),
        guide: None,
    },
    DocEntry {
        key: "axioma-compliance",
        description: "Axiom Compliance Checkpoint",
        primary: Some(("Checkpoint", "checkpoints/axioma-compliance.md")),
        guide: None,
    },
    DocEntry {
        key: "task-anatomy-check",
        description: "Task Anatomy Checkpoint",
        primary: Some(("Checkpoint", "checkpoints/task-anatomy-check.md")),
        guide: None,
    },
];

/// `strategic-alignment` and `strategic_alignment` both become "Strategic Alignment".
pub fn format_checkpoint_name(checkpoint: &str) -> String {
    checkpoint
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn axiom_improvement(dimension: &str) -> &'static str {
    match dimension {
        "Truthfulness" => "Improve data accuracy and executor honesty assessment",
        "Coherence" => "Align system components and team understanding",
        "Strategic Alignment" => "Clarify long-term vision and priorities",
        "Operational Excellence" => "Standardize processes and improve efficiency",
        "Innovation Capacity" => "Foster creativity and experimentation",
        "Risk Management" => "Identify and mitigate potential risks",
        "Resource Optimization" => "Improve resource allocation and utilization",
        "Stakeholder Value" => "Enhance value delivery to stakeholders",
        "Sustainability" => "Ensure long-term viability and maintenance",
        "Adaptability" => "Increase system flexibility and resilience",
        _ => "Review dimension definition and improvement strategies",
    }
}

/// One line per result: passed, vetoed or failed with its severity.
pub fn summary(result: &GateResult) -> String {
    let name = format_checkpoint_name(&result.gate);
    let severity = match result.severity {
        Some(GateSeverity::Critical) => "CRITICAL",
        Some(GateSeverity::Major) => "MAJOR",
        None => "UNKNOWN",
    };
    if result.passed {
        format!("{name} - PASSED")
    } else if result.veto {
        format!("{name} - VETO TRIGGERED ({severity})")
    } else {
        format!("{name} - FAILED ({severity})")
    }
}

#[derive(Debug, Clone)]
pub struct FeedbackGenerator {
    docs_base: String,
}

impl Default for FeedbackGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_DOCS_BASE)
    }
}

impl FeedbackGenerator {
    pub fn new(docs_base: impl Into<String>) -> Self {
        Self {
            docs_base: docs_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn success(&self, result: &GateResult) -> Feedback {
        let mut issues = Vec::new();
        if let Some(score) = result.score {
            issues.push(format!("Score: {score:.2}/10.0"));
        }
        issues.push("All criteria met. Proceeding to next phase.".to_string());
        Feedback {
            severity: FeedbackSeverity::Info,
            headline: format!("{} validation passed", format_checkpoint_name(&result.gate)),
            issues,
            fixes: Vec::new(),
            documentation: Vec::new(),
            next_actions: Vec::new(),
        }
    }

    pub fn veto(&self, result: &GateResult) -> Feedback {
        let issues = result
            .vetoes
            .iter()
            .map(|veto| match veto.measurement() {
                Some((value, threshold)) => format!(
                    "{} [{}] (current {value}, required {threshold})",
                    veto_issue(veto),
                    veto.kind()
                ),
                None => format!("{} [{}]", veto_issue(veto), veto.kind()),
            })
            .collect();

        Feedback {
            severity: FeedbackSeverity::Critical,
            headline: format!(
                "{} - VETO TRIGGERED",
                format_checkpoint_name(&result.gate).to_uppercase()
            ),
            issues,
            fixes: result.vetoes.iter().map(veto_fix).collect(),
            documentation: self.documentation(result),
            next_actions: vec!["[FIX VETOES]".to_string(), "[ABORT WORKFLOW]".to_string()],
        }
    }

    pub fn criteria_failure(&self, result: &GateResult) -> Feedback {
        let issues = result
            .failed_criteria()
            .map(criterion_issue)
            .collect();

        Feedback {
            severity: FeedbackSeverity::Major,
            headline: format!("{} validation failed", format_checkpoint_name(&result.gate)),
            issues,
            fixes: criteria_fixes(result),
            documentation: self.documentation(result),
            next_actions: vec![
                "[FIX]".to_string(),
                "[SKIP VALIDATION]".to_string(),
                "[ABORT WORKFLOW]".to_string(),
            ],
        }
    }

    pub fn error(&self, result: &GateResult) -> Feedback {
        Feedback {
            severity: FeedbackSeverity::Critical,
            headline: format!(
                "{} validation could not run",
                format_checkpoint_name(&result.gate)
            ),
            issues: result.message.iter().cloned().collect(),
            fixes: vec![FixSuggestion::new(
                "Check the checkpoint configuration",
                &[
                    "Verify the heuristic id or validator name",
                    "Verify every criterion follows the criteria grammar",
                ],
            )],
            documentation: self.documentation(result),
            next_actions: vec!["[FIX CONFIGURATION]".to_string(), "[ABORT WORKFLOW]".to_string()],
        }
    }

    /// Heuristic or validator docs, then checkpoint docs, then the general guides.
    pub fn documentation(&self, result: &GateResult) -> Vec<DocLink> {
        let mut links = Vec::new();
        let owner = result
            .heuristic_id
            .as_deref()
            .or(result.validator_name.as_deref());
        for key in owner.into_iter().chain(std::iter::once(result.gate.as_str())) {
            let Some(entry) = DOC_ENTRIES.iter().find(|entry| entry.key == key) else {
                continue;
            };
            if let Some((label, path)) = entry.primary {
                links.push(DocLink {
                    description: format!("{} ({label})", entry.description),
                    path: self.doc_path(path),
                });
            }
            if let Some(guide) = entry.guide {
                links.push(DocLink {
                    description: format!("{} (Guide)", entry.description),
                    path: self.doc_path(guide),
                });
            }
        }
        links.push(DocLink {
            description: "Workflow Orchestration Guide".to_string(),
            path: self.doc_path("guides/workflow-orchestration-guide.md"),
        });
        links.push(DocLink {
            description: "Validation Reference".to_string(),
            path: self.doc_path("reference/validation-reference.md"),
        });
        links
    }

    fn doc_path(&self, relative: &str) -> String {
        format!("{}/{relative}", self.docs_base)
    }
}

fn veto_issue(veto: &Veto) -> String {
    match veto {
        Veto::Truthfulness {
            executor,
            value,
            threshold,
            ..
        } => format!("Executor {executor} has truthfulness {value:.2} (minimum {threshold:.2})"),
        Veto::Guardrails { .. } => "No guardrails defined".to_string(),
        Veto::AxiomaMinimum {
            dimension,
            value,
            threshold,
            ..
        } => format!("Dimension {dimension} scored {value:.2} (minimum {threshold:.2})"),
        Veto::MissingFields { task, missing, .. } => {
            format!("Task {task} is missing: {}", missing.join(", "))
        }
    }
}

fn veto_fix(veto: &Veto) -> FixSuggestion {
    match veto {
        Veto::Truthfulness {
            executor,
            value,
            threshold,
            ..
        } => FixSuggestion {
            title: format!("Replace executor \"{executor}\" with higher truthfulness"),
            steps: vec![
                format!("Current: {value:.2}, Required: >={threshold}"),
                "Re-evaluate executor selection or provide additional training".to_string(),
                "Review the executor's past performance and alignment".to_string(),
            ],
        },
        Veto::Guardrails { .. } => FixSuggestion::new(
            "Define safety guardrails before automation",
            &[
                "Add error handling procedures",
                "Create validation checkpoints",
                "Establish rollback mechanisms",
                "Document edge cases and failure modes",
            ],
        ),
        Veto::AxiomaMinimum {
            dimension,
            value,
            threshold,
            ..
        } => FixSuggestion {
            title: format!("Improve dimension \"{dimension}\""),
            steps: vec![
                format!("Current score: {value:.2}/10.0"),
                format!("Required minimum: {threshold}/10.0"),
                axiom_improvement(dimension).to_string(),
            ],
        },
        Veto::MissingFields { task, missing, .. } => FixSuggestion {
            title: format!("Complete Task Anatomy for \"{task}\""),
            steps: vec![
                format!("Missing fields: {}", missing.join(", ")),
                "Every required field must be filled before the task is created".to_string(),
                "Review the Task Anatomy documentation for field definitions".to_string(),
            ],
        },
    }
}

fn criterion_issue(criterion: &CriterionResult) -> String {
    let mut issue = format!(
        "{} (expected {}, actual {})",
        criterion.criterion, criterion.expected, criterion.actual
    );
    if criterion.message != criterion.criterion {
        write!(issue, ": {}", criterion.message).ok();
    }
    issue
}

fn criteria_fixes(result: &GateResult) -> Vec<FixSuggestion> {
    let heuristic = result.heuristic_id.as_deref();
    let validator = result.validator_name.as_deref();
    match (result.gate.as_str(), heuristic, validator) {
        ("strategic-alignment", ..) | (_, Some("PV_BS_001"), _) => vec![
            FixSuggestion::new(
                "Clarify end-state vision and long-term goals",
                &[
                    "Describe what success looks like in 3-5 years",
                    "Document the strategic architecture explicitly",
                    "Align team understanding of the future state",
                ],
            ),
            FixSuggestion::new(
                "Improve strategic priority alignment",
                &[
                    "Reassess market signals against the vision",
                    "Prioritize strategic value over tactical urgency",
                ],
            ),
            FixSuggestion::new(
                "Re-evaluate the recommendation",
                &[
                    "If DEFER, state why the strategic fit is weak",
                    "Document strategic assumptions",
                ],
            ),
        ],
        ("coherence-scan", ..) | (_, Some("PV_PA_001"), _) => vec![
            FixSuggestion::new(
                "Address executor coherence issues",
                &[
                    "Replace executors with truthfulness below 0.7",
                    "Re-assess system alignment and understanding",
                ],
            ),
            FixSuggestion::new(
                "Improve the primary executor's weighted coherence",
                &[
                    "Validate the executor's alignment with goals",
                    "Consider pairing with a mentor",
                ],
            ),
            FixSuggestion::new(
                "Document and address concerns",
                &[
                    "Record specific coherence gaps",
                    "Request a manual override with justification if needed",
                ],
            ),
        ],
        ("automation-readiness", ..) | (_, Some("PV_PM_001"), _) => vec![
            FixSuggestion::new(
                "Increase task frequency to reach the tipping point",
                &[
                    "Wait for sufficient volume before automating",
                    "Consider batching or scheduling changes",
                ],
            ),
            FixSuggestion::new(
                "Add safety guardrails",
                &[
                    "Define error handling procedures",
                    "Establish rollback mechanisms",
                ],
            ),
            FixSuggestion::new(
                "Improve process standardization",
                &[
                    "Reduce variability in execution",
                    "Document standard operating procedures",
                ],
            ),
        ],
        ("axioma-compliance", ..) | (_, _, Some("axiom-validator")) => axiom_fixes(result),
        ("task-anatomy-check", ..) | (_, _, Some("task-anatomy")) => {
            let mut completion = FixSuggestion::new("Complete missing Task Anatomy fields", &[]);
            completion.steps = result
                .missing_fields
                .iter()
                .map(|(task, fields)| format!("{task}: missing {}", fields.join(", ")))
                .collect();
            vec![
                completion,
                FixSuggestion::new(
                    "Review Task Anatomy requirements",
                    &["Each required field serves a role in task execution"],
                ),
            ]
        }
        _ => vec![
            FixSuggestion::new(
                "Review the failed criteria listed above",
                &[
                    "Address each specific failure point",
                    "Update phase outputs to meet requirements",
                ],
            ),
            FixSuggestion::new(
                "Consult the validation documentation",
                &["Review the checkpoint criteria definition"],
            ),
        ],
    }
}

fn axiom_fixes(result: &GateResult) -> Vec<FixSuggestion> {
    let mut overall = FixSuggestion::new("Improve the overall axiom score", &[]);
    if let Some(score) = result.score {
        overall
            .steps
            .push(format!("Current: {score:.2}/10.0, Required: >=7.0/10.0"));
    }
    overall
        .steps
        .push("Focus on dimensions scoring below 7.0".to_string());

    let mut low = result
        .dimensions
        .iter()
        .filter(|dimension| dimension.score < 7.0)
        .collect::<Vec<_>>();
    low.sort_by(|a, b| a.score.total_cmp(&b.score));
    let dimensions = FixSuggestion {
        title: "Address low-scoring dimensions".to_string(),
        steps: low
            .iter()
            .take(3)
            .map(|dimension| {
                format!(
                    "{}: {:.2}/10.0 - {}",
                    dimension.name,
                    dimension.score,
                    axiom_improvement(&dimension.name)
                )
            })
            .collect(),
    };

    let mut floor = FixSuggestion::new("Ensure no dimension falls below the minimum", &[]);
    if let Some(min) = result.min_score {
        floor.steps.push(format!("Lowest score: {min:.2}/10.0"));
    }
    floor
        .steps
        .push("Bring all dimensions to an acceptable baseline".to_string());

    vec![overall, dimensions, floor]
}
