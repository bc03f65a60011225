use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxiomLevel {
    Existential,
    Epistemological,
    Social,
    Operational,
}

impl AxiomLevel {
    pub const ALL: [AxiomLevel; 4] = [
        AxiomLevel::Existential,
        AxiomLevel::Epistemological,
        AxiomLevel::Social,
        AxiomLevel::Operational,
    ];

    pub fn code(self) -> i8 {
        match self {
            AxiomLevel::Existential => -4,
            AxiomLevel::Epistemological => -3,
            AxiomLevel::Social => -2,
            AxiomLevel::Operational => 0,
        }
    }

    pub fn from_code(code: i8) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.code() == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            AxiomLevel::Existential => "existential",
            AxiomLevel::Epistemological => "epistemological",
            AxiomLevel::Social => "social",
            AxiomLevel::Operational => "operational",
        }
    }

    pub fn has_veto_authority(self) -> bool {
        self == AxiomLevel::Social
    }
}

impl fmt::Display for AxiomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    Critical,
}

/// One belief: its keywords earn `min(hits * per_hit_weight, cap)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeliefEntry {
    pub key: &'static str,
    pub core_belief: &'static str,
    pub manifestations: &'static [&'static str],
    pub keywords: &'static [&'static str],
    pub per_hit_weight: f64,
    pub cap: f64,
    pub strength: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhraseMatcher {
    AnyOf { phrases: &'static [&'static str] },
    AllOf { phrases: &'static [&'static str] },
    PresentWithout {
        present: &'static str,
        absent: &'static str,
    },
}

impl PhraseMatcher {
    pub fn matches(&self, content: &str) -> bool {
        match self {
            PhraseMatcher::AnyOf { phrases } => phrases.iter().any(|p| content.contains(p)),
            PhraseMatcher::AllOf { phrases } => phrases.iter().all(|p| content.contains(p)),
            PhraseMatcher::PresentWithout { present, absent } => {
                content.contains(present) && !content.contains(absent)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PenaltyRule {
    pub axiom: &'static str,
    pub matcher: PhraseMatcher,
    pub penalty: f64,
    pub reason: &'static str,
    pub severity: Severity,
}

/// Forces the level to zero when a marker appears and the offsetting belief
/// matched nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VetoRule {
    pub offset_belief: &'static str,
    pub markers: &'static [&'static str],
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelAxioms {
    pub level: AxiomLevel,
    pub beliefs: Vec<BeliefEntry>,
    pub penalties: Vec<PenaltyRule>,
    pub veto: Option<VetoRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxiomSet {
    pub levels: Vec<LevelAxioms>,
}

pub const SOCIAL_VETO_REASON: &str = "Detected systemic incoherence - VETO applied per PV_PA_001";

impl AxiomSet {
    pub fn level(&self, level: AxiomLevel) -> Option<&LevelAxioms> {
        self.levels.iter().find(|entry| entry.level == level)
    }

    /// Built-in hierarchy. Keywords are matched against Portuguese source
    /// material, so they stay in Portuguese.
    pub fn core() -> Self {
        Self {
            levels: vec![
                LevelAxioms {
                    level: AxiomLevel::Existential,
                    beliefs: vec![
                        BeliefEntry {
                            key: "purpose_of_existence",
                            core_belief: "Existence is a project of building order against entropic chaos",
                            manifestations: &[
                                "Purpose without system is agony",
                                "Clarity without execution is cowardice",
                                "System without purpose is dead mechanism",
                            ],
                            keywords: &["propósito", "sistema", "construção", "ordem", "caos", "clareza", "execução"],
                            per_hit_weight: 0.5,
                            cap: 2.5,
                            strength: "Demonstrates purpose-driven thinking",
                        },
                        BeliefEntry {
                            key: "on_time",
                            core_belief: "Time is a non-renewable resource for building order",
                            manifestations: &[
                                "Did it twice? Automate it",
                                "Clarity precedes execution",
                                "Decision beats paralysing perfection",
                            ],
                            keywords: &["tempo", "automação", "eficiência", "decisão", "ação"],
                            per_hit_weight: 0.5,
                            cap: 2.5,
                            strength: "Shows awareness of time as scarce resource",
                        },
                    ],
                    penalties: vec![PenaltyRule {
                        axiom: "purpose_of_existence",
                        matcher: PhraseMatcher::AnyOf {
                            phrases: &["sem propósito", "sem sistema"],
                        },
                        penalty: 2.0,
                        reason: "Content suggests purposeless or systemless approach",
                        severity: Severity::Medium,
                    }],
                    veto: None,
                },
                LevelAxioms {
                    level: AxiomLevel::Epistemological,
                    beliefs: vec![
                        BeliefEntry {
                            key: "definition_of_truth",
                            core_belief: "Truth is systemic coherence verified by data",
                            manifestations: &[
                                "Systemic architecture outranks quantitative data",
                                "Social consensus is the weakest evidence",
                            ],
                            keywords: &["verdade", "dados", "coerência", "sistema", "verificação", "evidência"],
                            per_hit_weight: 0.6,
                            cap: 3.0,
                            strength: "Evidence-based and data-driven approach",
                        },
                        BeliefEntry {
                            key: "learning",
                            core_belief: "Learning is pattern plus application plus iterative refinement",
                            manifestations: &[],
                            keywords: &["aprendizado", "padrão", "iteração", "refinamento", "aplicação"],
                            per_hit_weight: 0.4,
                            cap: 2.0,
                            strength: "Demonstrates iterative learning mindset",
                        },
                    ],
                    penalties: vec![PenaltyRule {
                        axiom: "definition_of_truth",
                        matcher: PhraseMatcher::PresentWithout {
                            present: "opinião",
                            absent: "dados",
                        },
                        penalty: 1.5,
                        reason: "Relies on opinion without data verification",
                        severity: Severity::Medium,
                    }],
                    veto: None,
                },
                LevelAxioms {
                    level: AxiomLevel::Social,
                    beliefs: vec![
                        BeliefEntry {
                            key: "on_hierarchy",
                            core_belief: "The only legitimate hierarchy is systemic competence plus execution",
                            manifestations: &[
                                "Authority without competence is tyranny",
                                "Competence without execution is uselessness",
                                "Execution without system is efficient chaos",
                            ],
                            keywords: &["competência", "execução", "hierarquia", "autoridade", "resultado"],
                            per_hit_weight: 0.5,
                            cap: 2.5,
                            strength: "Focus on competence and execution",
                        },
                        BeliefEntry {
                            key: "on_people",
                            core_belief: "Systemic coherence outranks technical skill",
                            manifestations: &["Incoherence with the axioms means immediate elimination"],
                            keywords: &["coerência", "alinhamento", "verdade", "integridade", "sistema"],
                            per_hit_weight: 0.5,
                            cap: 2.5,
                            strength: "Demonstrates systemic coherence",
                        },
                    ],
                    penalties: Vec::new(),
                    veto: Some(VetoRule {
                        offset_belief: "on_people",
                        markers: &["incoerente", "contraditório"],
                        reason: SOCIAL_VETO_REASON,
                    }),
                },
                LevelAxioms {
                    level: AxiomLevel::Operational,
                    beliefs: vec![
                        BeliefEntry {
                            key: "obsessive_automation",
                            core_belief: "Did it twice? Automate it",
                            manifestations: &[],
                            keywords: &["automação", "repetição", "eficiência", "escala"],
                            per_hit_weight: 0.7,
                            cap: 2.0,
                            strength: "Shows automation awareness",
                        },
                        BeliefEntry {
                            key: "radical_clarity",
                            core_belief: "Clarity without execution is cowardice",
                            manifestations: &[
                                "Decision beats paralysing analysis",
                                "Action beats theoretical perfection",
                                "System beats ad-hoc",
                            ],
                            keywords: &["clareza", "execução", "decisão", "ação", "coragem"],
                            per_hit_weight: 0.6,
                            cap: 2.0,
                            strength: "Demonstrates clarity and action orientation",
                        },
                        BeliefEntry {
                            key: "compulsive_systematization",
                            core_belief: "Documented process beats tacit knowledge",
                            manifestations: &[],
                            keywords: &["documentação", "processo", "sistema", "padrão", "replicabilidade"],
                            per_hit_weight: 0.5,
                            cap: 1.0,
                            strength: "Demonstrates systematic thinking",
                        },
                    ],
                    penalties: vec![PenaltyRule {
                        axiom: "obsessive_automation",
                        matcher: PhraseMatcher::AllOf {
                            phrases: &["manual", "repetitivo"],
                        },
                        penalty: 1.0,
                        reason: "Suggests manual repetitive work (should automate)",
                        severity: Severity::Low,
                    }],
                    veto: None,
                },
            ],
        }
    }
}
