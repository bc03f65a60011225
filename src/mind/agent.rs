use std::{fmt, sync::Arc};

use serde::Serialize;

use crate::{
    heuristics::DecisionFunction,
    mind::artifacts::MindArtifacts,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExecutorType {
    Human,
    Agent,
    Clone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExecutionType {
    #[serde(rename = "100% Human")]
    FullyHuman,
    #[serde(rename = "Hybrid")]
    Hybrid,
    #[serde(rename = "100% Agent")]
    FullyAgent,
}

impl ExecutionType {
    pub fn label(self) -> &'static str {
        match self {
            ExecutionType::FullyHuman => "100% Human",
            ExecutionType::Hybrid => "Hybrid",
            ExecutionType::FullyAgent => "100% Agent",
        }
    }
}

const TASK_ANATOMY_FIELDS: [&str; 9] = [
    "task_name",
    "status",
    "responsible_executor",
    "execution_type",
    "estimated_time",
    "input",
    "output",
    "action_items",
    "acceptance_criteria",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskManagementRules {
    pub anti_patterns: Vec<&'static str>,
    pub task_anatomy: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskAnatomyRules {
    pub required_fields: Vec<&'static str>,
    pub executor_types: Vec<ExecutorType>,
    pub execution_types: Vec<ExecutionType>,
    pub rules: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationRules {
    pub task_management: TaskManagementRules,
    pub task_anatomy: TaskAnatomyRules,
}

impl ValidationRules {
    pub fn extract() -> Self {
        Self {
            task_management: TaskManagementRules {
                anti_patterns: vec![
                    "multiple_assignees_single_task",
                    "missing_time_estimate",
                    "vague_acceptance_criteria",
                    "lack_of_documentation",
                ],
                task_anatomy: TASK_ANATOMY_FIELDS.to_vec(),
            },
            task_anatomy: TaskAnatomyRules {
                required_fields: TASK_ANATOMY_FIELDS.to_vec(),
                executor_types: vec![ExecutorType::Human, ExecutorType::Agent, ExecutorType::Clone],
                execution_types: vec![
                    ExecutionType::FullyHuman,
                    ExecutionType::Hybrid,
                    ExecutionType::FullyAgent,
                ],
                rules: vec![
                    "one_task_one_executor",
                    "must_have_time_estimate",
                    "clear_input_output",
                    "actionable_items",
                    "measurable_criteria",
                ],
            },
        }
    }
}

#[derive(Clone)]
pub struct DecisionFunctions {
    pub back_casting: Arc<DecisionFunction>,
    pub coherence_scan: Arc<DecisionFunction>,
    pub automation_check: Arc<DecisionFunction>,
}

impl fmt::Debug for DecisionFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionFunctions")
            .field("back_casting", &self.back_casting.id)
            .field("coherence_scan", &self.coherence_scan.id)
            .field("automation_check", &self.automation_check.id)
            .finish()
    }
}

/// Read-only capabilities handed to an agent. Shared, never mutated.
#[derive(Debug, Clone)]
pub struct AgentCapabilities {
    pub cognitive_layer: Arc<MindArtifacts>,
    pub decision_functions: DecisionFunctions,
    pub validation_rules: Arc<ValidationRules>,
}

#[derive(Debug, Clone, Default)]
pub struct Agent {
    pub id: String,
    pub capabilities: Option<AgentCapabilities>,
}

impl Agent {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            capabilities: None,
        }
    }

    pub fn is_enhanced(&self) -> bool {
        self.capabilities.is_some()
    }
}
