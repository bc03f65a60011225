use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicErrorKind {
    UnknownHeuristicId,
    InvalidTemplate,
    InvalidInput,
    Execution,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicError {
    pub kind: HeuristicErrorKind,
    pub message: String,
}

impl HeuristicError {
    pub fn new(kind: HeuristicErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for HeuristicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for HeuristicError {}

pub fn unknown_heuristic(id: &str) -> HeuristicError {
    HeuristicError::new(
        HeuristicErrorKind::UnknownHeuristicId,
        format!("Unknown heuristic ID: {id}. Register a custom template first."),
    )
}

pub fn invalid_template(message: impl Into<String>) -> HeuristicError {
    HeuristicError::new(HeuristicErrorKind::InvalidTemplate, message)
}

pub fn invalid_input(message: impl Into<String>) -> HeuristicError {
    HeuristicError::new(HeuristicErrorKind::InvalidInput, message)
}

pub fn execution_error(message: impl Into<String>) -> HeuristicError {
    HeuristicError::new(HeuristicErrorKind::Execution, message)
}
