use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};

use crate::heuristics::HeuristicError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MindErrorKind {
    ArtifactNotFound,
    ArtifactRead,
    LoadFailed,
    IllegalState,
    Compilation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MindError {
    pub kind: MindErrorKind,
    pub message: String,
}

impl MindError {
    pub fn new(kind: MindErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for MindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for MindError {}

pub fn mind_not_found(mind_id: &str, primary: &Path, legacy: &Path) -> MindError {
    MindError::new(
        MindErrorKind::ArtifactNotFound,
        format!(
            "Mind '{mind_id}' not found in any location. Searched paths:\n  1. {} (co-located)\n  2. {} (legacy)",
            primary.display(),
            legacy.display()
        ),
    )
}

pub fn artifact_read(path: &Path, err: impl fmt::Display) -> MindError {
    MindError::new(
        MindErrorKind::ArtifactRead,
        format!("failed to read artifact {}: {err}", path.display()),
    )
}

pub fn load_failed(cause: &MindError) -> MindError {
    MindError::new(
        MindErrorKind::LoadFailed,
        format!("Mind loading failed: {}", cause.message),
    )
}

pub fn not_loaded() -> MindError {
    MindError::new(
        MindErrorKind::IllegalState,
        "Mind must be loaded before applying to agent. Call load() first.",
    )
}

pub fn compilation(err: &HeuristicError) -> MindError {
    MindError::new(
        MindErrorKind::Compilation,
        format!("heuristic compilation failed: {err}"),
    )
}
