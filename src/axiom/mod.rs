pub mod catalog;
pub mod report;
pub mod validator;

pub use catalog::{AxiomLevel, AxiomSet, BeliefEntry, SOCIAL_VETO_REASON, Severity};
pub use report::generate_report;
pub use validator::{
    AxiomContent, AxiomRecommendation, AxiomValidationOptions, AxiomValidationResult,
    AxiomValidator, HistoryEntry, LevelScore, Strength, Violation,
};
