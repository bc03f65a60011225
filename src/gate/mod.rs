pub mod criteria;
pub mod dispatch;
pub mod feedback;
pub mod types;
pub mod validation_gate;

pub use criteria::{
    Comparator, CriteriaError, CriteriaErrorKind, CriterionExpr, ParsedCriterion, parse_criterion,
};
pub use feedback::{Feedback, FeedbackGenerator, FeedbackSeverity, format_checkpoint_name, summary};
pub use types::{
    CriterionResult, CriterionSpec, DimensionScore, GateRecommendation, GateResult, GateSeverity,
    PhaseSpec, StructuralValidator, ValidationSpec, ValueSource, Veto,
};
pub use validation_gate::{SKIPPED_MESSAGE, ValidationGate};
