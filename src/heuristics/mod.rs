pub mod automation_check;
pub mod back_casting;
pub mod coherence_scan;
pub mod compiler;
pub mod error;
pub mod inputs;
pub mod template;
pub mod types;

pub use automation_check::AutomationParams;
pub use back_casting::BackCastingParams;
pub use coherence_scan::CoherenceParams;
pub use compiler::{CompilerStats, HeuristicCompiler, HeuristicSummary, InvalidationReport};
pub use error::{HeuristicError, HeuristicErrorKind};
pub use inputs::{AutomationInput, BackCastingInput, CoherenceInput};
pub use template::{CustomCompile, CustomEvaluator, CustomTemplate, DecisionFunction, HeuristicTemplate};
pub use types::{
    AutomationRecommendation, BackCastingRecommendation, BuiltinHeuristic, CoherenceRecommendation,
    Confidence, DecisionResult, Priority, Recommendation,
};
