use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use serde_json::Value;
use time::OffsetDateTime;

use crate::{
    config::HeuristicParams,
    heuristics::{
        automation_check::AutomationParams,
        back_casting::BackCastingParams,
        coherence_scan::CoherenceParams,
        error::{HeuristicError, execution_error, invalid_template},
        inputs::{AutomationInput, BackCastingInput, CoherenceInput},
        types::{BuiltinHeuristic, DecisionResult},
    },
};

pub type CustomEvaluator =
    Arc<dyn Fn(&Value) -> Result<DecisionResult, HeuristicError> + Send + Sync>;
pub type CustomCompile =
    Arc<dyn Fn(&HeuristicParams) -> Result<CustomEvaluator, HeuristicError> + Send + Sync>;

/// Runtime-registered template. Only the shape is checked on registration;
/// the compile closure runs when the id is first compiled.
#[derive(Clone)]
pub struct CustomTemplate {
    pub name: String,
    pub domain: String,
    pub compile: Option<CustomCompile>,
}

impl CustomTemplate {
    pub fn new(
        name: impl Into<String>,
        domain: impl Into<String>,
        compile: impl Fn(&HeuristicParams) -> Result<CustomEvaluator, HeuristicError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            compile: Some(Arc::new(compile)),
        }
    }

    pub fn validate_shape(&self) -> Result<(), HeuristicError> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.domain.trim().is_empty() {
            missing.push("domain");
        }
        if self.compile.is_none() {
            missing.push("compile");
        }
        if missing.is_empty() {
            return Ok(());
        }
        Err(invalid_template(format!(
            "Template must have name, domain, and compile function (missing: {})",
            missing.join(", ")
        )))
    }
}

impl fmt::Debug for CustomTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomTemplate")
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("compile", &self.compile.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum HeuristicTemplate {
    BackCasting,
    CoherenceScan,
    AutomationCheck,
    Custom(CustomTemplate),
}

impl HeuristicTemplate {
    pub fn builtin(builtin: BuiltinHeuristic) -> Self {
        match builtin {
            BuiltinHeuristic::BackCasting => HeuristicTemplate::BackCasting,
            BuiltinHeuristic::CoherenceScan => HeuristicTemplate::CoherenceScan,
            BuiltinHeuristic::AutomationCheck => HeuristicTemplate::AutomationCheck,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            HeuristicTemplate::BackCasting => BuiltinHeuristic::BackCasting.name(),
            HeuristicTemplate::CoherenceScan => BuiltinHeuristic::CoherenceScan.name(),
            HeuristicTemplate::AutomationCheck => BuiltinHeuristic::AutomationCheck.name(),
            HeuristicTemplate::Custom(custom) => &custom.name,
        }
    }

    pub fn domain(&self) -> &str {
        match self {
            HeuristicTemplate::BackCasting => BuiltinHeuristic::BackCasting.domain(),
            HeuristicTemplate::CoherenceScan => BuiltinHeuristic::CoherenceScan.domain(),
            HeuristicTemplate::AutomationCheck => BuiltinHeuristic::AutomationCheck.domain(),
            HeuristicTemplate::Custom(custom) => &custom.domain,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, HeuristicTemplate::Custom(_))
    }

    pub fn compile(&self, id: &str, params: &HeuristicParams) -> Result<DecisionFunction, HeuristicError> {
        let evaluator = match self {
            HeuristicTemplate::BackCasting => {
                Evaluator::BackCasting(BackCastingParams::from_params(params))
            }
            HeuristicTemplate::CoherenceScan => {
                Evaluator::CoherenceScan(CoherenceParams::from_params(params))
            }
            HeuristicTemplate::AutomationCheck => {
                Evaluator::AutomationCheck(AutomationParams::from_params(params))
            }
            HeuristicTemplate::Custom(custom) => {
                let compile = custom.compile.as_ref().ok_or_else(|| {
                    invalid_template(format!("custom template {id} has no compile function"))
                })?;
                Evaluator::Custom(compile(params)?)
            }
        };

        Ok(DecisionFunction {
            id: id.to_string(),
            name: self.name().to_string(),
            domain: self.domain().to_string(),
            config: params.clone(),
            compiled_at: OffsetDateTime::now_utc(),
            evaluator,
        })
    }
}

#[derive(Clone)]
enum Evaluator {
    BackCasting(BackCastingParams),
    CoherenceScan(CoherenceParams),
    AutomationCheck(AutomationParams),
    Custom(CustomEvaluator),
}

/// A compiled, pure `context -> result` function plus the metadata it was
/// compiled with.
#[derive(Clone)]
pub struct DecisionFunction {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub config: HeuristicParams,
    pub compiled_at: OffsetDateTime,
    evaluator: Evaluator,
}

impl DecisionFunction {
    pub fn evaluate(&self, context: &Value) -> Result<DecisionResult, HeuristicError> {
        match &self.evaluator {
            Evaluator::BackCasting(params) => {
                Ok(params.evaluate(&BackCastingInput::from_context(context)?))
            }
            Evaluator::CoherenceScan(params) => {
                Ok(params.evaluate(&CoherenceInput::from_context(context)?))
            }
            Evaluator::AutomationCheck(params) => {
                Ok(params.evaluate(&AutomationInput::from_context(context)?))
            }
            Evaluator::Custom(evaluator) => catch_unwind(AssertUnwindSafe(|| evaluator(context)))
                .unwrap_or_else(|_| {
                    Err(execution_error(format!(
                        "decision function {} panicked",
                        self.id
                    )))
                }),
        }
    }

    /// Threshold as this function was compiled, falling back to `default`.
    pub fn threshold(&self, key: &str, default: f64) -> f64 {
        self.config.threshold(key, default)
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self.evaluator, Evaluator::Custom(_))
    }
}

impl fmt::Debug for DecisionFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionFunction")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("config", &self.config)
            .field("compiled_at", &self.compiled_at)
            .finish_non_exhaustive()
    }
}
