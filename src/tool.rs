//! Runner shared by the three standalone heuristic tools.
//!
//! Each tool reads one JSON object (`--input`, `--json` or `--stdin`), checks
//! it against the heuristic's input schema, evaluates the compiled heuristic
//! and prints the decision on stdout. Failures go to stderr as
//! `{error, message, details}` with a fixed exit code.

use std::{
    fs,
    io::{Read, Write},
    path::PathBuf,
    sync::Arc,
};

use jsonschema::JSONSchema;
use serde_json::{Value, json};
use thiserror::Error;

use crate::{
    config::{
        ConfigSource, ConfigStore, Configuration, DEFAULT_CONFIG_PATH, EnvOverrides,
        HeuristicParams, validated_configuration,
    },
    heuristics::{
        AutomationInput, BackCastingInput, BuiltinHeuristic, CoherenceInput, HeuristicCompiler,
        HeuristicErrorKind,
    },
    observability::{NoopObservability, ObservabilitySink, TracingObservability},
};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_INVALID_INPUT: i32 = 1;
pub const EXIT_VALIDATION_ERROR: i32 = 2;
pub const EXIT_MIND_LOADING_FAILURE: i32 = 3;

const BACK_CASTING_SCHEMA: &str = include_str!("../schemas/back_casting.input.json");
const COHERENCE_SCAN_SCHEMA: &str = include_str!("../schemas/coherence_scan.input.json");
const AUTOMATION_CHECK_SCHEMA: &str = include_str!("../schemas/automation_check.input.json");

/// Static description of one tool binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub heuristic: BuiltinHeuristic,
    pub title: &'static str,
    pub binary: &'static str,
    pub input_help: &'static str,
    pub example: &'static str,
}

impl ToolSpec {
    pub fn for_heuristic(heuristic: BuiltinHeuristic) -> Self {
        match heuristic {
            BuiltinHeuristic::BackCasting => Self {
                heuristic,
                title: "Future Backcaster",
                binary: "future-backcaster",
                input_help: "  endStateVision.clarity | endStateClarity    number 0-1, required\n  \
                             marketSignals.alignment | marketAlignment  number 0-1, optional (default 0)",
                example: r#"{"endStateClarity": 0.9, "marketAlignment": 0.4}"#,
            },
            BuiltinHeuristic::CoherenceScan => Self {
                heuristic,
                title: "Coherence Scanner",
                binary: "coherence-scanner",
                input_help: "  truthfulness | truthfulnessCoherence          number 0-1, required\n  \
                             systemAdherence | systemAdherencePotential    number 0-1, required\n  \
                             skill | technicalSkill                        number 0-1, required",
                example: r#"{"truthfulness": 0.9, "systemAdherence": 0.8, "skill": 0.7}"#,
            },
            BuiltinHeuristic::AutomationCheck => Self {
                heuristic,
                title: "Automation Checker",
                binary: "automation-checker",
                input_help: "  executionsPerMonth | frequency    number >= 0, required\n  \
                             standardizable | standardization  number 0-1, required\n  \
                             hasGuardrails | guardrails        boolean, required",
                example: r#"{"frequency": 5, "standardizable": 0.8, "hasGuardrails": true}"#,
            },
        }
    }

    fn schema_source(&self) -> &'static str {
        match self.heuristic {
            BuiltinHeuristic::BackCasting => BACK_CASTING_SCHEMA,
            BuiltinHeuristic::CoherenceScan => COHERENCE_SCAN_SCHEMA,
            BuiltinHeuristic::AutomationCheck => AUTOMATION_CHECK_SCHEMA,
        }
    }

    pub fn help(&self) -> String {
        format!(
            "{title} v{version}\n\
             Standalone tool for {id} ({name})\n\n\
             USAGE:\n  \
             {binary} --input <file.json>\n  \
             {binary} --json '<json-string>'\n  \
             echo '<json>' | {binary} --stdin\n\n\
             OPTIONS:\n  \
             --input <file>    Read input from a JSON file\n  \
             --json <string>   Parse an inline JSON string\n  \
             --stdin           Read input from stdin\n  \
             --help, -h        Show this help message\n  \
             --version, -v     Show version information\n\n\
             INPUT:\n{input_help}\n\n\
             EXIT CODES:\n  \
             0  success\n  \
             1  invalid input (unreadable file, malformed JSON, bad arguments)\n  \
             2  validation error (schema mismatch or value out of range)\n  \
             3  heuristic compiler or loading failure\n\n\
             EXAMPLE:\n  \
             {binary} --json '{example}'",
            title = self.title,
            version = env!("CARGO_PKG_VERSION"),
            id = self.heuristic.id(),
            name = self.heuristic.name(),
            binary = self.binary,
            input_help = self.input_help,
            example = self.example,
        )
    }

    pub fn version(&self) -> String {
        format!(
            "{} v{}\nHeuristic: {} ({})",
            self.title,
            env!("CARGO_PKG_VERSION"),
            self.heuristic.id(),
            self.heuristic.name()
        )
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{message}")]
    InvalidInput { message: String, details: Value },
    #[error("{message}")]
    Validation { message: String, details: Value },
    #[error("{message}")]
    MindLoading { message: String, details: Value },
    #[error("{message}")]
    Execution { message: String, details: Value },
}

impl ToolError {
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::InvalidArguments(_) | ToolError::InvalidInput { .. } => "INVALID_INPUT",
            ToolError::Validation { .. } => "VALIDATION_ERROR",
            ToolError::MindLoading { .. } => "MIND_LOADING_FAILURE",
            ToolError::Execution { .. } => "EXECUTION_ERROR",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ToolError::InvalidArguments(_)
            | ToolError::InvalidInput { .. }
            | ToolError::Execution { .. } => EXIT_INVALID_INPUT,
            ToolError::Validation { .. } => EXIT_VALIDATION_ERROR,
            ToolError::MindLoading { .. } => EXIT_MIND_LOADING_FAILURE,
        }
    }

    pub fn to_json(&self) -> Value {
        let details = match self {
            ToolError::InvalidArguments(_) => json!({}),
            ToolError::InvalidInput { details, .. }
            | ToolError::Validation { details, .. }
            | ToolError::MindLoading { details, .. }
            | ToolError::Execution { details, .. } => details.clone(),
        };
        json!({
            "error": self.code(),
            "message": self.to_string(),
            "details": details,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum InputSource {
    File(PathBuf),
    Inline(String),
    Stdin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Help,
    Version,
    Evaluate(InputSource),
}

/// Where the tool looks for weights and thresholds.
#[derive(Clone)]
pub struct ToolEnvironment {
    pub config_path: PathBuf,
    pub env: EnvOverrides,
    pub observability: Arc<dyn ObservabilitySink>,
}

impl ToolEnvironment {
    pub fn from_process() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            env: EnvOverrides::from_env(),
            observability: Arc::new(TracingObservability::new()),
        }
    }

    /// Defaults only: no config file, no environment overrides.
    pub fn isolated() -> Self {
        Self {
            config_path: PathBuf::new(),
            env: EnvOverrides::from_pairs(Vec::<(String, String)>::new()),
            observability: Arc::new(NoopObservability),
        }
    }
}

/// Runs one tool invocation and returns the process exit code.
pub fn run(
    spec: &ToolSpec,
    environment: &ToolEnvironment,
    args: impl IntoIterator<Item = String>,
    stdin: &mut dyn Read,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> i32 {
    let outcome = parse_args(args).and_then(|command| match command {
        Command::Help => Ok(spec.help()),
        Command::Version => Ok(spec.version()),
        Command::Evaluate(source) => {
            let input = read_input(&source, stdin)?;
            let decision = evaluate(spec, environment, &input)?;
            serde_json::to_string_pretty(&decision).map_err(|err| ToolError::Execution {
                message: format!("failed to serialize decision: {err}"),
                details: json!({ "heuristicId": spec.heuristic.id() }),
            })
        }
    });

    match outcome {
        Ok(rendered) => {
            writeln!(stdout, "{rendered}").and_then(|()| stdout.flush()).ok();
            EXIT_SUCCESS
        }
        Err(err) => {
            tracing::debug!(
                target: "tool",
                heuristic = spec.heuristic.id(),
                code = err.code(),
                error = %err,
                "tool_failed"
            );
            let rendered = serde_json::to_string_pretty(&err.to_json())
                .unwrap_or_else(|_| err.to_string());
            writeln!(stderr, "{rendered}").and_then(|()| stderr.flush()).ok();
            err.exit_code()
        }
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command, ToolError> {
    let mut args = args.into_iter();
    let mut source = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-v" => return Ok(Command::Version),
            "--input" => {
                let path = args.next().ok_or_else(|| {
                    ToolError::InvalidArguments("--input requires a file path argument".into())
                })?;
                source = Some(InputSource::File(PathBuf::from(path)));
            }
            "--json" => {
                let raw = args.next().ok_or_else(|| {
                    ToolError::InvalidArguments("--json requires a JSON string argument".into())
                })?;
                source = Some(InputSource::Inline(raw));
            }
            "--stdin" => source = Some(InputSource::Stdin),
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "Unknown argument: {other}. Run with --help for usage information"
                )));
            }
        }
    }

    source.map(Command::Evaluate).ok_or_else(|| {
        ToolError::InvalidArguments(
            "No input method specified. Use --input, --json, or --stdin".into(),
        )
    })
}

fn read_input(source: &InputSource, stdin: &mut dyn Read) -> Result<Value, ToolError> {
    let (raw, origin) = match source {
        InputSource::File(path) => {
            let raw = fs::read_to_string(path).map_err(|err| ToolError::InvalidInput {
                message: format!("Failed to read {}: {err}", path.display()),
                details: json!({ "path": path.display().to_string() }),
            })?;
            (raw, "file")
        }
        InputSource::Inline(raw) => (raw.clone(), "argument"),
        InputSource::Stdin => {
            let mut raw = String::new();
            stdin
                .read_to_string(&mut raw)
                .map_err(|err| ToolError::InvalidInput {
                    message: format!("Failed to read stdin: {err}"),
                    details: json!({}),
                })?;
            (raw, "stdin")
        }
    };

    serde_json::from_str(&raw).map_err(|err| ToolError::InvalidInput {
        message: format!("Invalid JSON from {origin}: {err}"),
        details: json!({ "line": err.line(), "column": err.column() }),
    })
}

/// Schema check, canonical normalization, then compile and evaluate.
pub fn evaluate(
    spec: &ToolSpec,
    environment: &ToolEnvironment,
    input: &Value,
) -> Result<Value, ToolError> {
    check_schema(spec, input)?;
    normalize(spec.heuristic, input)?;

    let params = resolve_params(spec.heuristic, environment);
    let compiler = HeuristicCompiler::new(Arc::clone(&environment.observability));
    let function = compiler
        .compile(spec.heuristic.id(), &params)
        .map_err(|err| ToolError::MindLoading {
            message: format!("Failed to compile heuristic: {err}"),
            details: json!({ "heuristicId": spec.heuristic.id() }),
        })?;

    let decision = function.evaluate(input).map_err(|err| ToolError::Execution {
        message: format!("Heuristic execution failed: {err}"),
        details: json!({ "heuristicId": spec.heuristic.id() }),
    })?;
    Ok(decision.to_value())
}

fn check_schema(spec: &ToolSpec, input: &Value) -> Result<(), ToolError> {
    let schema_value: Value =
        serde_json::from_str(spec.schema_source()).map_err(|err| ToolError::MindLoading {
            message: format!("Input schema for {} is not valid JSON: {err}", spec.heuristic),
            details: json!({}),
        })?;
    let schema = JSONSchema::compile(&schema_value).map_err(|err| ToolError::MindLoading {
        message: format!("Input schema for {} does not compile: {err}", spec.heuristic),
        details: json!({}),
    })?;

    if let Err(errors) = schema.validate(input) {
        let violations = errors
            .map(|error| {
                json!({
                    "path": error.instance_path.to_string(),
                    "error": error.to_string(),
                })
            })
            .collect::<Vec<_>>();
        return Err(ToolError::Validation {
            message: format!(
                "Input does not match the {} schema ({} violation(s))",
                spec.heuristic.id(),
                violations.len()
            ),
            details: json!({ "violations": violations }),
        });
    }
    Ok(())
}

fn normalize(heuristic: BuiltinHeuristic, input: &Value) -> Result<(), ToolError> {
    let outcome = match heuristic {
        BuiltinHeuristic::BackCasting => BackCastingInput::from_context(input).map(drop),
        BuiltinHeuristic::CoherenceScan => CoherenceInput::from_context(input).map(drop),
        BuiltinHeuristic::AutomationCheck => AutomationInput::from_context(input).map(drop),
    };
    outcome.map_err(|err| match err.kind {
        HeuristicErrorKind::InvalidInput => ToolError::Validation {
            details: json!({ "error": err.message.clone() }),
            message: err.message,
        },
        _ => ToolError::Execution {
            details: json!({ "heuristicId": heuristic.id() }),
            message: err.message,
        },
    })
}

/// Same precedence as the mind loader: environment over file, and defaults
/// when the result does not validate.
fn resolve_params(heuristic: BuiltinHeuristic, environment: &ToolEnvironment) -> HeuristicParams {
    let file_document = (!environment.config_path.as_os_str().is_empty())
        .then(|| ConfigStore::without_file_watching(&environment.config_path))
        .and_then(|store| store.get());

    let (value, source) = match environment.env.apply(
        file_document.as_ref().map(|document| &document.value),
        Configuration::skeleton_value,
    ) {
        Some(value) => (value, ConfigSource::EnvAndFile),
        None => match file_document {
            Some(document) => (document.value.clone(), ConfigSource::File),
            None => return HeuristicParams::default(),
        },
    };

    match validated_configuration(&value) {
        Ok(config) => {
            tracing::debug!(target: "tool", source = %source, "tool_config_applied");
            config.params_for(heuristic.id())
        }
        Err(errors) => {
            tracing::warn!(
                target: "tool",
                source = %source,
                errors = ?errors,
                "tool_config_invalid_using_defaults"
            );
            HeuristicParams::default()
        }
    }
}
