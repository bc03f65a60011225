use std::{collections::BTreeMap, fmt, path::PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::heuristics::BuiltinHeuristic;

pub const DEFAULT_CONFIG_PATH: &str = "./config/heuristics.yaml";
pub const SKELETON_CONFIG_VERSION: &str = "1.0";

/// Typed view of a configuration document that already passed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub version: String,
    #[serde(default)]
    pub heuristics: BTreeMap<String, HeuristicParams>,
    #[serde(default)]
    pub validation: ValidationSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Configuration {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    pub fn params_for(&self, heuristic_id: &str) -> HeuristicParams {
        self.heuristics
            .get(heuristic_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Document used as the overlay base when only environment overrides exist.
    pub fn skeleton_value() -> Value {
        let heuristics = BuiltinHeuristic::ALL
            .iter()
            .map(|builtin| {
                (
                    builtin.id().to_string(),
                    json!({ "weights": {}, "thresholds": {} }),
                )
            })
            .collect::<serde_json::Map<String, Value>>();

        json!({
            "version": SKELETON_CONFIG_VERSION,
            "heuristics": heuristics,
            "validation": {},
        })
    }
}

/// Per-heuristic weights and thresholds. Keys missing here fall back to the
/// template defaults; an explicit `0` is honoured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeuristicParams {
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
}

impl HeuristicParams {
    pub fn weight(&self, key: &str, default: f64) -> f64 {
        self.weights.get(key).copied().unwrap_or(default)
    }

    pub fn threshold(&self, key: &str, default: f64) -> f64 {
        self.thresholds.get(key).copied().unwrap_or(default)
    }

    pub fn with_weight(mut self, key: &str, value: f64) -> Self {
        self.weights.insert(key.to_string(), value);
        self
    }

    pub fn with_threshold(mut self, key: &str, value: f64) -> Self {
        self.thresholds.insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSettings {
    #[serde(default)]
    pub strict_mode: Option<bool>,
    #[serde(default)]
    pub minimum_score: Option<f64>,
    #[serde(default)]
    pub enable_veto: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    #[serde(rename = "file")]
    File,
    #[serde(rename = "env+file")]
    EnvAndFile,
    #[serde(rename = "defaults")]
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSource::File => "file",
            ConfigSource::EnvAndFile => "env+file",
            ConfigSource::Defaults => "defaults",
        };
        f.write_str(label)
    }
}

/// A parsed configuration file as it sits in the store cache.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    pub value: Value,
    pub path: PathBuf,
    pub fingerprint: String,
    pub loaded_at: OffsetDateTime,
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/hybrid-ops")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_enabled_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            stderr_warn_enabled: true,
        }
    }
}

impl LoggingConfig {
    /// Reads the `logging` block of a raw document, falling back to defaults
    /// when the block is absent or malformed.
    pub fn from_document(value: Option<&Value>) -> Self {
        value
            .and_then(|document| document.get("logging"))
            .and_then(|logging| serde_json::from_value(logging.clone()).ok())
            .unwrap_or_default()
    }
}
