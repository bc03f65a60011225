use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvOverride {
    pub variable: &'static str,
    pub path: &'static [&'static str],
}

pub const ENV_OVERRIDES: &[EnvOverride] = &[
    EnvOverride {
        variable: "HEURISTIC_BS001_END_STATE_WEIGHT",
        path: &["heuristics", "PV_BS_001", "weights", "end_state_vision"],
    },
    EnvOverride {
        variable: "HEURISTIC_BS001_MARKET_WEIGHT",
        path: &["heuristics", "PV_BS_001", "weights", "current_market_signals"],
    },
    EnvOverride {
        variable: "HEURISTIC_BS001_CONFIDENCE_THRESHOLD",
        path: &["heuristics", "PV_BS_001", "thresholds", "confidence"],
    },
    EnvOverride {
        variable: "HEURISTIC_BS001_PRIORITY_THRESHOLD",
        path: &["heuristics", "PV_BS_001", "thresholds", "priority"],
    },
    EnvOverride {
        variable: "HEURISTIC_PA001_TRUTHFULNESS_WEIGHT",
        path: &["heuristics", "PV_PA_001", "weights", "truthfulness"],
    },
    EnvOverride {
        variable: "HEURISTIC_PA001_SYSTEM_WEIGHT",
        path: &["heuristics", "PV_PA_001", "weights", "system_adherence"],
    },
    EnvOverride {
        variable: "HEURISTIC_PA001_SKILL_WEIGHT",
        path: &["heuristics", "PV_PA_001", "weights", "skill"],
    },
    EnvOverride {
        variable: "HEURISTIC_PA001_VETO_THRESHOLD",
        path: &["heuristics", "PV_PA_001", "thresholds", "veto"],
    },
    EnvOverride {
        variable: "HEURISTIC_PA001_APPROVE_THRESHOLD",
        path: &["heuristics", "PV_PA_001", "thresholds", "approve"],
    },
    EnvOverride {
        variable: "HEURISTIC_PA001_REVIEW_THRESHOLD",
        path: &["heuristics", "PV_PA_001", "thresholds", "review"],
    },
    EnvOverride {
        variable: "HEURISTIC_PM001_FREQUENCY_WEIGHT",
        path: &["heuristics", "PV_PM_001", "weights", "frequency"],
    },
    EnvOverride {
        variable: "HEURISTIC_PM001_STANDARDIZATION_WEIGHT",
        path: &["heuristics", "PV_PM_001", "weights", "standardization"],
    },
    EnvOverride {
        variable: "HEURISTIC_PM001_GUARDRAILS_WEIGHT",
        path: &["heuristics", "PV_PM_001", "weights", "guardrails"],
    },
    EnvOverride {
        variable: "HEURISTIC_PM001_TIPPING_POINT",
        path: &["heuristics", "PV_PM_001", "thresholds", "tipping_point"],
    },
    EnvOverride {
        variable: "HEURISTIC_PM001_STANDARDIZATION_THRESHOLD",
        path: &["heuristics", "PV_PM_001", "thresholds", "standardization"],
    },
    EnvOverride {
        variable: "HEURISTIC_PM001_AUTOMATE_THRESHOLD",
        path: &["heuristics", "PV_PM_001", "thresholds", "automate"],
    },
    EnvOverride {
        variable: "VALIDATION_STRICT_MODE",
        path: &["validation", "strict_mode"],
    },
    EnvOverride {
        variable: "VALIDATION_MINIMUM_SCORE",
        path: &["validation", "minimum_score"],
    },
];

/// Snapshot of the mapped override variables that were present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    values: BTreeMap<&'static str, String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|variable| std::env::var(variable).ok())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let provided = pairs
            .into_iter()
            .map(|(key, value)| (key.as_ref().to_string(), value.into()))
            .collect::<BTreeMap<String, String>>();
        Self::from_lookup(|variable| provided.get(variable).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let values = ENV_OVERRIDES
            .iter()
            .filter_map(|entry| lookup(entry.variable).map(|raw| (entry.variable, raw)))
            .collect();
        Self { values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn variables(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }

    /// Overlays the present variables onto `base` (or the skeleton when there is
    /// no base). Returns `None` when no mapped variable is set.
    pub fn apply(&self, base: Option<&Value>, skeleton: impl FnOnce() -> Value) -> Option<Value> {
        if self.is_empty() {
            return None;
        }

        let mut document = base.cloned().unwrap_or_else(skeleton);
        for entry in ENV_OVERRIDES {
            if let Some(raw) = self.values.get(entry.variable) {
                set_path(&mut document, entry.path, coerce_env_value(raw));
            }
        }
        Some(document)
    }
}

/// `"true"`/`"false"` become booleans, numeric text becomes a float, anything
/// else stays a string.
pub fn coerce_env_value(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    let trimmed = raw.trim();
    if !trimmed.is_empty()
        && let Ok(number) = trimmed.parse::<f64>()
        && let Some(number) = Number::from_f64(number)
    {
        return Value::Number(number);
    }

    Value::String(raw.to_string())
}

fn set_path(document: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut cursor = document;
    for segment in parents {
        if !cursor.is_object() {
            *cursor = Value::Object(Map::new());
        }
        let Value::Object(map) = cursor else {
            return;
        };
        cursor = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !cursor.is_object() {
        *cursor = Value::Object(Map::new());
    }
    if let Value::Object(map) = cursor {
        map.insert(last.to_string(), value);
    }
}
