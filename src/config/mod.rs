pub mod env;
pub mod store;
pub mod types;
pub mod validator;

pub use env::{ENV_OVERRIDES, EnvOverride, EnvOverrides, coerce_env_value};
pub use store::{ConfigStore, ConfigSubscriber, ReloadOutcome};
pub use types::{
    ConfigDocument, ConfigSource, Configuration, DEFAULT_CONFIG_PATH, HeuristicParams,
    LoggingConfig, ValidationSettings,
};
pub use validator::{ValidationReport, validate_config, validated_configuration};
