use std::{env, path::PathBuf};

use anyhow::{Result, anyhow};

use crate::{config::DEFAULT_CONFIG_PATH, mind::DEFAULT_MIND_ID};

const USAGE: &str = "usage: hybrid-ops [--config <path>] [--mind-root <dir>] [--mind-id <id>]";

/// Arguments of the long-running host process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostArgs {
    pub config_path: PathBuf,
    pub mind_root: PathBuf,
    pub mind_id: String,
}

pub fn host_args_from_env() -> Result<HostArgs> {
    parse_host_args(env::args().skip(1))
}

pub fn parse_host_args(args: impl IntoIterator<Item = String>) -> Result<HostArgs> {
    let mut args = args.into_iter();
    let mut config_path = None;
    let mut mind_root = None;
    let mut mind_id = None;

    while let Some(arg) = args.next() {
        let slot = match arg.as_str() {
            "--config" => &mut config_path,
            "--mind-root" => &mut mind_root,
            "--mind-id" => &mut mind_id,
            other => return Err(anyhow!("unknown argument: {other}. {USAGE}")),
        };
        let value = args
            .next()
            .ok_or_else(|| anyhow!("missing value for {arg}"))?;
        *slot = Some(value);
    }

    let mind_root = match mind_root {
        Some(root) => PathBuf::from(root),
        None => env::current_dir()?,
    };

    Ok(HostArgs {
        config_path: PathBuf::from(config_path.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())),
        mind_root,
        mind_id: mind_id.unwrap_or_else(|| DEFAULT_MIND_ID.to_string()),
    })
}
