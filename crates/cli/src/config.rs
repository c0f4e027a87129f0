//! `fv.json` loading.
//!
//! An explicit `--config` path must exist and parse. Without one, `fv.json`
//! in the working directory is used when present, and defaults otherwise.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use fv::SdkConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CliError, Result};
use crate::output::{EffectiveConfig, SdkMode};

pub const DEFAULT_CONFIG_FILE: &str = "fv.json";
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
	#[serde(default)]
	pub sdk: SdkConfig,
	#[serde(default)]
	pub defaults: Defaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Defaults {
	#[serde(default = "default_max_retries")]
	pub max_retries: u32,
}

impl Default for Defaults {
	fn default() -> Self {
		Self {
			max_retries: DEFAULT_MAX_RETRIES,
		}
	}
}

fn default_max_retries() -> u32 {
	DEFAULT_MAX_RETRIES
}

/// Configuration together with the file it came from.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
	pub config: CliConfig,
	pub path: Option<PathBuf>,
}

impl LoadedConfig {
	pub fn load(explicit: Option<&Path>) -> Result<Self> {
		let cwd = std::env::current_dir()?;
		Self::load_from(explicit, &cwd)
	}

	pub fn load_from(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
		let path = match explicit {
			Some(path) => path.to_path_buf(),
			None => {
				let candidate = cwd.join(DEFAULT_CONFIG_FILE);
				if !candidate.is_file() {
					debug!(target = "fv.cli", "no {DEFAULT_CONFIG_FILE} found, using defaults");
					return Ok(Self::default());
				}
				candidate
			}
		};

		let content = fs::read_to_string(&path).with_context(|| format!("reading config {}", path.display()))?;
		let config: CliConfig = serde_json::from_str(&content).map_err(|err| CliError::Config(format!("{}: {err}", path.display())))?;
		debug!(target = "fv.cli", path = %path.display(), "loaded config");

		Ok(Self { config, path: Some(path) })
	}

	pub fn effective(&self) -> EffectiveConfig {
		EffectiveConfig {
			config_path: self.path.clone(),
			sdk_mode: if self.config.sdk.is_production() {
				SdkMode::Production
			} else {
				SdkMode::Development
			},
			default_max_retries: self.config.defaults.max_retries,
		}
	}
}
