mod config;
mod simulate;

use crate::cli::{Cli, Commands};
use crate::config::LoadedConfig;
use crate::error::Result;

pub fn dispatch(cli: Cli) -> Result<()> {
	let loaded = LoadedConfig::load(cli.config.as_deref())?;

	match cli.command {
		Commands::Simulate { scenario } => simulate::run(&scenario, &loaded, cli.format)?,
		Commands::Config => config::run(&loaded, cli.format),
	}

	Ok(())
}
