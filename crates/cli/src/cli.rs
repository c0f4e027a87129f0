use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "fv")]
#[command(about = "Face-verification session simulator")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format
	#[arg(short, long, global = true, value_enum, default_value = "json")]
	pub format: OutputFormat,

	/// Configuration file (defaults to ./fv.json when present)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run a scripted verification scenario against the in-memory host and SDK
	#[command(alias = "sim")]
	Simulate {
		/// Scenario file (JSON)
		scenario: PathBuf,
	},

	/// Show the effective configuration with secrets redacted
	Config,
}

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Simulate { .. } => "simulate",
			Commands::Config => "config",
		}
	}
}
