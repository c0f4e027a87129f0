use std::path::Path;

use tracing::info;

use crate::config::LoadedConfig;
use crate::error::Result;
use crate::output::{CommandInputs, DiagnosticLevel, OutputFormat, ResultBuilder, print_result};
use crate::scenario::{self, Scenario};

pub fn run(path: &Path, loaded: &LoadedConfig, format: OutputFormat) -> Result<()> {
	let scenario = Scenario::from_file(path)?;
	info!(target = "fv.cli", scenario = %path.display(), steps = scenario.steps.len(), "running scenario");

	let report = scenario::run(&scenario, &loaded.config)?;

	let mut builder = ResultBuilder::new("simulate")
		.inputs(CommandInputs {
			scenario: Some(path.to_path_buf()),
			step_count: Some(scenario.steps.len()),
		})
		.config(loaded.effective());

	if report.pending_requests > 0 {
		builder = builder.diagnostic(
			DiagnosticLevel::Warning,
			format!("{} permission request(s) never received a result", report.pending_requests),
		);
	}
	if let Some(active) = &report.active_session {
		builder = builder.diagnostic_with_source(
			DiagnosticLevel::Info,
			format!("session {} left in state {}", active.id, active.state),
			"coordinator",
		);
	}

	print_result(&builder.data(report).build(), format);
	Ok(())
}
