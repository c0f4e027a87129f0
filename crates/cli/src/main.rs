use clap::Parser;
use fv_cli::cli::Cli;
use fv_cli::output::{ResultBuilder, print_result};
use fv_cli::{commands, logging};
use tracing::error;

fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	let command = cli.command.name();
	if let Err(err) = commands::dispatch(cli) {
		error!(target = "fv.cli", error = %err, "command failed");
		let result = ResultBuilder::<()>::new(command).error(err.code(), err.to_string()).build();
		print_result(&result, format);
		std::process::exit(1);
	}
}
