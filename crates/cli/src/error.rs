use thiserror::Error;

use crate::output::ErrorCode;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("config error: {0}")]
	Config(String),

	#[error("scenario error: {0}")]
	Scenario(String),

	#[error(transparent)]
	Core(#[from] fv::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl CliError {
	pub fn code(&self) -> ErrorCode {
		match self {
			CliError::Io(_) => ErrorCode::IoError,
			CliError::Json(_) | CliError::Scenario(_) => ErrorCode::InvalidInput,
			CliError::Config(_) => ErrorCode::ConfigError,
			CliError::Core(_) => ErrorCode::SessionError,
			CliError::Anyhow(err) if err.root_cause().is::<std::io::Error>() => ErrorCode::IoError,
			CliError::Anyhow(_) => ErrorCode::InternalError,
		}
	}
}

pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
	use anyhow::Context;

	use super::*;

	#[test]
	fn io_failures_keep_their_code_behind_context() {
		let err: CliError = std::fs::read_to_string("/nonexistent/fv.json")
			.context("reading config /nonexistent/fv.json")
			.unwrap_err()
			.into();
		assert_eq!(err.code(), ErrorCode::IoError);
		assert!(err.to_string().contains("reading config"));
	}

	#[test]
	fn other_wrapped_failures_are_internal() {
		let err = CliError::Anyhow(anyhow::anyhow!("unexpected"));
		assert_eq!(err.code(), ErrorCode::InternalError);
	}
}
