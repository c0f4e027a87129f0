use fv::SdkConfig;
use serde::Serialize;

use crate::config::LoadedConfig;
use crate::output::{OutputFormat, ResultBuilder, print_result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigView {
	sdk: SdkConfig,
	production: bool,
	default_max_retries: u32,
}

pub fn run(loaded: &LoadedConfig, format: OutputFormat) {
	let view = ConfigView {
		sdk: loaded.config.sdk.redacted(),
		production: loaded.config.sdk.is_production(),
		default_max_retries: loaded.config.defaults.max_retries,
	};

	let result = ResultBuilder::new("config").data(view).config(loaded.effective()).build();
	print_result(&result, format);
}
