use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::{Value, json};
use tempfile::TempDir;

fn fv_binary() -> PathBuf {
	PathBuf::from(env!("CARGO_BIN_EXE_fv"))
}

fn run_fv(workdir: &Path, args: &[&str]) -> (bool, Value, String) {
	let output = Command::new(fv_binary())
		.current_dir(workdir)
		.env_remove("RUST_LOG")
		.args(args)
		.output()
		.expect("failed to execute fv");

	let stdout = String::from_utf8_lossy(&output.stdout).to_string();
	let stderr = String::from_utf8_lossy(&output.stderr).to_string();
	let parsed = serde_json::from_str::<Value>(&stdout).unwrap_or_else(|_| json!({ "raw": stdout }));
	(output.status.success(), parsed, stderr)
}

fn write_scenario(workdir: &Path, steps: Value) -> PathBuf {
	let path = workdir.join("scenario.json");
	std::fs::write(&path, json!({ "steps": steps }).to_string()).expect("scenario should be written");
	path
}

#[test]
fn simulate_retry_then_success_reports_events_in_order() {
	let temp = TempDir::new().expect("tempdir");
	let scenario = write_scenario(
		temp.path(),
		json!([
			{ "op": "initialize" },
			{ "op": "start", "enrollmentIdentifier": "user-42", "maxRetries": 2, "label": "login" },
			{ "op": "permission", "granted": true },
			{ "op": "capture" },
			{ "op": "enrollment", "response": { "success": false, "enrollmentResult": { "isLive": false } } },
			{ "op": "capture" },
			{ "op": "enrollment", "response": { "success": true } },
			{ "op": "complete" }
		]),
	);

	let (success, result, stderr) = run_fv(temp.path(), &["simulate", scenario.to_str().unwrap()]);
	assert!(success, "simulate failed: {stderr}");
	assert_eq!(result["ok"], true);
	assert_eq!(result["command"], "simulate");
	assert_eq!(result["inputs"]["stepCount"], 8);

	let events: Vec<&str> = result["data"]["events"]
		.as_array()
		.unwrap()
		.iter()
		.map(|event| event["event"].as_str().unwrap())
		.collect();
	assert_eq!(events, ["UI_READY", "CAPTURE_DONE", "FV_RETRY", "CAPTURE_DONE"]);

	let transcript = result["data"]["transcript"].as_array().unwrap();
	assert_eq!(transcript.len(), 1);
	assert_eq!(transcript[0]["call"], "success");
	assert_eq!(transcript[0]["label"], "login");
	assert_eq!(transcript[0]["step"], 7);
	assert_eq!(result["data"]["liveSdkHandles"], 0);
	assert!(result["data"]["activeSession"].is_null());
}

#[test]
fn simulate_denial_notifies_camera_access_error() {
	let temp = TempDir::new().expect("tempdir");
	let scenario = write_scenario(
		temp.path(),
		json!([
			{ "op": "start", "enrollmentIdentifier": "user-1" },
			{ "op": "permission", "granted": false, "rationaleShownNow": false },
			{ "op": "complete" }
		]),
	);

	let (success, result, stderr) = run_fv(temp.path(), &["-f", "ndjson", "sim", scenario.to_str().unwrap()]);
	assert!(success, "simulate failed: {stderr}");

	let transcript = result["data"]["transcript"].as_array().unwrap();
	assert_eq!(transcript.len(), 1);
	assert_eq!(transcript[0]["call"], "cameraAccessError");
	assert_eq!(result["data"]["sdkSessionsStarted"], 0);
	assert_eq!(result["data"]["pendingRequests"], 0);
}

#[test]
fn simulate_warns_about_unanswered_permission_requests() {
	let temp = TempDir::new().expect("tempdir");
	let scenario = write_scenario(temp.path(), json!([{ "op": "start", "enrollmentIdentifier": "user-1" }]));

	let (success, result, _) = run_fv(temp.path(), &["simulate", scenario.to_str().unwrap()]);
	assert!(success);

	let levels: Vec<&str> = result["diagnostics"]
		.as_array()
		.unwrap()
		.iter()
		.map(|diag| diag["level"].as_str().unwrap())
		.collect();
	assert_eq!(levels, ["warning", "info"]);
	assert_eq!(result["data"]["activeSession"]["state"], "created");
}

#[test]
fn invalid_step_fails_with_error_envelope() {
	let temp = TempDir::new().expect("tempdir");
	let scenario = write_scenario(temp.path(), json!([{ "op": "enrollment", "response": { "success": true } }]));

	let (success, result, _) = run_fv(temp.path(), &["simulate", scenario.to_str().unwrap()]);
	assert!(!success);
	assert_eq!(result["ok"], false);
	assert_eq!(result["error"]["code"], "INVALID_INPUT");
	assert!(result["error"]["message"].as_str().unwrap().contains("no SDK session has been started"));
}

#[test]
fn config_uses_default_file_and_redacts_secrets() {
	let temp = TempDir::new().expect("tempdir");
	std::fs::write(
		temp.path().join("fv.json"),
		json!({
			"sdk": { "serverUrl": "https://fv.test", "jwtAccessToken": "secret-token", "licenseKey": "key" },
			"defaults": { "maxRetries": 4 }
		})
		.to_string(),
	)
	.unwrap();

	let (success, result, stderr) = run_fv(temp.path(), &["config"]);
	assert!(success, "config failed: {stderr}");
	assert_eq!(result["data"]["sdk"]["serverUrl"], "https://fv.test");
	assert_eq!(result["data"]["sdk"]["jwtAccessToken"], "<redacted>");
	assert_eq!(result["data"]["defaultMaxRetries"], 4);
	assert_eq!(result["config"]["sdkMode"], "development");
	assert!(!result.to_string().contains("secret-token"));
}

#[test]
fn malformed_explicit_config_is_rejected() {
	let temp = TempDir::new().expect("tempdir");
	let config = temp.path().join("broken.json");
	std::fs::write(&config, "{").unwrap();

	let (success, result, _) = run_fv(temp.path(), &["--config", config.to_str().unwrap(), "config"]);
	assert!(!success);
	assert_eq!(result["error"]["code"], "CONFIG_ERROR");
}

#[test]
fn missing_explicit_config_is_an_io_error() {
	let temp = TempDir::new().expect("tempdir");
	let config = temp.path().join("absent.json");

	let (success, result, _) = run_fv(temp.path(), &["--config", config.to_str().unwrap(), "config"]);
	assert!(!success);
	assert_eq!(result["error"]["code"], "IO_ERROR");
}

#[test]
fn missing_scenario_file_is_an_io_error() {
	let temp = TempDir::new().expect("tempdir");
	let scenario = temp.path().join("absent.json");

	let (success, result, _) = run_fv(temp.path(), &["simulate", scenario.to_str().unwrap()]);
	assert!(!success);
	assert_eq!(result["error"]["code"], "IO_ERROR");
}
