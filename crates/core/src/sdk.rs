//! Seam to the external verification SDK.
//!
//! The capture and liveness engine is opaque. The coordinator only
//! initializes it, starts sessions, and holds the returned handle; the SDK
//! reports scan progress through the [`ResultSink`] it is given and signals
//! the end of its UI flow out of band (see
//! [`SessionCoordinator::on_external_completion_signal`](crate::coordinator::SessionCoordinator::on_external_completion_signal)).

use std::sync::Arc;

use fv_protocol::{EnrollmentResponse, SdkStatus, SessionStatus};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Credentials and endpoints the SDK is initialized with.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkConfig {
	#[serde(default)]
	pub server_url: String,
	#[serde(default)]
	pub jwt_access_token: String,
	#[serde(default)]
	pub license_key: String,
	#[serde(default)]
	pub encryption_key: String,
	/// Production license; development mode is used when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub license_text: Option<String>,
}

impl SdkConfig {
	pub fn is_production(&self) -> bool {
		self.license_text.is_some()
	}

	/// Copy with every secret replaced by a placeholder.
	pub fn redacted(&self) -> Self {
		Self {
			server_url: self.server_url.clone(),
			jwt_access_token: redact(&self.jwt_access_token),
			license_key: redact(&self.license_key),
			encryption_key: redact(&self.encryption_key),
			license_text: self.license_text.as_deref().map(redact),
		}
	}
}

impl std::fmt::Debug for SdkConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let redacted = self.redacted();
		f.debug_struct("SdkConfig")
			.field("server_url", &redacted.server_url)
			.field("jwt_access_token", &redacted.jwt_access_token)
			.field("license_key", &redacted.license_key)
			.field("encryption_key", &redacted.encryption_key)
			.field("license_text", &redacted.license_text)
			.finish()
	}
}

fn redact(secret: &str) -> String {
	if secret.is_empty() {
		String::new()
	} else {
		"<redacted>".to_string()
	}
}

/// Parameters for one SDK session.
#[derive(Debug, Clone, Copy)]
pub struct SessionRequest<'a> {
	pub enrollment_identifier: &'a str,
	pub max_retries: u32,
}

/// Handle to an in-progress SDK session.
///
/// Ownership is exclusive to one verification session; dropping the handle
/// releases the SDK session.
pub trait SdkSession: Send {
	/// SDK-assigned identifier, used in logs.
	fn id(&self) -> &str;
}

pub type SdkHandle = Box<dyn SdkSession>;

/// What the SDK should do with the scan it just uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanVerdict {
	/// Show the success screen.
	Succeed,
	/// Show `message` and let the user capture again.
	Retry { message: String },
	/// Close the capture UI.
	Cancel { message: String },
}

/// Receives scan progress from the SDK for one session.
pub trait ResultSink: Send + Sync {
	/// Capture finished and the scan is about to be verified.
	fn on_capture_done(&self);

	/// The SDK ended the scan without a result (user cancel, timeout, ...).
	fn on_scan_cancelled(&self, status: SessionStatus);

	/// The identity service answered for the uploaded scan.
	fn on_enrollment_response(&self, response: &EnrollmentResponse) -> ScanVerdict;
}

/// Operations the coordinator needs from the verification SDK.
///
/// # Contract
///
/// `start_session` runs while the coordinator holds its state lock. It must
/// return without waiting for the UI flow, and it must not call back into the
/// coordinator or report to `sink` before returning. Scan progress and the
/// completion signal come later, from the UI flow.
pub trait VerificationSdk: Send + Sync {
	fn status(&self) -> SdkStatus;

	fn initialize(&self, config: &SdkConfig) -> SdkStatus;

	fn start_session(&self, request: SessionRequest<'_>, sink: Arc<dyn ResultSink>) -> Result<SdkHandle>;
}
