//! Per-session scan attempt tracking and the liveness retry policy.

use std::sync::Arc;

use fv_protocol::{EnrollmentResponse, RetryDetails, SessionStatus, UxEvent};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::events::EventSink;
use crate::sdk::{ResultSink, ScanVerdict};
use crate::session::SessionId;

pub const SUCCESS_MESSAGE: &str = "Face verified successfully";
pub const UNEXPECTED_RESPONSE_MESSAGE: &str = "Unexpected response from the verification server.";

/// Final state of a session's scan attempts, read when the SDK UI closes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptReport {
	pub succeeded: bool,
	pub status: Option<SessionStatus>,
	pub message: Option<String>,
	pub retries: u32,
}

/// The coordinator's [`ResultSink`] for one session.
///
/// A scan that failed *only* the liveness check is retried while fewer than
/// `max_retries` retries have been used; duplicates and 3D mismatches are
/// never retried.
pub struct AttemptTracker {
	session: SessionId,
	max_retries: u32,
	events: Arc<dyn EventSink>,
	report: Mutex<AttemptReport>,
}

impl AttemptTracker {
	pub fn new(session: SessionId, max_retries: u32, events: Arc<dyn EventSink>) -> Self {
		Self {
			session,
			max_retries,
			events,
			report: Mutex::new(AttemptReport::default()),
		}
	}

	pub fn report(&self) -> AttemptReport {
		self.report.lock().clone()
	}
}

impl ResultSink for AttemptTracker {
	fn on_capture_done(&self) {
		debug!(target = "fv.session", session = %self.session, "capture done");
		self.events.dispatch(UxEvent::CaptureDone, None);
	}

	fn on_scan_cancelled(&self, status: SessionStatus) {
		debug!(target = "fv.session", session = %self.session, %status, "scan cancelled by sdk");
		let mut report = self.report.lock();
		report.succeeded = false;
		report.status = Some(status);
	}

	fn on_enrollment_response(&self, response: &EnrollmentResponse) -> ScanVerdict {
		let mut report = self.report.lock();

		if response.is_success() {
			info!(target = "fv.session", session = %self.session, "enrollment succeeded");
			report.succeeded = true;
			report.status = Some(SessionStatus::SessionCompletedSuccessfully);
			report.message = Some(SUCCESS_MESSAGE.to_string());
			return ScanVerdict::Succeed;
		}

		let message = response.error.clone().unwrap_or_else(|| UNEXPECTED_RESPONSE_MESSAGE.to_string());
		report.message = Some(message.clone());

		let issues = response.issues();
		if issues.is_liveness_only() && report.retries < self.max_retries {
			report.retries += 1;
			let retries = report.retries;
			drop(report);

			info!(target = "fv.session", session = %self.session, retries, max_retries = self.max_retries, "liveness failed; retrying capture");
			let details = RetryDetails {
				reason: message.clone(),
				match3d: !issues.not_match,
				liveness: !issues.not_live,
				duplicate: issues.duplicate,
				enrolled: issues.enrolled,
			};
			self.events.dispatch(UxEvent::FvRetry, serde_json::to_value(details).ok());
			return ScanVerdict::Retry { message };
		}

		info!(target = "fv.session", session = %self.session, reason = %message, "enrollment failed");
		report.succeeded = false;
		report.status = Some(SessionStatus::EnrollmentFailed);
		ScanVerdict::Cancel { message }
	}
}
