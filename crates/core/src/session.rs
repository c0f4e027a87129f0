//! One verification attempt and its lifecycle.
//!
//! ```text
//! Created --begin--> Active --complete--> Completed
//!    |                 |
//!    +----preempt------+-----preempt----> Preempted
//! ```
//!
//! Both terminal states drop the SDK handle. At most one session owns a
//! handle at a time; the coordinator guarantees this by preempting the
//! previous session before a new one can begin.

use std::fmt;
use std::sync::Arc;

use fv_protocol::SessionStatus;
use serde::Serialize;
use tracing::{debug, info};

use crate::attempt::AttemptTracker;
use crate::error::{Error, Result};
use crate::events::EventSink;
use crate::sdk::{ResultSink, SdkHandle, SessionRequest, VerificationSdk};
use crate::subscriber::Subscriber;

/// Reported when the SDK closed its UI without producing any result.
pub const SESSION_START_FAILED_MESSAGE: &str = "Session could not be started due to an unexpected issue during the network request.";

/// Coordinator-assigned session identity. Never reused within a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionId(u64);

impl SessionId {
	pub fn new(value: u64) -> Self {
		Self(value)
	}

	pub fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
	Created,
	Active,
	Completed,
	Preempted,
}

impl SessionState {
	pub fn is_terminal(self) -> bool {
		matches!(self, SessionState::Completed | SessionState::Preempted)
	}
}

impl fmt::Display for SessionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			SessionState::Created => "created",
			SessionState::Active => "active",
			SessionState::Completed => "completed",
			SessionState::Preempted => "preempted",
		})
	}
}

/// Read-only view of a session for hosts and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
	pub id: SessionId,
	pub enrollment_identifier: String,
	pub max_retries: u32,
	pub state: SessionState,
	pub holds_sdk_handle: bool,
}

/// A single verification attempt for one enrollment identifier.
pub struct VerificationSession {
	id: SessionId,
	enrollment_identifier: String,
	max_retries: u32,
	subscriber: Arc<dyn Subscriber>,
	state: SessionState,
	sdk_handle: Option<SdkHandle>,
	attempt: Option<Arc<AttemptTracker>>,
}

impl VerificationSession {
	pub fn new(id: SessionId, enrollment_identifier: impl Into<String>, max_retries: u32, subscriber: Arc<dyn Subscriber>) -> Self {
		Self {
			id,
			enrollment_identifier: enrollment_identifier.into(),
			max_retries,
			subscriber,
			state: SessionState::Created,
			sdk_handle: None,
			attempt: None,
		}
	}

	pub fn id(&self) -> SessionId {
		self.id
	}

	pub fn enrollment_identifier(&self) -> &str {
		&self.enrollment_identifier
	}

	pub fn max_retries(&self) -> u32 {
		self.max_retries
	}

	pub fn state(&self) -> SessionState {
		self.state
	}

	pub fn subscriber(&self) -> &Arc<dyn Subscriber> {
		&self.subscriber
	}

	pub fn holds_sdk_handle(&self) -> bool {
		self.sdk_handle.is_some()
	}

	pub fn snapshot(&self) -> SessionSnapshot {
		SessionSnapshot {
			id: self.id,
			enrollment_identifier: self.enrollment_identifier.clone(),
			max_retries: self.max_retries,
			state: self.state,
			holds_sdk_handle: self.holds_sdk_handle(),
		}
	}

	/// Starts the SDK session and moves `Created -> Active`.
	///
	/// `events` is handed to the session's result sink. Announcing the UI
	/// ([`UxEvent::UiReady`](fv_protocol::UxEvent::UiReady)) is left to the
	/// caller, which can do it after releasing its own locks.
	///
	/// # Errors
	///
	/// - [`Error::InvalidState`] unless the session is `Created`
	/// - any error from [`VerificationSdk::start_session`]; the session stays `Created`
	pub fn begin(&mut self, sdk: &dyn VerificationSdk, events: &Arc<dyn EventSink>) -> Result<()> {
		self.expect_state(SessionState::Created)?;

		let attempt = Arc::new(AttemptTracker::new(self.id, self.max_retries, Arc::clone(events)));
		let sink: Arc<dyn ResultSink> = attempt.clone();
		let request = SessionRequest {
			enrollment_identifier: &self.enrollment_identifier,
			max_retries: self.max_retries,
		};
		let handle = sdk.start_session(request, sink)?;

		info!(
			target = "fv.session",
			session = %self.id,
			sdk_session = handle.id(),
			enrollment_identifier = %self.enrollment_identifier,
			"verification session active"
		);

		self.sdk_handle = Some(handle);
		self.attempt = Some(attempt);
		self.state = SessionState::Active;
		Ok(())
	}

	/// Drops the SDK handle without changing state.
	///
	/// The coordinator calls this while its lock is held so that the next
	/// session can never begin before this handle is gone.
	pub(crate) fn release_sdk_handle(&mut self) {
		self.sdk_handle = None;
	}

	/// Stops tracking this session because a newer one replaced it.
	///
	/// Notifies the subscriber and drops the SDK handle without waiting for the
	/// SDK's own completion. No-op once terminal.
	pub fn preempt(&mut self) {
		if self.state.is_terminal() {
			debug!(target = "fv.session", session = %self.id, state = %self.state, "preempt on finished session ignored");
			return;
		}

		info!(target = "fv.session", session = %self.id, state = %self.state, "session preempted");
		self.sdk_handle = None;
		self.state = SessionState::Preempted;
		self.subscriber.on_session_context_switch();
	}

	/// Finishes an `Active` session after the SDK UI closed.
	///
	/// Drops the SDK handle and reports the attempt outcome to the subscriber
	/// exactly once. No-op once terminal.
	///
	/// # Errors
	///
	/// [`Error::InvalidState`] when the session never began.
	pub fn complete(&mut self) -> Result<()> {
		if self.state.is_terminal() {
			debug!(target = "fv.session", session = %self.id, state = %self.state, "complete on finished session ignored");
			return Ok(());
		}
		self.expect_state(SessionState::Active)?;

		self.sdk_handle = None;
		self.state = SessionState::Completed;

		let report = self.attempt.as_ref().map(|attempt| attempt.report()).unwrap_or_default();
		info!(
			target = "fv.session",
			session = %self.id,
			succeeded = report.succeeded,
			status = ?report.status,
			retries = report.retries,
			"verification session completed"
		);

		if report.succeeded {
			self.subscriber.on_success(report.message);
		} else {
			match report.status {
				Some(status) => self.subscriber.on_failure(status, report.message),
				None => self
					.subscriber
					.on_failure(SessionStatus::UnknownInternalError, Some(SESSION_START_FAILED_MESSAGE.to_string())),
			}
		}
		Ok(())
	}

	fn expect_state(&self, expected: SessionState) -> Result<()> {
		if self.state == expected {
			Ok(())
		} else {
			Err(Error::InvalidState {
				session: self.id,
				expected,
				actual: self.state,
			})
		}
	}
}

impl fmt::Debug for VerificationSession {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("VerificationSession")
			.field("id", &self.id)
			.field("enrollment_identifier", &self.enrollment_identifier)
			.field("max_retries", &self.max_retries)
			.field("state", &self.state)
			.field("holds_sdk_handle", &self.holds_sdk_handle())
			.finish_non_exhaustive()
	}
}
