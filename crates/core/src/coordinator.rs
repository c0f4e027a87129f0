//! Exclusive verification-session orchestration.
//!
//! The coordinator owns at most one active [`VerificationSession`]. Starting
//! a new verification claims the slot immediately, before camera permission
//! is requested, so an overlapping request preempts the earlier one instead
//! of racing it. Every asynchronous resumption point (permission result,
//! completion signal) re-checks that the session it belongs to is still the
//! one in the slot before acting.
//!
//! A session preempted after its UI launched still owes one completion
//! signal. Those sessions are remembered until their signal arrives, so a
//! late signal from an old UI is never mistaken for the current session's.
//!
//! All state lives behind one mutex. Subscriber callbacks, event sinks, host
//! calls and permission callbacks run with the lock released, so any of them
//! may call back into the coordinator. The only call made under the lock is
//! [`VerificationSdk::start_session`].

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use fv_protocol::{SdkStatus, SessionStatus, UxEvent};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::events::EventSink;
use crate::host::Host;
use crate::permission::{PermissionBroker, PermissionOutcome, RequestToken};
use crate::sdk::{SdkConfig, VerificationSdk};
use crate::session::{SessionId, SessionSnapshot, SessionState, VerificationSession};
use crate::subscriber::{PromiseSubscriber, Subscriber, VerificationPromise};

/// Cheaply cloneable handle to the shared coordinator state.
#[derive(Clone)]
pub struct SessionCoordinator {
	inner: Arc<Inner>,
}

struct Inner {
	sdk: Arc<dyn VerificationSdk>,
	events: Arc<dyn EventSink>,
	broker: PermissionBroker,
	state: Mutex<CoordinatorState>,
}

#[derive(Default)]
struct CoordinatorState {
	active: Option<VerificationSession>,
	/// Preempted sessions whose UI was launched and has not signalled completion.
	unclosed_uis: BTreeSet<SessionId>,
	next_session_id: u64,
}

impl CoordinatorState {
	fn allocate_id(&mut self) -> SessionId {
		self.next_session_id += 1;
		SessionId::new(self.next_session_id)
	}

	fn take_if_begun(&mut self) -> Option<VerificationSession> {
		match self.active.as_ref().map(VerificationSession::state) {
			Some(SessionState::Active) => self.active.take(),
			Some(other) => {
				debug!(target = "fv.coordinator", state = %other, "completion signal before active session began; ignoring");
				None
			}
			None => {
				debug!(target = "fv.coordinator", "completion signal with no active session; ignoring");
				None
			}
		}
	}

	fn take_if_active(&mut self, id: SessionId) -> Option<VerificationSession> {
		if self.active.as_ref().is_some_and(|session| session.id() == id) {
			self.active.take()
		} else {
			None
		}
	}
}

impl SessionCoordinator {
	pub fn new(host: Arc<dyn Host>, sdk: Arc<dyn VerificationSdk>, events: Arc<dyn EventSink>) -> Self {
		Self {
			inner: Arc::new(Inner {
				sdk,
				events,
				broker: PermissionBroker::new(host),
				state: Mutex::new(CoordinatorState::default()),
			}),
		}
	}

	/// Initializes the verification SDK unless it already is.
	///
	/// # Errors
	///
	/// [`Error::SdkInitialization`] when the SDK ends in any status other than
	/// [`SdkStatus::Initialized`].
	pub fn initialize_sdk(&self, config: &SdkConfig) -> Result<SdkStatus> {
		let current = self.inner.sdk.status();
		if current.is_initialized() {
			debug!(target = "fv.coordinator", "sdk already initialized");
			return Ok(current);
		}

		let status = self.inner.sdk.initialize(config);
		if status.is_initialized() {
			info!(target = "fv.coordinator", production = config.is_production(), "sdk initialized");
			return Ok(status);
		}

		let message = if status == SdkStatus::NeverInitialized {
			"SDK could not be initialized on this device; emulators are not supported".to_string()
		} else {
			format!("SDK initialization failed with status {status}")
		};
		warn!(target = "fv.coordinator", %status, "sdk initialization failed");
		Err(Error::SdkInitialization { status, message })
	}

	/// Starts a verification, preempting any session already in progress.
	///
	/// Returns as soon as the camera permission prompt is dispatched. Failures
	/// to dispatch are reported through `subscriber.on_camera_access_error()`.
	pub fn start_verification(&self, enrollment_identifier: impl Into<String>, max_retries: u32, subscriber: Arc<dyn Subscriber>) -> SessionId {
		let enrollment_identifier = enrollment_identifier.into();
		let (id, previous) = {
			let mut state = self.inner.state.lock();
			let id = state.allocate_id();
			let session = VerificationSession::new(id, enrollment_identifier.as_str(), max_retries, Arc::clone(&subscriber));
			let mut previous = state.active.replace(session);
			if let Some(previous) = previous.as_mut() {
				if previous.state() == SessionState::Active {
					state.unclosed_uis.insert(previous.id());
				}
				previous.release_sdk_handle();
			}
			(id, previous)
		};

		info!(target = "fv.coordinator", session = %id, %enrollment_identifier, max_retries, "verification requested");

		if let Some(mut previous) = previous {
			debug!(target = "fv.coordinator", session = %previous.id(), by = %id, "preempting previous session");
			previous.preempt();
		}

		let weak: Weak<Inner> = Arc::downgrade(&self.inner);
		let callback_subscriber = Arc::clone(&subscriber);
		let requested = self.inner.broker.request_camera_permission(move |outcome| {
			if let Some(inner) = weak.upgrade() {
				inner.on_permission_result(id, callback_subscriber.as_ref(), outcome);
			}
		});

		match requested {
			Ok(token) => {
				debug!(target = "fv.coordinator", session = %id, %token, "awaiting camera permission");
			}
			Err(err) => {
				warn!(target = "fv.coordinator", session = %id, error = %err, "camera permission request failed");
				let _ = self.inner.state.lock().take_if_active(id);
				subscriber.on_camera_access_error();
			}
		}

		id
	}

	/// [`start_verification`](Self::start_verification) with a promise-style subscriber.
	pub fn verify(&self, enrollment_identifier: impl Into<String>, max_retries: u32) -> (SessionId, VerificationPromise) {
		let (subscriber, promise) = PromiseSubscriber::new();
		let id = self.start_verification(enrollment_identifier, max_retries, subscriber);
		(id, promise)
	}

	/// Entry point for the platform's permission result callback.
	///
	/// Returns `true` while other permission requests are still pending.
	pub fn deliver_permission_result(&self, token: RequestToken, granted: bool, rationale_shown_now: bool) -> bool {
		self.inner.broker.deliver_result(token, granted, rationale_shown_now)
	}

	/// Entry point for the platform's "verification UI finished" signal.
	///
	/// The signal does not say which UI closed. UIs of preempted sessions are
	/// still owed a signal, so the oldest of them absorbs it first; only when
	/// none is outstanding does the signal complete the active session, and
	/// only once that session has begun. Anything else is stale and ignored.
	pub fn on_external_completion_signal(&self) {
		let finished = {
			let mut state = self.inner.state.lock();
			if let Some(stale) = state.unclosed_uis.pop_first() {
				debug!(target = "fv.coordinator", session = %stale, "completion signal from a preempted session's UI; ignoring");
				None
			} else {
				state.take_if_begun()
			}
		};

		self.finish(finished);
	}

	/// Completion signal attributed to the UI of session `id`.
	///
	/// Completes `id` only if it is still the active, begun session. A signal
	/// for a preempted session only clears its outstanding UI.
	pub fn complete_session(&self, id: SessionId) {
		let finished = {
			let mut state = self.inner.state.lock();
			if state.unclosed_uis.remove(&id) {
				debug!(target = "fv.coordinator", session = %id, "completion signal from a preempted session's UI; ignoring");
				None
			} else if state.active.as_ref().is_some_and(|session| session.id() == id) {
				state.take_if_begun()
			} else {
				debug!(target = "fv.coordinator", session = %id, "completion signal for an unknown session; ignoring");
				None
			}
		};

		self.finish(finished);
	}

	fn finish(&self, finished: Option<VerificationSession>) {
		if let Some(mut session) = finished {
			if let Err(err) = session.complete() {
				warn!(target = "fv.coordinator", session = %session.id(), error = %err, "failed to complete session");
			}
		}
	}

	pub fn active_session(&self) -> Option<SessionSnapshot> {
		self.inner.state.lock().active.as_ref().map(VerificationSession::snapshot)
	}

	pub fn pending_permission_requests(&self) -> usize {
		self.inner.broker.pending_count()
	}
}

impl Inner {
	fn on_permission_result(&self, id: SessionId, subscriber: &dyn Subscriber, outcome: PermissionOutcome) {
		match outcome.into_result() {
			Ok(()) => self.begin_if_active(id),
			Err(err) => {
				// Both denial kinds surface the same way; only the log differs.
				warn!(target = "fv.coordinator", session = %id, error = %err, "camera permission denied");
				let _ = self.state.lock().take_if_active(id);
				subscriber.on_camera_access_error();
			}
		}
	}

	fn begin_if_active(&self, id: SessionId) {
		let failed = {
			let mut state = self.state.lock();
			let Some(session) = state.active.as_mut().filter(|session| session.id() == id) else {
				debug!(target = "fv.coordinator", session = %id, "camera granted for a session that is no longer active; ignoring");
				return;
			};

			match session.begin(self.sdk.as_ref(), &self.events) {
				Ok(()) => None,
				Err(err) => Some((state.active.take(), err)),
			}
		};

		let Some((session, err)) = failed else {
			self.events.dispatch(UxEvent::UiReady, None);
			return;
		};
		warn!(target = "fv.coordinator", session = %id, error = %err, "failed to begin verification session");
		if let Some(session) = session {
			session.subscriber().on_failure(SessionStatus::UnknownInternalError, Some(err.to_string()));
		}
	}
}
