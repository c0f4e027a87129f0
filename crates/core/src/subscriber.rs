//! Subscriber capability and the promise-style adapter.

use std::fmt;
use std::sync::Arc;

use fv_protocol::SessionStatus;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{Error, Result};

const CONTEXT_SWITCH_MESSAGE: &str = "Verification session was superseded by a newer request.";

/// Receives the outcome of one verification session.
///
/// Callbacks are never invoked while coordinator state is locked, so a
/// subscriber may call back into the coordinator.
pub trait Subscriber: Send + Sync {
	fn on_success(&self, message: Option<String>);

	fn on_failure(&self, kind: SessionStatus, message: Option<String>);

	fn on_camera_access_error(&self);

	/// A newer session replaced this one before it finished.
	fn on_session_context_switch(&self);
}

/// Rejection value of a [`VerificationPromise`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationFailure {
	pub status: SessionStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl fmt::Display for VerificationFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.message {
			Some(message) => write!(f, "{}: {}", self.status, message),
			None => write!(f, "{}", self.status),
		}
	}
}

impl std::error::Error for VerificationFailure {}

/// Success message or failure, as settled by a [`PromiseSubscriber`].
pub type VerificationOutcome = std::result::Result<Option<String>, VerificationFailure>;

/// Subscriber that settles a oneshot promise with the first outcome it sees.
///
/// Later callbacks are ignored; a preempted session that also receives a
/// camera-access error still resolves as a context switch.
pub struct PromiseSubscriber {
	tx: Mutex<Option<oneshot::Sender<VerificationOutcome>>>,
}

impl PromiseSubscriber {
	pub fn new() -> (Arc<Self>, VerificationPromise) {
		let (tx, rx) = oneshot::channel();
		let subscriber = Arc::new(Self { tx: Mutex::new(Some(tx)) });
		(subscriber, VerificationPromise { rx })
	}

	pub fn is_settled(&self) -> bool {
		self.tx.lock().is_none()
	}

	fn settle(&self, outcome: VerificationOutcome) {
		let Some(tx) = self.tx.lock().take() else {
			debug!(target = "fv.session", ?outcome, "promise already settled; dropping outcome");
			return;
		};
		// receiver dropped means the caller stopped waiting
		let _ = tx.send(outcome);
	}

	fn reject(&self, status: SessionStatus, message: Option<String>) {
		self.settle(Err(VerificationFailure { status, message }));
	}
}

impl Subscriber for PromiseSubscriber {
	fn on_success(&self, message: Option<String>) {
		self.settle(Ok(message));
	}

	fn on_failure(&self, kind: SessionStatus, message: Option<String>) {
		self.reject(kind, message);
	}

	fn on_camera_access_error(&self) {
		self.reject(SessionStatus::CameraPermissionDenied, None);
	}

	fn on_session_context_switch(&self) {
		self.reject(SessionStatus::ContextSwitch, Some(CONTEXT_SWITCH_MESSAGE.to_string()));
	}
}

/// Pending outcome of a verification started with
/// [`SessionCoordinator::verify`](crate::coordinator::SessionCoordinator::verify).
#[derive(Debug)]
pub struct VerificationPromise {
	rx: oneshot::Receiver<VerificationOutcome>,
}

impl VerificationPromise {
	/// Waits for the session to settle.
	///
	/// Fails with [`Error::ChannelClosed`] if the subscriber was dropped
	/// without settling.
	pub async fn wait(self) -> Result<VerificationOutcome> {
		self.rx.await.map_err(|_| Error::ChannelClosed)
	}

	/// Returns the outcome if it has already been settled.
	pub fn try_outcome(&mut self) -> Option<VerificationOutcome> {
		self.rx.try_recv().ok()
	}
}
