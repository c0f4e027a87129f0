//! Error types for session orchestration.

use fv_protocol::SdkStatus;

use crate::session::{SessionId, SessionState};

/// Errors raised by the orchestration core.
///
/// Errors from asynchronous resumption points (permission results, SDK
/// completion) never reach the caller of `start_verification`; they are
/// resolved into subscriber callbacks instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// No foreground activity is available to host a permission prompt or the SDK UI.
	#[error("no foreground activity: {0}")]
	NoActivity(String),

	/// The host platform refused an operation in its current state.
	#[error("illegal host state: {0}")]
	IllegalState(String),

	/// A session transition was attempted out of order.
	#[error("session {session}: expected state {expected}, found {actual}")]
	InvalidState {
		session: SessionId,
		expected: SessionState,
		actual: SessionState,
	},

	/// Camera permission was denied.
	#[error("camera permission denied (permanent: {permanent})")]
	PermissionDenied { permanent: bool },

	/// The verification SDK did not reach the initialized state.
	#[error("SDK initialization failed ({status}): {message}")]
	SdkInitialization { status: SdkStatus, message: String },

	/// The verification SDK failed to start a session.
	#[error("SDK session error: {0}")]
	SdkSession(String),

	/// A result channel closed before a value was delivered.
	#[error("result channel closed")]
	ChannelClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
