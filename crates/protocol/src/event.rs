//! UX events forwarded to the embedding application.

use serde::{Deserialize, Serialize};

/// Progress notifications emitted while a verification session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UxEvent {
	/// The capture UI is on screen.
	UiReady,
	/// Face capture finished; the scan is being verified.
	CaptureDone,
	/// The scan failed a liveness check and the user is asked to retry.
	FvRetry,
}

impl UxEvent {
	pub fn as_str(self) -> &'static str {
		match self {
			UxEvent::UiReady => "UI_READY",
			UxEvent::CaptureDone => "CAPTURE_DONE",
			UxEvent::FvRetry => "FV_RETRY",
		}
	}
}

impl std::fmt::Display for UxEvent {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Payload attached to [`UxEvent::FvRetry`].
///
/// Each flag reports whether that check *passed*, except `duplicate` and
/// `enrolled` which report the condition itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryDetails {
	pub reason: String,
	pub match3d: bool,
	pub liveness: bool,
	pub duplicate: bool,
	pub enrolled: bool,
}
