//! In-memory host, SDK, subscriber and event sink for exercising the
//! coordinator without a device.
//!
//! # Example
//!
//! ```ignore
//! let host = Arc::new(FakeHost::new());
//! let sdk = Arc::new(FakeSdk::new());
//! let coordinator = SessionCoordinator::new(host.clone(), sdk.clone(), Arc::new(RecordingEventSink::new()));
//!
//! let (_, promise) = coordinator.verify("user-1", 3);
//! coordinator.deliver_permission_result(host.dispatched()[0], true, false);
//! sdk.last_sink().unwrap().on_enrollment_response(&EnrollmentResponse::succeeded());
//! coordinator.on_external_completion_signal();
//! let outcome = promise.wait().await?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fv_protocol::{SdkStatus, SessionStatus, UxEvent};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::events::{EmittedEvent, EventSink};
use crate::host::Host;
use crate::permission::{Permission, RequestToken};
use crate::sdk::{ResultSink, SdkConfig, SdkHandle, SdkSession, SessionRequest, VerificationSdk};
use crate::subscriber::Subscriber;

/// Scriptable [`Host`]. Starts with a foreground activity attached and no rationale shown.
pub struct FakeHost {
	state: Mutex<FakeHostState>,
}

struct FakeHostState {
	attached: bool,
	rationale: bool,
	fail_next_dispatch: Option<String>,
	dispatched: Vec<RequestToken>,
}

impl FakeHost {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(FakeHostState {
				attached: true,
				rationale: false,
				fail_next_dispatch: None,
				dispatched: Vec::new(),
			}),
		}
	}

	pub fn attach_activity(&self) {
		self.state.lock().attached = true;
	}

	pub fn detach_activity(&self) {
		self.state.lock().attached = false;
	}

	/// Sets what `should_show_rationale` reports from now on.
	pub fn set_rationale(&self, shown: bool) {
		self.state.lock().rationale = shown;
	}

	/// Makes the next dispatch fail with [`Error::IllegalState`].
	pub fn fail_next_dispatch(&self, message: impl Into<String>) {
		self.state.lock().fail_next_dispatch = Some(message.into());
	}

	/// Tokens of every prompt dispatched so far, in order.
	pub fn dispatched(&self) -> Vec<RequestToken> {
		self.state.lock().dispatched.clone()
	}

	pub fn last_dispatched(&self) -> Option<RequestToken> {
		self.state.lock().dispatched.last().copied()
	}
}

impl Default for FakeHost {
	fn default() -> Self {
		Self::new()
	}
}

impl Host for FakeHost {
	fn has_foreground_activity(&self) -> bool {
		self.state.lock().attached
	}

	fn should_show_rationale(&self, _permission: Permission) -> Result<bool> {
		let state = self.state.lock();
		if !state.attached {
			return Err(Error::NoActivity("fake host has no activity".to_string()));
		}
		Ok(state.rationale)
	}

	fn request_permission(&self, _permission: Permission, token: RequestToken) -> Result<()> {
		let mut state = self.state.lock();
		if let Some(message) = state.fail_next_dispatch.take() {
			return Err(Error::IllegalState(message));
		}
		state.dispatched.push(token);
		Ok(())
	}
}

/// A session started on the [`FakeSdk`].
#[derive(Clone)]
pub struct StartedSession {
	pub id: String,
	pub enrollment_identifier: String,
	pub max_retries: u32,
	pub sink: Arc<dyn ResultSink>,
}

/// Scriptable [`VerificationSdk`] that counts live session handles.
pub struct FakeSdk {
	status: Mutex<SdkStatus>,
	initialize_result: SdkStatus,
	initialize_calls: AtomicUsize,
	fail_next_start: Mutex<Option<String>>,
	started: Mutex<Vec<StartedSession>>,
	live: Arc<AtomicUsize>,
}

impl FakeSdk {
	/// SDK that initializes successfully.
	pub fn new() -> Self {
		Self::with_initialize_result(SdkStatus::Initialized)
	}

	/// SDK whose `initialize` ends in `status`.
	pub fn with_initialize_result(status: SdkStatus) -> Self {
		Self {
			status: Mutex::new(SdkStatus::NeverInitialized),
			initialize_result: status,
			initialize_calls: AtomicUsize::new(0),
			fail_next_start: Mutex::new(None),
			started: Mutex::new(Vec::new()),
			live: Arc::new(AtomicUsize::new(0)),
		}
	}

	pub fn fail_next_start(&self, message: impl Into<String>) {
		*self.fail_next_start.lock() = Some(message.into());
	}

	pub fn started(&self) -> Vec<StartedSession> {
		self.started.lock().clone()
	}

	/// Result sink of the most recently started session.
	pub fn last_sink(&self) -> Option<Arc<dyn ResultSink>> {
		self.started.lock().last().map(|session| Arc::clone(&session.sink))
	}

	/// Handles handed out and not yet dropped.
	pub fn live_handles(&self) -> usize {
		self.live.load(Ordering::SeqCst)
	}

	pub fn initialize_calls(&self) -> usize {
		self.initialize_calls.load(Ordering::SeqCst)
	}
}

impl Default for FakeSdk {
	fn default() -> Self {
		Self::new()
	}
}

impl VerificationSdk for FakeSdk {
	fn status(&self) -> SdkStatus {
		*self.status.lock()
	}

	fn initialize(&self, _config: &SdkConfig) -> SdkStatus {
		self.initialize_calls.fetch_add(1, Ordering::SeqCst);
		*self.status.lock() = self.initialize_result;
		self.initialize_result
	}

	fn start_session(&self, request: SessionRequest<'_>, sink: Arc<dyn ResultSink>) -> Result<SdkHandle> {
		if let Some(message) = self.fail_next_start.lock().take() {
			return Err(Error::SdkSession(message));
		}

		let mut started = self.started.lock();
		let id = format!("fake-sdk-{}", started.len());
		started.push(StartedSession {
			id: id.clone(),
			enrollment_identifier: request.enrollment_identifier.to_string(),
			max_retries: request.max_retries,
			sink,
		});
		self.live.fetch_add(1, Ordering::SeqCst);

		Ok(Box::new(FakeSdkSession {
			id,
			live: Arc::clone(&self.live),
		}))
	}
}

struct FakeSdkSession {
	id: String,
	live: Arc<AtomicUsize>,
}

impl SdkSession for FakeSdkSession {
	fn id(&self) -> &str {
		&self.id
	}
}

impl Drop for FakeSdkSession {
	fn drop(&mut self) {
		self.live.fetch_sub(1, Ordering::SeqCst);
	}
}

/// A subscriber callback as observed by [`RecordingSubscriber`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum SubscriberCall {
	Success {
		#[serde(skip_serializing_if = "Option::is_none")]
		message: Option<String>,
	},
	Failure {
		status: SessionStatus,
		#[serde(skip_serializing_if = "Option::is_none")]
		message: Option<String>,
	},
	CameraAccessError,
	SessionContextSwitch,
}

/// Subscriber that records every callback.
#[derive(Default)]
pub struct RecordingSubscriber {
	calls: Mutex<Vec<SubscriberCall>>,
}

impl RecordingSubscriber {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn calls(&self) -> Vec<SubscriberCall> {
		self.calls.lock().clone()
	}

	pub fn count(&self, call: &SubscriberCall) -> usize {
		self.calls.lock().iter().filter(|seen| *seen == call).count()
	}
}

impl Subscriber for RecordingSubscriber {
	fn on_success(&self, message: Option<String>) {
		self.calls.lock().push(SubscriberCall::Success { message });
	}

	fn on_failure(&self, kind: SessionStatus, message: Option<String>) {
		self.calls.lock().push(SubscriberCall::Failure { status: kind, message });
	}

	fn on_camera_access_error(&self) {
		self.calls.lock().push(SubscriberCall::CameraAccessError);
	}

	fn on_session_context_switch(&self) {
		self.calls.lock().push(SubscriberCall::SessionContextSwitch);
	}
}

/// Event sink that keeps every event.
#[derive(Default)]
pub struct RecordingEventSink {
	events: Mutex<Vec<EmittedEvent>>,
}

impl RecordingEventSink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn events(&self) -> Vec<EmittedEvent> {
		self.events.lock().clone()
	}

	pub fn names(&self) -> Vec<UxEvent> {
		self.events.lock().iter().map(|e| e.event).collect()
	}
}

impl EventSink for RecordingEventSink {
	fn dispatch(&self, event: UxEvent, data: Option<Value>) {
		self.events.lock().push(EmittedEvent { event, data });
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fake_sdk_tracks_handle_lifetime() {
		let sdk = FakeSdk::new();
		let sink: Arc<dyn ResultSink> = Arc::new(crate::attempt::AttemptTracker::new(
			crate::session::SessionId::new(0),
			0,
			Arc::new(RecordingEventSink::new()),
		));
		let request = SessionRequest {
			enrollment_identifier: "user-1",
			max_retries: 1,
		};

		let first = sdk.start_session(request, Arc::clone(&sink)).unwrap();
		let second = sdk.start_session(request, sink).unwrap();
		assert_eq!(sdk.live_handles(), 2);
		assert_eq!(first.id(), "fake-sdk-0");

		drop(first);
		assert_eq!(sdk.live_handles(), 1);
		drop(second);
		assert_eq!(sdk.live_handles(), 0);
		assert_eq!(sdk.started().len(), 2);
	}

	#[test]
	fn fake_host_failure_is_single_shot() {
		let host = FakeHost::new();
		host.fail_next_dispatch("not permission aware");
		assert!(host.request_permission(Permission::Camera, RequestToken::new(0)).is_err());
		assert!(host.request_permission(Permission::Camera, RequestToken::new(1)).is_ok());
		assert_eq!(host.dispatched(), vec![RequestToken::new(1)]);
	}

	#[test]
	fn subscriber_call_serializes_with_tag() {
		let value = serde_json::to_value(SubscriberCall::CameraAccessError).unwrap();
		assert_eq!(value["call"], "cameraAccessError");
	}
}
