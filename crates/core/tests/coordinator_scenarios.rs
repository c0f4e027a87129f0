//! End-to-end coordinator behavior against the in-memory host and SDK.

use std::sync::mpsc;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use fv::testing::{FakeHost, FakeSdk, RecordingEventSink, RecordingSubscriber, SubscriberCall};
use fv::{EnrollmentResponse, EnrollmentResult, SessionCoordinator, SessionState, SessionStatus, UxEvent};

struct Harness {
	coordinator: SessionCoordinator,
	host: Arc<FakeHost>,
	sdk: Arc<FakeSdk>,
	events: Arc<RecordingEventSink>,
}

impl Harness {
	fn new() -> Self {
		let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter("fv=debug").try_init();
		let host = Arc::new(FakeHost::new());
		let sdk = Arc::new(FakeSdk::new());
		let events = Arc::new(RecordingEventSink::new());
		let coordinator = SessionCoordinator::new(host.clone(), sdk.clone(), events.clone());
		Self {
			coordinator,
			host,
			sdk,
			events,
		}
	}

	fn start(&self, enrollment_identifier: &str) -> Arc<RecordingSubscriber> {
		let subscriber = Arc::new(RecordingSubscriber::new());
		self.coordinator.start_verification(enrollment_identifier, 3, subscriber.clone());
		subscriber
	}

	fn grant_last(&self) {
		let token = self.host.last_dispatched().expect("a permission request should be dispatched");
		self.coordinator.deliver_permission_result(token, true, false);
	}
}

#[test]
fn permanent_denial_reports_camera_error_and_clears_session() {
	let h = Harness::new();
	h.host.set_rationale(true);
	let sub_a = h.start("user-1");

	let token = h.host.last_dispatched().unwrap();
	h.coordinator.deliver_permission_result(token, false, false);

	assert_eq!(sub_a.calls(), vec![SubscriberCall::CameraAccessError]);
	assert!(h.coordinator.active_session().is_none());
	assert!(h.sdk.started().is_empty());
}

#[test]
fn retryable_denial_reports_the_same_way() {
	let h = Harness::new();
	let sub_a = h.start("user-1");

	let token = h.host.last_dispatched().unwrap();
	h.coordinator.deliver_permission_result(token, false, true);

	assert_eq!(sub_a.calls(), vec![SubscriberCall::CameraAccessError]);
	assert!(h.coordinator.active_session().is_none());
}

#[test]
fn grant_after_preemption_does_not_begin_preempted_session() {
	let h = Harness::new();
	let sub_a = h.start("user-1");
	let token_a = h.host.last_dispatched().unwrap();

	let sub_b = h.start("user-2");
	let token_b = h.host.last_dispatched().unwrap();
	assert_ne!(token_a, token_b);

	assert_eq!(sub_a.calls(), vec![SubscriberCall::SessionContextSwitch]);

	h.coordinator.deliver_permission_result(token_a, true, false);
	assert!(h.sdk.started().is_empty(), "preempted session must not begin");
	assert_eq!(h.coordinator.active_session().unwrap().enrollment_identifier, "user-2");

	h.coordinator.deliver_permission_result(token_b, true, false);
	let started = h.sdk.started();
	assert_eq!(started.len(), 1);
	assert_eq!(started[0].enrollment_identifier, "user-2");
	assert_eq!(h.coordinator.active_session().unwrap().state, SessionState::Active);
	assert!(sub_b.calls().is_empty());
}

#[test]
fn preempted_session_never_completes() {
	let h = Harness::new();
	let sub_a = h.start("user-1");
	h.grant_last();
	assert_eq!(h.sdk.live_handles(), 1);

	let sub_b = h.start("user-2");
	assert_eq!(h.sdk.live_handles(), 0, "preemption releases the old handle");
	h.grant_last();
	assert_eq!(h.sdk.live_handles(), 1);

	h.sdk.last_sink().unwrap().on_enrollment_response(&EnrollmentResponse::succeeded());
	// first signal belongs to the UI user-1 launched
	h.coordinator.on_external_completion_signal();
	assert!(sub_b.calls().is_empty());
	h.coordinator.on_external_completion_signal();

	assert_eq!(sub_a.count(&SubscriberCall::SessionContextSwitch), 1);
	assert_eq!(sub_a.calls().len(), 1);
	assert!(matches!(sub_b.calls().as_slice(), [SubscriberCall::Success { .. }]));
	assert_eq!(h.sdk.live_handles(), 0);
}

#[test]
fn signal_from_preempted_ui_leaves_newer_active_session_untouched() {
	let h = Harness::new();
	let _sub_a = h.start("user-1");
	h.grant_last();
	let sub_b = h.start("user-2");
	h.grant_last();

	h.coordinator.on_external_completion_signal();

	assert!(sub_b.calls().is_empty());
	let active = h.coordinator.active_session().unwrap();
	assert_eq!(active.enrollment_identifier, "user-2");
	assert_eq!(active.state, SessionState::Active);
	assert!(active.holds_sdk_handle);
	assert_eq!(h.sdk.live_handles(), 1);
}

#[test]
fn session_scoped_signals_resolve_in_any_order() {
	let h = Harness::new();
	let sub_a = h.start("user-1");
	h.grant_last();
	let id_a = h.coordinator.active_session().unwrap().id;
	let sub_b = h.start("user-2");
	h.grant_last();
	let id_b = h.coordinator.active_session().unwrap().id;

	h.sdk.last_sink().unwrap().on_scan_cancelled(SessionStatus::UserCancelled);
	h.coordinator.complete_session(id_b);
	assert_eq!(
		sub_b.calls(),
		vec![SubscriberCall::Failure {
			status: SessionStatus::UserCancelled,
			message: None,
		}]
	);
	assert!(h.coordinator.active_session().is_none());

	h.coordinator.complete_session(id_a);
	h.coordinator.on_external_completion_signal();
	assert_eq!(sub_a.calls(), vec![SubscriberCall::SessionContextSwitch]);
	assert_eq!(sub_b.calls().len(), 1);

	// user-1's UI was accounted for, so the next unattributed signal reaches the active session
	let sub_c = h.start("user-3");
	h.grant_last();
	h.coordinator.on_external_completion_signal();
	assert_eq!(sub_c.calls().len(), 1);
}

#[test]
fn event_sink_may_query_the_coordinator() {
	struct QueryingSink {
		coordinator: OnceLock<SessionCoordinator>,
		seen: parking_lot::Mutex<Vec<(UxEvent, Option<SessionState>)>>,
	}

	impl fv::EventSink for QueryingSink {
		fn dispatch(&self, event: UxEvent, _data: Option<serde_json::Value>) {
			let state = self.coordinator.get().and_then(|c| c.active_session()).map(|s| s.state);
			self.seen.lock().push((event, state));
		}
	}

	let host = Arc::new(FakeHost::new());
	let sdk = Arc::new(FakeSdk::new());
	let sink = Arc::new(QueryingSink {
		coordinator: OnceLock::new(),
		seen: parking_lot::Mutex::new(Vec::new()),
	});
	let coordinator = SessionCoordinator::new(host.clone(), sdk.clone(), sink.clone());
	let _ = sink.coordinator.set(coordinator.clone());

	let (done_tx, done_rx) = mpsc::channel();
	std::thread::spawn(move || {
		coordinator.start_verification("user-1", 3, Arc::new(RecordingSubscriber::new()));
		let token = host.last_dispatched().unwrap();
		coordinator.deliver_permission_result(token, true, false);
		sdk.last_sink().unwrap().on_capture_done();
		let _ = done_tx.send(());
	});

	done_rx.recv_timeout(Duration::from_secs(5)).expect("event sink must not block on coordinator state");
	assert_eq!(
		*sink.seen.lock(),
		vec![
			(UxEvent::UiReady, Some(SessionState::Active)),
			(UxEvent::CaptureDone, Some(SessionState::Active)),
		]
	);
}

#[test]
fn completion_clears_session_and_repeat_signal_is_a_no_op() {
	let h = Harness::new();
	let sub = h.start("user-1");
	h.grant_last();
	assert_eq!(h.coordinator.active_session().unwrap().state, SessionState::Active);

	h.coordinator.on_external_completion_signal();
	assert!(h.coordinator.active_session().is_none());
	assert_eq!(sub.calls().len(), 1);

	h.coordinator.on_external_completion_signal();
	assert!(h.coordinator.active_session().is_none());
	assert_eq!(sub.calls().len(), 1);
}

#[test]
fn completion_signal_without_any_session_is_silent() {
	let h = Harness::new();
	h.coordinator.on_external_completion_signal();
	assert!(h.coordinator.active_session().is_none());
	assert!(h.events.events().is_empty());
}

#[test]
fn duplicate_permission_result_is_delivered_once() {
	let h = Harness::new();
	let sub = h.start("user-1");
	let token = h.host.last_dispatched().unwrap();

	h.coordinator.deliver_permission_result(token, false, false);
	h.coordinator.deliver_permission_result(token, false, false);
	h.coordinator.deliver_permission_result(token, true, false);

	assert_eq!(sub.calls(), vec![SubscriberCall::CameraAccessError]);
	assert!(h.sdk.started().is_empty());
}

#[test]
fn missing_activity_reports_camera_error_and_coordinator_stays_usable() {
	let h = Harness::new();
	h.host.detach_activity();
	let sub_a = h.start("user-1");

	assert_eq!(sub_a.calls(), vec![SubscriberCall::CameraAccessError]);
	assert!(h.coordinator.active_session().is_none());
	assert_eq!(h.coordinator.pending_permission_requests(), 0);

	h.host.attach_activity();
	let sub_b = h.start("user-2");
	h.grant_last();
	assert_eq!(h.coordinator.active_session().unwrap().state, SessionState::Active);
	assert!(sub_b.calls().is_empty());
}

#[test]
fn dispatch_failure_reports_camera_error() {
	let h = Harness::new();
	h.host.fail_next_dispatch("host activity is not permission aware");
	let sub = h.start("user-1");

	assert_eq!(sub.calls(), vec![SubscriberCall::CameraAccessError]);
	assert!(h.coordinator.active_session().is_none());
	assert_eq!(h.coordinator.pending_permission_requests(), 0);
}

#[test]
fn liveness_retry_then_success_emits_events_in_order() {
	let h = Harness::new();
	let sub = h.start("user-1");
	h.grant_last();

	let sink = h.sdk.last_sink().unwrap();
	sink.on_capture_done();
	let retry = EnrollmentResponse {
		success: false,
		error: Some("Please try again in better light".to_string()),
		enrollment_result: Some(EnrollmentResult {
			is_live: Some(false),
			..Default::default()
		}),
	};
	assert!(matches!(sink.on_enrollment_response(&retry), fv::ScanVerdict::Retry { .. }));
	sink.on_capture_done();
	assert_eq!(sink.on_enrollment_response(&EnrollmentResponse::succeeded()), fv::ScanVerdict::Succeed);

	h.coordinator.on_external_completion_signal();

	assert_eq!(
		h.events.names(),
		vec![UxEvent::UiReady, UxEvent::CaptureDone, UxEvent::FvRetry, UxEvent::CaptureDone]
	);
	assert!(matches!(sub.calls().as_slice(), [SubscriberCall::Success { .. }]));
}

#[test]
fn user_cancel_is_reported_as_failure() {
	let h = Harness::new();
	let sub = h.start("user-1");
	h.grant_last();

	h.sdk.last_sink().unwrap().on_scan_cancelled(SessionStatus::UserCancelled);
	h.coordinator.on_external_completion_signal();

	assert_eq!(
		sub.calls(),
		vec![SubscriberCall::Failure {
			status: SessionStatus::UserCancelled,
			message: None,
		}]
	);
}

#[test]
fn subscriber_may_restart_from_inside_a_callback() {
	struct Restarting {
		coordinator: SessionCoordinator,
		restarted: parking_lot::Mutex<bool>,
	}

	impl fv::Subscriber for Restarting {
		fn on_success(&self, _message: Option<String>) {}
		fn on_failure(&self, _kind: SessionStatus, _message: Option<String>) {}
		fn on_camera_access_error(&self) {
			let mut restarted = self.restarted.lock();
			if !*restarted {
				*restarted = true;
				self.coordinator.start_verification("retry", 1, Arc::new(RecordingSubscriber::new()));
			}
		}
		fn on_session_context_switch(&self) {}
	}

	let h = Harness::new();
	let subscriber = Arc::new(Restarting {
		coordinator: h.coordinator.clone(),
		restarted: parking_lot::Mutex::new(false),
	});
	h.coordinator.start_verification("user-1", 3, subscriber.clone());
	let token = h.host.last_dispatched().unwrap();
	h.coordinator.deliver_permission_result(token, false, true);

	assert!(*subscriber.restarted.lock());
	let active = h.coordinator.active_session().unwrap();
	assert_eq!(active.enrollment_identifier, "retry");
	assert_eq!(active.state, SessionState::Created);
}

#[tokio::test]
async fn verify_resolves_promise_on_success() {
	let h = Harness::new();
	let (_, promise) = h.coordinator.verify("user-1", 3);
	h.grant_last();
	h.sdk.last_sink().unwrap().on_enrollment_response(&EnrollmentResponse::succeeded());
	h.coordinator.on_external_completion_signal();

	let outcome = promise.wait().await.unwrap();
	assert_eq!(outcome, Ok(Some(fv::attempt::SUCCESS_MESSAGE.to_string())));
}

#[tokio::test]
async fn verify_rejects_preempted_promise_with_context_switch() {
	let h = Harness::new();
	let (_, first) = h.coordinator.verify("user-1", 3);
	let (_, mut second) = h.coordinator.verify("user-2", 3);

	let failure = first.wait().await.unwrap().unwrap_err();
	assert_eq!(failure.status, SessionStatus::ContextSwitch);
	assert!(second.try_outcome().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_starts_keep_at_most_one_live_handle() {
	let h = Arc::new(Harness::new());

	let mut tasks = Vec::new();
	for i in 0..16 {
		let h = Arc::clone(&h);
		tasks.push(tokio::spawn(async move {
			h.start(&format!("user-{i}"));
			if let Some(token) = h.host.last_dispatched() {
				h.coordinator.deliver_permission_result(token, true, false);
			}
			assert!(h.sdk.live_handles() <= 1);
		}));
	}
	for task in tasks {
		task.await.unwrap();
	}

	assert!(h.sdk.live_handles() <= 1);
	let active = h.coordinator.active_session().unwrap();
	assert_eq!(active.holds_sdk_handle, h.sdk.live_handles() == 1);
}
