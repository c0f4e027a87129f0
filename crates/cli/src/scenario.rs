//! Scripted scenarios replayed against an in-memory host and SDK.
//!
//! A scenario is a JSON document with a list of steps. Each step either
//! drives the coordinator the way a host application would (start a
//! verification, deliver a permission result, signal completion) or plays
//! the SDK side (capture, enrollment responses, cancellation). The run
//! produces a report of every subscriber callback and UX event, tagged
//! with the step that caused it.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use fv::testing::{FakeHost, FakeSdk, SubscriberCall};
use fv::{
	ChannelEventSink, EmittedEvent, EnrollmentResponse, RequestToken, ScanVerdict, SdkStatus, SessionCoordinator, SessionId, SessionSnapshot, SessionStatus,
	Subscriber,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::CliConfig;
use crate::error::{CliError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
	/// Status the simulated SDK reports from `initialize`.
	#[serde(default)]
	pub sdk_initialize_result: Option<SdkStatus>,
	pub steps: Vec<Step>,
}

impl Scenario {
	pub fn from_file(path: &Path) -> Result<Self> {
		let content = fs::read_to_string(path).with_context(|| format!("reading scenario {}", path.display()))?;
		Self::parse(&content)
	}

	pub fn parse(content: &str) -> Result<Self> {
		serde_json::from_str(content).map_err(|err| CliError::Scenario(format!("invalid scenario: {err}")))
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
	Initialize,
	Start {
		enrollment_identifier: String,
		#[serde(default)]
		max_retries: Option<u32>,
		/// Name used for this request's subscriber in the transcript.
		#[serde(default)]
		label: Option<String>,
	},
	/// Defaults to the most recently dispatched token.
	Permission {
		#[serde(default)]
		token: Option<u32>,
		granted: bool,
		#[serde(default)]
		rationale_shown_now: bool,
	},
	Capture,
	CancelScan {
		status: SessionStatus,
	},
	Enrollment {
		response: EnrollmentResponse,
	},
	/// Unattributed unless `session` names the UI that closed.
	Complete {
		#[serde(default)]
		session: Option<u64>,
	},
	DetachActivity,
	AttachActivity,
	SetRationale {
		shown: bool,
	},
	FailDispatch {
		#[serde(default)]
		message: Option<String>,
	},
	FailSdkStart {
		#[serde(default)]
		message: Option<String>,
	},
}

impl Step {
	pub fn op(&self) -> &'static str {
		match self {
			Step::Initialize => "initialize",
			Step::Start { .. } => "start",
			Step::Permission { .. } => "permission",
			Step::Capture => "capture",
			Step::CancelScan { .. } => "cancelScan",
			Step::Enrollment { .. } => "enrollment",
			Step::Complete { .. } => "complete",
			Step::DetachActivity => "detachActivity",
			Step::AttachActivity => "attachActivity",
			Step::SetRationale { .. } => "setRationale",
			Step::FailDispatch { .. } => "failDispatch",
			Step::FailSdkStart { .. } => "failSdkStart",
		}
	}
}

/// One subscriber callback observed during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
	pub step: usize,
	pub label: String,
	pub session: Option<SessionId>,
	#[serde(flatten)]
	pub call: SubscriberCall,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepEvent {
	pub step: usize,
	#[serde(flatten)]
	pub event: EmittedEvent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
	pub index: usize,
	pub op: &'static str,
	#[serde(skip_serializing_if = "Value::is_null")]
	pub result: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
	pub steps: Vec<StepRecord>,
	pub transcript: Vec<TranscriptEntry>,
	pub events: Vec<StepEvent>,
	pub active_session: Option<SessionSnapshot>,
	pub pending_requests: usize,
	pub sdk_sessions_started: usize,
	pub live_sdk_handles: usize,
}

type Transcript = Arc<Mutex<Vec<TranscriptEntry>>>;

/// Subscriber that writes into the shared transcript.
struct TranscriptSubscriber {
	label: String,
	session: Mutex<Option<SessionId>>,
	step: Arc<AtomicUsize>,
	transcript: Transcript,
}

impl TranscriptSubscriber {
	fn record(&self, call: SubscriberCall) {
		let session = *self.session.lock();
		debug!(target = "fv.cli", label = %self.label, ?session, ?call, "subscriber callback");
		self.transcript.lock().push(TranscriptEntry {
			step: self.step.load(Ordering::SeqCst),
			label: self.label.clone(),
			session,
			call,
		});
	}
}

impl Subscriber for TranscriptSubscriber {
	fn on_success(&self, message: Option<String>) {
		self.record(SubscriberCall::Success { message });
	}

	fn on_failure(&self, kind: SessionStatus, message: Option<String>) {
		self.record(SubscriberCall::Failure { status: kind, message });
	}

	fn on_camera_access_error(&self) {
		self.record(SubscriberCall::CameraAccessError);
	}

	fn on_session_context_switch(&self) {
		self.record(SubscriberCall::SessionContextSwitch);
	}
}

pub struct Simulation<'a> {
	config: &'a CliConfig,
	coordinator: SessionCoordinator,
	host: Arc<FakeHost>,
	sdk: Arc<FakeSdk>,
	events: mpsc::UnboundedReceiver<EmittedEvent>,
	step: Arc<AtomicUsize>,
	transcript: Transcript,
	emitted: Vec<StepEvent>,
	starts: usize,
}

impl<'a> Simulation<'a> {
	pub fn new(config: &'a CliConfig, sdk_initialize_result: Option<SdkStatus>) -> Self {
		let host = Arc::new(FakeHost::new());
		let sdk = Arc::new(match sdk_initialize_result {
			Some(status) => FakeSdk::with_initialize_result(status),
			None => FakeSdk::new(),
		});
		let (sink, events) = ChannelEventSink::new();
		let coordinator = SessionCoordinator::new(host.clone(), sdk.clone(), Arc::new(sink));

		Self {
			config,
			coordinator,
			host,
			sdk,
			events,
			step: Arc::new(AtomicUsize::new(0)),
			transcript: Arc::new(Mutex::new(Vec::new())),
			emitted: Vec::new(),
			starts: 0,
		}
	}

	/// Runs every step in order. Stops at the first step that cannot be applied.
	pub fn run(mut self, steps: &[Step]) -> Result<SimulationReport> {
		let mut records = Vec::with_capacity(steps.len());
		for (index, step) in steps.iter().enumerate() {
			self.step.store(index, Ordering::SeqCst);
			debug!(target = "fv.cli", index, op = step.op(), "applying step");
			let result = self.apply(step).map_err(|err| {
				let reason = match err {
					CliError::Scenario(reason) => reason,
					other => other.to_string(),
				};
				CliError::Scenario(format!("step {index} ({}): {reason}", step.op()))
			})?;
			self.drain_events(index);
			records.push(StepRecord {
				index,
				op: step.op(),
				result,
			});
		}

		info!(target = "fv.cli", steps = records.len(), "scenario finished");
		let transcript = self.transcript.lock().clone();
		Ok(SimulationReport {
			steps: records,
			transcript,
			events: self.emitted,
			active_session: self.coordinator.active_session(),
			pending_requests: self.coordinator.pending_permission_requests(),
			sdk_sessions_started: self.sdk.started().len(),
			live_sdk_handles: self.sdk.live_handles(),
		})
	}

	fn apply(&mut self, step: &Step) -> Result<Value> {
		let result = match step {
			Step::Initialize => match self.coordinator.initialize_sdk(&self.config.sdk) {
				Ok(status) => json!({ "status": status }),
				Err(fv::Error::SdkInitialization { status, message }) => json!({ "status": status, "error": message }),
				Err(err) => return Err(err.into()),
			},
			Step::Start {
				enrollment_identifier,
				max_retries,
				label,
			} => {
				self.starts += 1;
				let label = label.clone().unwrap_or_else(|| format!("request-{}", self.starts));
				let subscriber = Arc::new(TranscriptSubscriber {
					label: label.clone(),
					session: Mutex::new(None),
					step: Arc::clone(&self.step),
					transcript: Arc::clone(&self.transcript),
				});
				let max_retries = max_retries.unwrap_or(self.config.defaults.max_retries);
				let dispatched_before = self.host.dispatched().len();
				let id = self.coordinator.start_verification(enrollment_identifier.as_str(), max_retries, subscriber.clone());
				// callbacks fired during the call itself were recorded before the id was known
				*subscriber.session.lock() = Some(id);
				for entry in self.transcript.lock().iter_mut() {
					if entry.label == label && entry.session.is_none() {
						entry.session = Some(id);
					}
				}
				let token = self.host.last_dispatched().filter(|_| self.host.dispatched().len() > dispatched_before);
				json!({ "session": id, "label": label, "maxRetries": max_retries, "token": token.map(RequestToken::get) })
			}
			Step::Permission {
				token,
				granted,
				rationale_shown_now,
			} => {
				let token = match token {
					Some(token) => RequestToken::new(*token),
					None => self
						.host
						.last_dispatched()
						.ok_or_else(|| CliError::Scenario("no permission request has been dispatched".into()))?,
				};
				let still_pending = self.coordinator.deliver_permission_result(token, *granted, *rationale_shown_now);
				json!({ "token": token.get(), "stillPending": still_pending })
			}
			Step::Capture => {
				self.current_sink()?.on_capture_done();
				Value::Null
			}
			Step::CancelScan { status } => {
				self.current_sink()?.on_scan_cancelled(*status);
				Value::Null
			}
			Step::Enrollment { response } => verdict_json(&self.current_sink()?.on_enrollment_response(response)),
			Step::Complete { session: None } => {
				self.coordinator.on_external_completion_signal();
				Value::Null
			}
			Step::Complete { session: Some(id) } => {
				self.coordinator.complete_session(SessionId::new(*id));
				Value::Null
			}
			Step::DetachActivity => {
				self.host.detach_activity();
				Value::Null
			}
			Step::AttachActivity => {
				self.host.attach_activity();
				Value::Null
			}
			Step::SetRationale { shown } => {
				self.host.set_rationale(*shown);
				Value::Null
			}
			Step::FailDispatch { message } => {
				self.host.fail_next_dispatch(message.clone().unwrap_or_else(|| "permission prompt unavailable".into()));
				Value::Null
			}
			Step::FailSdkStart { message } => {
				self.sdk.fail_next_start(message.clone().unwrap_or_else(|| "sdk refused to start".into()));
				Value::Null
			}
		};
		Ok(result)
	}

	fn current_sink(&self) -> Result<Arc<dyn fv::ResultSink>> {
		self.sdk
			.last_sink()
			.ok_or_else(|| CliError::Scenario("no SDK session has been started".into()))
	}

	fn drain_events(&mut self, step: usize) {
		while let Ok(event) = self.events.try_recv() {
			self.emitted.push(StepEvent { step, event });
		}
	}
}

fn verdict_json(verdict: &ScanVerdict) -> Value {
	match verdict {
		ScanVerdict::Succeed => json!({ "verdict": "succeed" }),
		ScanVerdict::Retry { message } => json!({ "verdict": "retry", "message": message }),
		ScanVerdict::Cancel { message } => json!({ "verdict": "cancel", "message": message }),
	}
}

/// Parses and runs a scenario with the given configuration.
pub fn run(scenario: &Scenario, config: &CliConfig) -> Result<SimulationReport> {
	Simulation::new(config, scenario.sdk_initialize_result).run(&scenario.steps)
}
