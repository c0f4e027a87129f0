//! Fire-and-forget UX event sinks.

use fv_protocol::UxEvent;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::info;

/// One emitted event with its optional payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmittedEvent {
	pub event: UxEvent,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
}

/// Destination for UX events. Dispatch never blocks and never fails.
pub trait EventSink: Send + Sync {
	fn dispatch(&self, event: UxEvent, data: Option<Value>);
}

/// Logs events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
	fn dispatch(&self, event: UxEvent, data: Option<Value>) {
		match data {
			Some(data) => info!(target = "fv.events", %event, %data, "ux event"),
			None => info!(target = "fv.events", %event, "ux event"),
		}
	}
}

/// Forwards events over an unbounded channel to the embedding application.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
	tx: mpsc::UnboundedSender<EmittedEvent>,
}

impl ChannelEventSink {
	pub fn new() -> (Self, mpsc::UnboundedReceiver<EmittedEvent>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { tx }, rx)
	}
}

impl EventSink for ChannelEventSink {
	fn dispatch(&self, event: UxEvent, data: Option<Value>) {
		// receiver gone means nobody is listening
		let _ = self.tx.send(EmittedEvent { event, data });
	}
}
