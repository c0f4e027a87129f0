//! Session and camera-permission orchestration for face verification.
//!
//! [`SessionCoordinator`] keeps at most one verification session alive,
//! requests camera access through the host platform, starts the opaque
//! verification SDK once access is granted, and turns the platform's
//! "verification UI finished" signal into a subscriber callback.
//!
//! Host platform, SDK, subscriber and event delivery are trait seams
//! ([`Host`], [`VerificationSdk`], [`Subscriber`], [`EventSink`]); in-memory
//! implementations live in [`testing`].

pub mod attempt;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod host;
pub mod permission;
pub mod sdk;
pub mod session;
pub mod subscriber;
pub mod testing;

pub use attempt::{AttemptReport, AttemptTracker};
pub use coordinator::SessionCoordinator;
pub use error::{Error, Result};
pub use events::{ChannelEventSink, EmittedEvent, EventSink, TracingEventSink};
pub use fv_protocol::{EnrollmentResponse, EnrollmentResult, RetryDetails, SdkStatus, SessionStatus, UxEvent};
pub use host::Host;
pub use permission::{Denial, Permission, PermissionBroker, PermissionOutcome, RequestToken};
pub use sdk::{ResultSink, ScanVerdict, SdkConfig, SdkHandle, SdkSession, SessionRequest, VerificationSdk};
pub use session::{SessionId, SessionSnapshot, SessionState, VerificationSession};
pub use subscriber::{PromiseSubscriber, Subscriber, VerificationFailure, VerificationOutcome, VerificationPromise};
