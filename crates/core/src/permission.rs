//! Runtime permission request/response correlation.
//!
//! The broker hands out a fresh [`RequestToken`] for every prompt it
//! dispatches through the [`Host`] and keeps the single-use result callback
//! in a token-keyed table. When the platform reports a result, the entry is
//! removed and its callback invoked exactly once.
//!
//! # Flow
//!
//! 1. Caller invokes [`PermissionBroker::request_camera_permission`] with a callback
//! 2. Broker snapshots the rationale flag and allocates a token
//! 3. Callback is stored under the token, then the prompt is dispatched
//! 4. Platform later calls [`PermissionBroker::deliver_result`] with the token
//! 5. Entry is removed and the callback receives a [`PermissionOutcome`]
//!
//! Results for unknown tokens (stale or duplicate platform callbacks) are
//! dropped. A request whose result never arrives stays in the table for the
//! lifetime of the broker.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::host::Host;

/// Runtime permissions the coordinator can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
	Camera,
}

impl Permission {
	/// Platform identifier for the permission.
	pub fn as_str(self) -> &'static str {
		match self {
			Permission::Camera => "android.permission.CAMERA",
		}
	}
}

impl std::fmt::Display for Permission {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Correlates a dispatched permission prompt with its eventual result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u32);

impl RequestToken {
	pub fn new(value: u32) -> Self {
		Self(value)
	}

	pub fn get(self) -> u32 {
		self.0
	}
}

impl std::fmt::Display for RequestToken {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// How a denied permission should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
	/// The platform will not prompt again; only a settings change can grant it.
	Permanent,
	/// The prompt may be shown again.
	Retryable,
}

/// Result of a permission prompt as seen by the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionOutcome {
	pub granted: bool,
	/// Rationale visibility snapshotted when the request was dispatched.
	pub rationale_was_shown_before: bool,
	/// Rationale visibility reported by the platform alongside the result.
	pub rationale_shown_now: bool,
}

impl PermissionOutcome {
	/// Classifies a denial.
	///
	/// A rationale that was visible before the prompt and is no longer offered
	/// means the user chose "don't ask again".
	pub fn denial(&self) -> Option<Denial> {
		if self.granted {
			None
		} else if self.rationale_was_shown_before && !self.rationale_shown_now {
			Some(Denial::Permanent)
		} else {
			Some(Denial::Retryable)
		}
	}

	pub fn into_result(self) -> Result<()> {
		match self.denial() {
			None => Ok(()),
			Some(denial) => Err(Error::PermissionDenied {
				permanent: denial == Denial::Permanent,
			}),
		}
	}
}

/// Single-use continuation invoked with the permission result.
pub type PermissionCallback = Box<dyn FnOnce(PermissionOutcome) + Send>;

/// An in-flight permission prompt awaiting its result.
pub struct PendingPermissionRequest {
	pub token: RequestToken,
	pub permission: Permission,
	/// Whether a rationale was visible when the request was dispatched.
	pub rationale_shown: bool,
	on_result: PermissionCallback,
}

impl PendingPermissionRequest {
	fn resolve(self, granted: bool, rationale_shown_now: bool) {
		(self.on_result)(PermissionOutcome {
			granted,
			rationale_was_shown_before: self.rationale_shown,
			rationale_shown_now,
		});
	}
}

impl std::fmt::Debug for PendingPermissionRequest {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PendingPermissionRequest")
			.field("token", &self.token)
			.field("permission", &self.permission)
			.field("rationale_shown", &self.rationale_shown)
			.finish_non_exhaustive()
	}
}

/// Token-keyed table of in-flight permission prompts.
///
/// The table lock is never held while calling into the host or a callback, so
/// a platform that delivers results synchronously from inside
/// [`Host::request_permission`] is supported.
pub struct PermissionBroker {
	host: Arc<dyn Host>,
	/// Next token to hand out
	next_token: AtomicU32,
	pending: Mutex<HashMap<RequestToken, PendingPermissionRequest>>,
}

impl PermissionBroker {
	pub fn new(host: Arc<dyn Host>) -> Self {
		Self {
			host,
			next_token: AtomicU32::new(0),
			pending: Mutex::new(HashMap::new()),
		}
	}

	/// Requests camera access. See [`PermissionBroker::request`].
	pub fn request_camera_permission(&self, on_result: impl FnOnce(PermissionOutcome) + Send + 'static) -> Result<RequestToken> {
		self.request(Permission::Camera, Box::new(on_result))
	}

	/// Dispatches a permission prompt and returns its token without waiting for the result.
	///
	/// # Errors
	///
	/// - [`Error::NoActivity`] when no foreground activity can host the prompt; no token is allocated
	/// - any error from the host while reading the rationale flag or dispatching; the entry is discarded
	pub fn request(&self, permission: Permission, on_result: PermissionCallback) -> Result<RequestToken> {
		if !self.host.has_foreground_activity() {
			return Err(Error::NoActivity(format!("cannot request {permission} while not attached to an activity")));
		}

		let rationale_shown = self.host.should_show_rationale(permission)?;

		let token = {
			let mut pending = self.pending.lock();
			let token = self.allocate_token(&pending);
			pending.insert(
				token,
				PendingPermissionRequest {
					token,
					permission,
					rationale_shown,
					on_result,
				},
			);
			token
		};

		debug!(target = "fv.permission", %token, %permission, rationale_shown, "dispatching permission request");

		if let Err(err) = self.host.request_permission(permission, token) {
			self.pending.lock().remove(&token);
			warn!(target = "fv.permission", %token, error = %err, "permission dispatch failed");
			return Err(err);
		}

		Ok(token)
	}

	/// Delivers the platform's result for `token`.
	///
	/// Invokes the stored callback at most once; results for unknown tokens are
	/// dropped. Returns `true` while other requests are still pending, so the
	/// host knows whether to keep listening for permission results.
	pub fn deliver_result(&self, token: RequestToken, granted: bool, rationale_shown_now: bool) -> bool {
		let (request, remaining) = {
			let mut pending = self.pending.lock();
			let request = pending.remove(&token);
			(request, !pending.is_empty())
		};

		match request {
			Some(request) => {
				debug!(target = "fv.permission", %token, granted, rationale_shown_now, "permission result delivered");
				request.resolve(granted, rationale_shown_now);
			}
			None => {
				debug!(target = "fv.permission", %token, "dropping result for unknown permission token");
			}
		}

		remaining
	}

	/// Number of prompts still awaiting a result.
	pub fn pending_count(&self) -> usize {
		self.pending.lock().len()
	}

	pub fn is_pending(&self, token: RequestToken) -> bool {
		self.pending.lock().contains_key(&token)
	}

	// Skips tokens still outstanding after the counter wraps.
	fn allocate_token(&self, pending: &HashMap<RequestToken, PendingPermissionRequest>) -> RequestToken {
		loop {
			let token = RequestToken(self.next_token.fetch_add(1, Ordering::SeqCst));
			if !pending.contains_key(&token) {
				return token;
			}
		}
	}
}
