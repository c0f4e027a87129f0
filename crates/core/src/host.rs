//! Host platform seam: foreground activity and runtime permission prompts.

use crate::error::Result;
use crate::permission::{Permission, RequestToken};

/// Capabilities the embedding platform provides to the coordinator.
///
/// Permission results are not returned from [`Host::request_permission`];
/// the platform delivers them later through
/// [`PermissionBroker::deliver_result`](crate::permission::PermissionBroker::deliver_result)
/// tagged with the same token. Implementations may deliver synchronously
/// from inside `request_permission`.
pub trait Host: Send + Sync {
	/// Returns `true` when an activity is in the foreground and able to host prompts.
	fn has_foreground_activity(&self) -> bool;

	/// Whether the platform would currently show a rationale before prompting for `permission`.
	fn should_show_rationale(&self, permission: Permission) -> Result<bool>;

	/// Shows the OS permission prompt for `permission`, tagged with `token`.
	fn request_permission(&self, permission: Permission, token: RequestToken) -> Result<()>;
}
