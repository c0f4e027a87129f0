//! Public status vocabulary reported to subscribers.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the external verification SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SdkStatus {
	/// `initialize` was never called, or the device cannot run the SDK.
	NeverInitialized,
	/// Ready to start sessions.
	Initialized,
	/// The license or key material was rejected.
	InvalidDeviceLicenseKeyIdentifier,
	/// The SDK could not reach its licensing backend.
	NetworkIssues,
	/// The device is not supported by the capture engine.
	DeviceNotSupported,
	/// The license has expired or is not valid for this application.
	LicenseExpiredOrInvalid,
}

impl SdkStatus {
	pub fn is_initialized(self) -> bool {
		self == SdkStatus::Initialized
	}
}

impl std::fmt::Display for SdkStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			SdkStatus::NeverInitialized => write!(f, "NeverInitialized"),
			SdkStatus::Initialized => write!(f, "Initialized"),
			SdkStatus::InvalidDeviceLicenseKeyIdentifier => write!(f, "InvalidDeviceLicenseKeyIdentifier"),
			SdkStatus::NetworkIssues => write!(f, "NetworkIssues"),
			SdkStatus::DeviceNotSupported => write!(f, "DeviceNotSupported"),
			SdkStatus::LicenseExpiredOrInvalid => write!(f, "LicenseExpiredOrInvalid"),
		}
	}
}

/// Outcome kind of a single verification session.
///
/// Subscribers receive one of these through `on_failure`; the success case is
/// only ever reported through `on_success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
	SessionCompletedSuccessfully,
	/// The user backed out of the capture UI.
	UserCancelled,
	/// The capture UI timed out waiting for a face.
	Timeout,
	/// Camera permission was not granted.
	CameraPermissionDenied,
	/// The application lost foreground while the capture UI was shown.
	ContextSwitch,
	/// The device was held in a landscape or reversed orientation.
	LandscapeModeNotAllowed,
	/// The identity service rejected the enrollment.
	EnrollmentFailed,
	UnknownInternalError,
}

impl SessionStatus {
	pub fn is_success(self) -> bool {
		self == SessionStatus::SessionCompletedSuccessfully
	}
}

impl std::fmt::Display for SessionStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			SessionStatus::SessionCompletedSuccessfully => write!(f, "SessionCompletedSuccessfully"),
			SessionStatus::UserCancelled => write!(f, "UserCancelled"),
			SessionStatus::Timeout => write!(f, "Timeout"),
			SessionStatus::CameraPermissionDenied => write!(f, "CameraPermissionDenied"),
			SessionStatus::ContextSwitch => write!(f, "ContextSwitch"),
			SessionStatus::LandscapeModeNotAllowed => write!(f, "LandscapeModeNotAllowed"),
			SessionStatus::EnrollmentFailed => write!(f, "EnrollmentFailed"),
			SessionStatus::UnknownInternalError => write!(f, "UnknownInternalError"),
		}
	}
}
