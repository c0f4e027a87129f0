//! Identity-service enrollment response shape.

use serde::{Deserialize, Serialize};

/// Response returned by the identity service for an uploaded face scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
	#[serde(default)]
	pub success: bool,
	/// Server-provided failure message, shown to the user when present.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub enrollment_result: Option<EnrollmentResult>,
}

impl EnrollmentResponse {
	pub fn succeeded() -> Self {
		Self {
			success: true,
			..Default::default()
		}
	}

	pub fn is_success(&self) -> bool {
		self.success && self.error.is_none()
	}

	/// Failure flags, defaulting every unknown check to "not an issue".
	pub fn issues(&self) -> EnrollmentIssues {
		let result = self.enrollment_result.as_ref();
		EnrollmentIssues {
			duplicate: result.and_then(|r| r.is_duplicate) == Some(true),
			not_match: result.and_then(|r| r.is_not_match) == Some(true),
			not_live: result.and_then(|r| r.is_live) == Some(false),
			enrolled: result.and_then(|r| r.is_enrolled) == Some(true),
		}
	}
}

/// Per-check verdicts. Absent fields mean the service did not evaluate that check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResult {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub is_duplicate: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub is_not_match: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub is_live: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub is_enrolled: Option<bool>,
}

/// Strict interpretation of [`EnrollmentResult`]: a flag is set only when the
/// service explicitly reported the issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrollmentIssues {
	pub duplicate: bool,
	pub not_match: bool,
	pub not_live: bool,
	pub enrolled: bool,
}

impl EnrollmentIssues {
	/// Liveness failed and nothing else did.
	pub fn is_liveness_only(&self) -> bool {
		self.not_live && !self.duplicate && !self.not_match
	}
}
