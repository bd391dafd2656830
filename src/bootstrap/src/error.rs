//! The uniform failure object threaded through every operation.
//!
//! `reason` is a short, stable, user-facing category; `detail` says what was
//! attempted and what failed; `fix_methods` is actionable remediation text.
//! Parameter errors, transport errors, and judgement failures all surface
//! through this shape with different reason text, so callers can branch on
//! category without parsing the detail.

use serde::{Deserialize, Serialize};

/// Default remediation text applied when an operation has nothing more
/// specific to suggest.
pub const DEFAULT_FIX_METHODS: &str =
    "Inspect the captured log and retry the operation; file an issue if the failure persists.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredError {
    pub reason: String,
    pub detail: String,
    pub fix_methods: String,
    /// References captured raw output stored by the caller, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_id: Option<String>,
}

impl StructuredError {
    pub fn new(reason: impl Into<String>, detail: impl Into<String>) -> Self {
        StructuredError {
            reason: reason.into(),
            detail: detail.into(),
            fix_methods: DEFAULT_FIX_METHODS.to_string(),
            log_id: None,
        }
    }

    pub fn with_fix(mut self, fix_methods: impl Into<String>) -> Self {
        self.fix_methods = fix_methods.into();
        self
    }

    pub fn with_log_id(mut self, log_id: impl Into<String>) -> Self {
        self.log_id = Some(log_id.into());
        self
    }

    /// Category for malformed or missing caller input.
    pub fn invalid_parameter(detail: impl Into<String>) -> Self {
        StructuredError::new("input parameter invalid", detail)
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.reason, self.detail)
    }
}

impl std::error::Error for StructuredError {}
