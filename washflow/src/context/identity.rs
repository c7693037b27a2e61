//! Run identity for tracking pipeline executions.

use crate::utils::{generate_uuid, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a pipeline run for logs, events and the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// The unique ID for this pipeline run.
    pub run_id: Uuid,

    /// The caller's request ID, when it has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,

    /// When the run was accepted.
    pub started_at: Timestamp,
}

impl RunIdentity {
    /// Creates a new run identity with a generated run ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_run_id(generate_uuid())
    }

    /// Creates a run identity with a specific run ID.
    #[must_use]
    pub fn with_run_id(run_id: Uuid) -> Self {
        Self {
            run_id,
            request_id: None,
            started_at: chrono::Utc::now(),
        }
    }

    /// Sets the request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Returns the run ID as a string.
    #[must_use]
    pub fn run_id_str(&self) -> String {
        self.run_id.to_string()
    }

    /// Returns correlation fields for event payloads.
    #[must_use]
    pub fn to_fields(&self) -> serde_json::Value {
        serde_json::json!({
            "run_id": self.run_id.to_string(),
            "request_id": self.request_id.map(|id| id.to_string()),
        })
    }
}

impl Default for RunIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_identity_new() {
        let a = RunIdentity::new();
        let b = RunIdentity::new();
        assert_ne!(a.run_id, b.run_id);
        assert!(a.request_id.is_none());
    }

    #[test]
    fn test_run_identity_fields() {
        let request_id = Uuid::new_v4();
        let identity = RunIdentity::new().with_request_id(request_id);
        let fields = identity.to_fields();

        assert_eq!(fields["run_id"], identity.run_id_str());
        assert_eq!(fields["request_id"], request_id.to_string());
        assert!(RunIdentity::new().to_fields()["request_id"].is_null());
    }

    #[test]
    fn test_run_identity_serialization() {
        let identity = RunIdentity::new();
        let json = serde_json::to_string(&identity).unwrap();
        assert!(!json.contains("request_id"));
        let back: RunIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, identity);
    }
}
