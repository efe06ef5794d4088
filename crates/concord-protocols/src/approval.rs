//! Human approval port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AutonomyLevel;
use crate::error::PortError;

/// Request for a human to approve an action before it commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub task_id: Uuid,
    pub requesting_user: String,
    pub goal: String,
    pub agent_types: Vec<String>,
    /// Effective autonomy level that triggered the request.
    pub autonomy: AutonomyLevel,
}

/// A human's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub approved: bool,
    #[serde(default)]
    pub approver: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ApprovalDecision {
    pub fn approve(approver: impl Into<String>) -> Self {
        Self {
            approved: true,
            approver: Some(approver.into()),
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            approver: None,
            reason: Some(reason.into()),
        }
    }
}

#[async_trait]
pub trait ApprovalAdapter: Send + Sync {
    async fn request_approval(&self, request: &ApprovalRequest)
    -> Result<ApprovalDecision, PortError>;
}
