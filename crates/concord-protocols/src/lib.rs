//! # Concord Protocols
//!
//! Port definitions (traits) and the shared data model consumed by the
//! workflow executor and the orchestration engine. Contains only interface
//! definitions and plain data - implementations live behind the ports.
//!
//! ## Ports
//!
//! - [`AgentRuntimeAdapter`] - Executes one agent's task logic
//! - [`AgentKnowledgeRepository`] - Durable per-agent knowledge
//! - [`ApprovalAdapter`] - Human approval for gated autonomy levels
//! - [`NormativeAgencyPort`] / [`InformationEthicsPort`] - Ethics review
//! - [`GovernancePort`] - Policy listing and evaluation
//! - [`NotificationPort`] - Compliance alerts

pub mod agent;
pub mod approval;
pub mod error;
pub mod ethics;
pub mod governance;
pub mod notification;
pub mod types;

pub use agent::{
    AgentContribution, AgentDefinition, AgentExecutionRequest, AgentExecutionResponse,
    AgentKnowledgeRepository, AgentOutput, AgentRuntimeAdapter, AgentTask, AutonomyLevel,
    CoordinationPattern, Delegation, KnowledgeEntry, ResponseOutcome,
};
pub use approval::{ApprovalAdapter, ApprovalDecision, ApprovalRequest};
pub use error::{AgentError, PortError};
pub use ethics::{
    ActionProposal, DignityAssessment, InformationEthicsPort, NormativeAgencyPort,
    NormativeAssessment,
};
pub use governance::{GovernancePort, PolicyEvaluation, PolicyRecord, PolicyRule};
pub use notification::{Notification, NotificationPort, NotificationPriority};
pub use types::ContextMap;
