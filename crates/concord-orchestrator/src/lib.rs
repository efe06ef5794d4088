//! # Concord Orchestrator
//!
//! Routes an [`AgentTask`](concord_protocols::AgentTask) to registered
//! agents under one of the closed set of coordination patterns.
//!
//! Every task passes three gates before any agent runs:
//!
//! 1. **Ethics** - normative-agency and informational-dignity review
//! 2. **Governance** - policy evaluation; violations notify the compliance channel
//! 3. **Approval** - human approval when the selected agents' autonomy requires it
//!
//! Rejections at any gate are ordinary non-success responses, not errors.

pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod patterns;
pub mod registry;

#[cfg(test)]
mod test_support;

pub use config::OrchestratorConfig;
pub use engine::{EnginePorts, OrchestrationEngine};
pub use error::OrchestratorError;
pub use gate::{ApprovalGate, EthicsGate, GovernanceGate, approval_required};
pub use patterns::{CoordinationStrategy, PatternContext, PatternOutcome, strategy_for};
pub use registry::{AgentInstance, AgentRegistry};
