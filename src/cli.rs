//! CLI definitions for Concord.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use concord_protocols::{AutonomyLevel, CoordinationPattern};

/// Concord CLI.
#[derive(Parser)]
#[command(name = "concord")]
#[command(about = "Durable workflows and governed multi-agent orchestration")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.concord/config.toml)
    #[arg(short, long, global = true, env = "CONCORD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Load and validate the configuration
    Validate,

    /// Run the three-step demonstration workflow
    RunDemo {
        /// Workflow ID (default: generated)
        #[arg(long)]
        id: Option<String>,

        /// Make the middle step fail on every attempt
        #[arg(long)]
        fail_middle: bool,
    },

    /// Resume a demonstration workflow from its checkpoints
    ResumeDemo {
        /// Workflow ID
        workflow_id: String,
    },

    /// List the checkpoint chain of a workflow
    Checkpoints {
        /// Workflow ID
        workflow_id: String,
    },

    /// Delete the checkpoint chain of a workflow
    Purge {
        /// Workflow ID
        workflow_id: String,
    },

    /// Run a task through the orchestration engine against in-process agents
    Task {
        /// Coordination pattern
        #[arg(long, value_enum, default_value = "parallel")]
        pattern: PatternArg,

        /// Task goal
        #[arg(long)]
        goal: String,

        /// Agent types to involve (repeatable)
        #[arg(long = "agent", default_values = ["analyst", "reviewer"])]
        agents: Vec<String>,

        /// Autonomy level for the registered agents
        #[arg(long, value_enum, default_value = "semi-autonomous")]
        autonomy: AutonomyArg,

        /// Requesting user
        #[arg(long, default_value = "operator")]
        user: String,

        /// Task context entries as key=value (repeatable)
        #[arg(long = "context", value_parser = parse_key_value)]
        context: Vec<(String, String)>,

        /// Approve every approval request instead of denying
        #[arg(long)]
        approve: bool,

        /// Swarm round in which the echo agents emit the convergence marker
        #[arg(long, default_value_t = 2)]
        converge_after: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum PatternArg {
    Parallel,
    Hierarchical,
    Competitive,
    Swarm,
}

impl From<PatternArg> for CoordinationPattern {
    fn from(arg: PatternArg) -> Self {
        match arg {
            PatternArg::Parallel => CoordinationPattern::Parallel,
            PatternArg::Hierarchical => CoordinationPattern::Hierarchical,
            PatternArg::Competitive => CoordinationPattern::Competitive,
            PatternArg::Swarm => CoordinationPattern::CollaborativeSwarm,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum AutonomyArg {
    HumanGated,
    SemiAutonomous,
    FullyAutonomous,
}

impl From<AutonomyArg> for AutonomyLevel {
    fn from(arg: AutonomyArg) -> Self {
        match arg {
            AutonomyArg::HumanGated => AutonomyLevel::HumanGated,
            AutonomyArg::SemiAutonomous => AutonomyLevel::SemiAutonomous,
            AutonomyArg::FullyAutonomous => AutonomyLevel::FullyAutonomous,
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("amount=1200").unwrap(),
            ("amount".to_string(), "1200".to_string())
        );
        assert_eq!(parse_key_value("note=a=b").unwrap().1, "a=b");
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_task_command_parses() {
        let cli = Cli::try_parse_from([
            "concord",
            "task",
            "--pattern",
            "swarm",
            "--goal",
            "plan launch",
            "--agent",
            "planner",
            "--context",
            "amount=10",
        ])
        .unwrap();
        match cli.command {
            Commands::Task {
                pattern,
                agents,
                context,
                ..
            } => {
                assert_eq!(CoordinationPattern::from(pattern), CoordinationPattern::CollaborativeSwarm);
                assert_eq!(agents, vec!["planner".to_string()]);
                assert_eq!(context.len(), 1);
            }
            _ => panic!("expected task command"),
        }
    }
}
