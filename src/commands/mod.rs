//! Command implementations for parley.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the workspace loading every command shares.

mod execute;
mod list_agents;
mod observe;
mod process;

pub use execute::{IssueRun, IssueRunReport, REVIEW_ROSTER, RunOptions, parse_agents_arg};
pub use observe::{ObserveBatchReport, ObserveReport, ObserveRun, parse_issue_numbers};

use crate::agent::AgentsConfig;
use crate::cli::Command;
use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::error::Result;
use tracing::debug;

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. Each command
/// is routed to its handler function.
pub async fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Execute(args) => execute::cmd_execute(args).await,
        Command::Review(args) => execute::cmd_review(args).await,
        Command::Process(args) => process::cmd_process(args).await,
        Command::Observe(args) => observe::cmd_observe(args).await,
        Command::ObserveBatch(args) => observe::cmd_observe_batch(args).await,
        Command::ListAgents => list_agents::cmd_list_agents(),
    }
}

/// Configuration loaded from the workspace.
struct Workspace {
    ctx: WorkspaceContext,
    config: &'static Config,
    agents: AgentsConfig,
}

impl Workspace {
    /// Resolve `.parley/` from the working directory and load its files.
    fn load() -> Result<Self> {
        let ctx = WorkspaceContext::resolve()?;
        if !ctx.exists() {
            debug!(root = %ctx.root.display(), "no .parley directory, using defaults");
        }

        let config = Config::load_shared(ctx.config_path())?;
        let agents = AgentsConfig::load(ctx.agents_path())?;

        Ok(Self {
            ctx,
            config,
            agents,
        })
    }
}
