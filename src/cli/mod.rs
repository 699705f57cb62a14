//! CLI argument parsing for parley.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parley: mention-driven multi-agent discussion for GitHub Issues.
///
/// Several agent personas read an issue, answer in a structured format and
/// wake each other with `@mentions`:
/// - Responses are normalized into Summary / Key Findings / Recommended Actions
/// - Mentions are policed against a trust policy before any agent is woken
/// - The summarizer may close the issue by writing `[CLOSE]`
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for parley.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run agents on an issue in parallel.
    ///
    /// Fetches the issue and its comments, runs every named agent on the
    /// same context, then post-processes each answer.
    Execute(ExecuteArgs),

    /// Run the full review roster on an issue.
    ///
    /// Equivalent to `execute` with moderator, reviewer_a, reviewer_b and
    /// summarizer.
    Review(ReviewArgs),

    /// Post-process an existing agent response.
    ///
    /// Reads the response from a file or stdin, normalizes it and
    /// dispatches its mentions.
    Process(ProcessArgs),

    /// Ask the observer whether an issue needs an agent.
    ///
    /// With `--post`, the observer's trigger comment is posted and the
    /// chosen agent is woken.
    Observe(ObserveArgs),

    /// Run the observer on several issues in parallel.
    ObserveBatch(ObserveBatchArgs),

    /// List configured agents and the observer's agent matrix.
    ListAgents,
}

/// Arguments for the `execute` command.
#[derive(Parser, Debug)]
pub struct ExecuteArgs {
    /// Issue number.
    #[arg(long)]
    pub issue: u64,

    /// Agents to run: comma-separated, space-separated, or a JSON array.
    #[arg(long)]
    pub agents: String,

    /// Post each answer as an issue comment.
    #[arg(long)]
    pub post: bool,

    /// Do not wake mentioned agents.
    #[arg(long)]
    pub no_dispatch: bool,
}

/// Arguments for the `review` command.
#[derive(Parser, Debug)]
pub struct ReviewArgs {
    /// Issue number.
    #[arg(long)]
    pub issue: u64,

    /// Post each answer as an issue comment.
    #[arg(long)]
    pub post: bool,

    /// Do not wake mentioned agents.
    #[arg(long)]
    pub no_dispatch: bool,
}

/// Arguments for the `process` command.
#[derive(Parser, Debug)]
pub struct ProcessArgs {
    /// Agent that wrote the response.
    #[arg(long)]
    pub agent: String,

    /// Issue number the response belongs to.
    #[arg(long)]
    pub issue: u64,

    /// Response file; stdin when omitted.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Do not wake mentioned agents.
    #[arg(long)]
    pub no_dispatch: bool,

    /// Print the processed response as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `observe` command.
#[derive(Parser, Debug)]
pub struct ObserveArgs {
    /// Issue number.
    #[arg(long)]
    pub issue: u64,

    /// Post the trigger comment and wake the chosen agent.
    #[arg(long)]
    pub post: bool,

    /// Post the trigger comment without waking the agent.
    #[arg(long)]
    pub no_dispatch: bool,
}

/// Arguments for the `observe-batch` command.
#[derive(Parser, Debug)]
pub struct ObserveBatchArgs {
    /// Comma-separated issue numbers (e.g. "12,15,20").
    #[arg(long)]
    pub issues: String,

    /// Post trigger comments and wake the chosen agents.
    #[arg(long)]
    pub post: bool,

    /// Post trigger comments without waking the agents.
    #[arg(long)]
    pub no_dispatch: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
