//! Agent execution subsystem.
//!
//! - **Config**: the agent roster and prompt template (`agents.yaml`)
//! - **Backend**: text-in, text-out access to one agent
//! - **Runner**: parallel fan-out over several agents with per-agent isolation
//!
//! Agents run as subprocesses with configurable command templates, so any
//! CLI-based model tool can play a persona.

mod config;
mod name;
mod template;

pub mod backend;
pub mod runner;

// Re-export public API
pub use backend::{AgentBackend, BackendError, CommandBackend};
pub use config::{
    AgentDefaults, AgentProfile, AgentsConfig, DEFAULT_PROMPT_TEMPLATE, OutputFormat,
    ResolvedAgent,
};
pub use name::AgentName;
pub use runner::{AgentOutcome, AgentRunner, RunReport};
pub use template::{TemplateError, render_template, vars};
