//! Parallel agent runner.
//!
//! Fans one prompt out to several agents and collects every result. Each agent
//! runs in its own future that owns its result slot; the futures are polled
//! together on the calling task and the result map is built once, after all of
//! them have finished. A failure, timeout or panic in one agent becomes that
//! agent's [`AgentOutcome::Failed`] and never disturbs the others.

use super::backend::AgentBackend;
use super::config::AgentsConfig;
use super::name::AgentName;
use futures::FutureExt;
use futures::future::join_all;
use serde::Serialize;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// What one agent produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AgentOutcome {
    Completed { response: String },
    Failed { error: String },
}

impl AgentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AgentOutcome::Completed { .. })
    }

    /// The response text, when the agent completed.
    pub fn response(&self) -> Option<&str> {
        match self {
            AgentOutcome::Completed { response } => Some(response),
            AgentOutcome::Failed { .. } => None,
        }
    }
}

/// Outcomes of one parallel run, keyed by agent.
///
/// The key set always equals the set of requested agents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub outcomes: BTreeMap<AgentName, AgentOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn get(&self, agent: &str) -> Option<&AgentOutcome> {
        AgentName::parse(agent).and_then(|name| self.outcomes.get(&name))
    }
}

/// Runs agents concurrently against one backend.
pub struct AgentRunner<'a> {
    backend: &'a dyn AgentBackend,
    agents: AgentsConfig,
}

impl<'a> AgentRunner<'a> {
    /// # Arguments
    ///
    /// * `backend` - Backend every agent is invoked through
    /// * `agents` - Prompt template and per-agent timeouts
    pub fn new(backend: &'a dyn AgentBackend, agents: AgentsConfig) -> Self {
        Self { backend, agents }
    }

    /// Run every agent in `agents` on the same issue context.
    ///
    /// Duplicate names run once. The prompt for each agent is the configured
    /// template rendered with `{issue_number}`, `{context}` and `{agent_name}`.
    pub async fn run_parallel(
        &self,
        issue_number: u64,
        agents: &[AgentName],
        context: &str,
    ) -> RunReport {
        let unique: BTreeSet<&AgentName> = agents.iter().collect();
        info!(issue = issue_number, agents = unique.len(), "running agents in parallel");

        let runs = unique
            .into_iter()
            .map(|name| self.run_one(issue_number, name, context));
        let outcomes = join_all(runs).await.into_iter().collect();

        let report = RunReport { outcomes };
        info!(
            issue = issue_number,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "agents finished"
        );
        report
    }

    async fn run_one(
        &self,
        issue_number: u64,
        name: &AgentName,
        context: &str,
    ) -> (AgentName, AgentOutcome) {
        let agent = name.as_str();
        let prompt = match self.agents.render_prompt(issue_number, context, agent) {
            Ok(prompt) => prompt,
            Err(e) => {
                error!(agent, error = %e, "prompt template failed");
                return (
                    name.clone(),
                    AgentOutcome::Failed {
                        error: format!("prompt template failed: {}", e),
                    },
                );
            }
        };

        let limit = self.agents.resolve(agent).timeout;
        let started = Instant::now();
        let invocation = AssertUnwindSafe(self.backend.invoke(&prompt, agent)).catch_unwind();

        let outcome = match tokio::time::timeout(limit, invocation).await {
            Ok(Ok(Ok(response))) => AgentOutcome::Completed { response },
            Ok(Ok(Err(e))) => AgentOutcome::Failed {
                error: e.to_string(),
            },
            Ok(Err(panic)) => AgentOutcome::Failed {
                error: format!("agent panicked: {}", panic_message(panic.as_ref())),
            },
            Err(_) => AgentOutcome::Failed {
                error: format!("timed out after {}", format_duration(limit)),
            },
        };

        match &outcome {
            AgentOutcome::Completed { response } => info!(
                agent,
                elapsed_ms = started.elapsed().as_millis() as u64,
                chars = response.chars().count(),
                "agent completed"
            ),
            AgentOutcome::Failed { error } => warn!(agent, error = %error, "agent failed"),
        }

        (name.clone(), outcome)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
