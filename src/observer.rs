//! Observer agent.
//!
//! The observer reads an issue and decides whether one of the roster agents
//! should join the discussion. It answers in prose and ends with a YAML
//! decision block:
//!
//! ```yaml
//! should_trigger: true
//! agent: moderator
//! comment: "@moderator please triage this issue."
//! reason: "New issue with no discussion yet"
//! ```
//!
//! Several issues can be observed at once; each issue gets its own observer
//! run and a failure on one never affects the others.

use crate::agent::{AgentBackend, AgentName, AgentOutcome, AgentRunner, AgentsConfig};
use crate::error::{ParleyError, Result};
use crate::mention::normalize_mention;
use crate::scan;
use crate::tracker::Issue;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Name the observer runs under. Its persona lives in `prompts/observer.md`.
pub const OBSERVER_AGENT: &str = "observer";

/// Shown in the agent matrix for agents without trigger conditions.
const AUTO_DETECT: &str = "auto-detect";

const DECISION_INSTRUCTIONS: &str = "Decide whether one of the agents above should be woken for this issue. \
Explain your analysis, then end your reply with exactly one YAML block:

```yaml
should_trigger: true
agent: <agent name>
comment: \"@<agent name> <what you ask of it>\"
reason: \"<one line>\"
```

Use `should_trigger: false` with a `reason` when no agent is needed.";

/// What the observer decided for one issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverDecision {
    pub should_trigger: bool,
    /// Agent to wake. Always a roster agent when `should_trigger` is set.
    pub agent: Option<String>,
    /// Comment announcing the wake-up.
    pub comment: Option<String>,
    pub reason: String,
    /// The observer's reasoning: the `analysis` field, or the prose before the block.
    pub analysis: String,
}

impl ObserverDecision {
    /// Read the decision block at the end of an observer reply.
    ///
    /// Never fails. A reply without a readable block, or one naming an agent
    /// outside `agents`, becomes a decision not to trigger with the problem
    /// as its reason.
    pub fn parse(reply: &str, agents: &AgentsConfig) -> Self {
        let Some(block) = scan::last_yaml_block(reply) else {
            return Self::declined("observer reply has no decision block", reply.trim());
        };
        let prose = reply[..block.start].trim();

        let mut decision = match serde_yaml::from_str::<ObserverDecision>(block.body) {
            Ok(decision) => decision,
            Err(e) => {
                debug!(error = %e, "observer decision block did not parse");
                return Self::declined(&format!("decision block is invalid: {}", e), prose);
            }
        };

        if decision.analysis.trim().is_empty() {
            decision.analysis = prose.to_string();
        }
        decision.agent = decision.agent.as_deref().and_then(normalize_mention);
        decision.comment = decision
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        if !decision.should_trigger {
            return decision;
        }

        let Some(agent) = decision.agent.clone() else {
            return decision.demoted("no agent named".to_string());
        };
        if agent == OBSERVER_AGENT || !agents.agents.contains_key(&agent) {
            return decision.demoted(format!("unknown agent '{}'", agent));
        }
        if decision.comment.is_none() {
            decision.comment = Some(format!("@{} {}", agent, decision.reason).trim_end().to_string());
        }
        decision
    }

    fn declined(reason: &str, analysis: &str) -> Self {
        Self {
            reason: reason.to_string(),
            analysis: analysis.to_string(),
            ..Default::default()
        }
    }

    fn demoted(mut self, reason: String) -> Self {
        warn!(reason = %reason, "observer asked for a trigger it cannot have");
        self.should_trigger = false;
        self.reason = reason;
        self
    }
}

/// Observer result for one issue.
#[derive(Debug)]
pub struct Observation {
    pub issue_number: u64,
    pub outcome: Result<ObserverDecision>,
}

/// Markdown table of the roster for the observer: name, description and
/// when to wake each agent.
pub fn agent_matrix(agents: &AgentsConfig) -> String {
    let mut table = String::from("| Agent | Description | Trigger conditions |\n|---|---|---|\n");
    for (name, profile) in agents.iter().filter(|(name, _)| *name != OBSERVER_AGENT) {
        let conditions = if profile.trigger_conditions.is_empty() {
            AUTO_DETECT.to_string()
        } else {
            profile.trigger_conditions.join("; ")
        };
        table.push_str(&format!(
            "| {} | {} | {} |\n",
            name,
            cell(&profile.description),
            cell(&conditions)
        ));
    }
    table
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Context handed to the observer: the issue, the roster and the decision format.
pub fn observer_context(issue: &Issue, agents: &AgentsConfig) -> String {
    format!(
        "{}\n\n**Available agents**:\n\n{}\n{}",
        issue.prompt_context(),
        agent_matrix(agents),
        DECISION_INSTRUCTIONS
    )
}

/// Runs the observer through an [`AgentBackend`].
pub struct Observer<'a> {
    runner: AgentRunner<'a>,
    agents: &'a AgentsConfig,
    name: AgentName,
}

impl<'a> Observer<'a> {
    pub fn new(backend: &'a dyn AgentBackend, agents: &'a AgentsConfig) -> Result<Self> {
        let name = AgentName::parse(OBSERVER_AGENT).ok_or_else(|| {
            ParleyError::ConfigError(format!("invalid observer name '{}'", OBSERVER_AGENT))
        })?;
        Ok(Self {
            runner: AgentRunner::new(backend, agents.clone()),
            agents,
            name,
        })
    }

    /// Ask the observer about one issue.
    ///
    /// # Returns
    ///
    /// * `Ok(ObserverDecision)` - The observer answered
    /// * `Err(ParleyError::BackendError)` - The observer failed or timed out
    pub async fn observe(&self, issue: &Issue) -> Result<ObserverDecision> {
        let context = observer_context(issue, self.agents);
        let mut report = self
            .runner
            .run_parallel(issue.number, std::slice::from_ref(&self.name), &context)
            .await;

        match report.outcomes.remove(&self.name) {
            Some(AgentOutcome::Completed { response }) => {
                let decision = ObserverDecision::parse(&response, self.agents);
                info!(
                    issue = issue.number,
                    should_trigger = decision.should_trigger,
                    agent = decision.agent.as_deref().unwrap_or("-"),
                    "observer decided"
                );
                Ok(decision)
            }
            Some(AgentOutcome::Failed { error }) => Err(ParleyError::BackendError(format!(
                "observer failed on issue #{}: {}",
                issue.number, error
            ))),
            None => Err(ParleyError::BackendError(format!(
                "observer produced no result for issue #{}",
                issue.number
            ))),
        }
    }

    /// Observe every issue concurrently. Results keep the order of `issues`.
    pub async fn observe_batch(&self, issues: &[Issue]) -> Vec<Observation> {
        info!(issues = issues.len(), "observing issues in parallel");
        let runs = issues.iter().map(|issue| async move {
            Observation {
                issue_number: issue.number,
                outcome: self.observe(issue).await,
            }
        });
        join_all(runs).await
    }
}
