//! Workflow-dispatch trigger.
//!
//! Comments posted by a bot token do not start workflows, so a mentioned
//! agent is woken explicitly with `gh workflow run`.

use super::{AgentTrigger, TriggerError, TriggerRequest};
use crate::config::Config;
use crate::gh::{run_gh, with_repo};
use async_trait::async_trait;

/// Trigger starting a `workflow_dispatch` run per woken agent.
///
/// The workflow receives `agent`, `issue_number`, `issue_title` and `cascade`
/// inputs; it should export `cascade` as `PARLEY_CASCADE` for the run.
#[derive(Debug, Clone)]
pub struct WorkflowTrigger {
    workflow: String,
    git_ref: Option<String>,
    repository: Option<String>,
}

impl WorkflowTrigger {
    pub fn new(workflow: String, git_ref: Option<String>, repository: Option<String>) -> Self {
        Self {
            workflow,
            git_ref,
            repository,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.trigger.workflow.clone(),
            config.trigger.git_ref.clone(),
            config.repository.clone(),
        )
    }

    pub(super) fn args(&self, request: &TriggerRequest) -> Vec<String> {
        let mut args = vec!["workflow".to_string(), "run".to_string(), self.workflow.clone()];
        if let Some(git_ref) = &self.git_ref {
            args.push("--ref".to_string());
            args.push(git_ref.clone());
        }
        for (key, value) in [
            ("agent", request.agent.clone()),
            ("issue_number", request.issue_number.to_string()),
            ("issue_title", request.issue_title.clone()),
            ("cascade", request.cascade.to_string()),
        ] {
            args.push("-f".to_string());
            args.push(format!("{}={}", key, value));
        }
        with_repo(args, self.repository.as_deref())
    }
}

#[async_trait]
impl AgentTrigger for WorkflowTrigger {
    async fn trigger(&self, request: &TriggerRequest) -> Result<(), TriggerError> {
        run_gh(&self.args(request), None).await?;
        Ok(())
    }
}
