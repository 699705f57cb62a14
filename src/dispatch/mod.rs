//! Mention dispatch.
//!
//! Wakes the agents a response asked for. Mentions are read from the
//! response's machine block only, so prose such as "you could ask @someone"
//! never wakes anyone. Each allowed mention gets exactly one trigger call;
//! calls run one after another and a failed call is recorded as `false`
//! without stopping the rest.

mod cascade;
mod workflow;


pub use cascade::{CASCADE_ENV, Cascade};
pub use workflow::WorkflowTrigger;

use crate::gh::GhError;
use crate::mention::{MentionPolicy, extract_machine_mentions};
use crate::tracker::Issue;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, info, warn};

/// Request to wake one agent on one issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRequest {
    pub agent: String,
    pub issue_number: u64,
    pub issue_title: String,
    pub issue_body: String,
    /// Chain the woken agent inherits.
    pub cascade: Cascade,
}

/// Errors raised by a trigger.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error(transparent)]
    Gh(#[from] GhError),

    #[error("trigger for '{agent}' was rejected: {message}")]
    Rejected { agent: String, message: String },
}

/// Wakes a named agent for an issue.
#[async_trait]
pub trait AgentTrigger: Send + Sync {
    async fn trigger(&self, request: &TriggerRequest) -> Result<(), TriggerError>;
}

/// Result of dispatching one response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// One entry per allowed mention: whether its trigger succeeded.
    pub outcomes: BTreeMap<String, bool>,
    pub allowed: Vec<String>,
    pub filtered: Vec<String>,
}

/// Applies the mention policy and cascade guard, then triggers.
pub struct Dispatcher<'a> {
    trigger: &'a dyn AgentTrigger,
    policy: &'a MentionPolicy,
    cascade: Cascade,
    max_depth: usize,
}

impl<'a> Dispatcher<'a> {
    /// A dispatcher outside any cascade, with the default depth limit.
    pub fn new(trigger: &'a dyn AgentTrigger, policy: &'a MentionPolicy) -> Self {
        Self {
            trigger,
            policy,
            cascade: Cascade::default(),
            max_depth: crate::config::types::default_cascade_max_depth(),
        }
    }

    /// Continue an existing cascade, stopping once it holds `max_depth` agents.
    pub fn with_cascade(mut self, cascade: Cascade, max_depth: usize) -> Self {
        self.cascade = cascade;
        self.max_depth = max_depth;
        self
    }

    /// Dispatch the mentions in `text`, written by `emitter` on `issue`.
    ///
    /// Never fails: zero mentions give an empty report and trigger errors are
    /// recorded as `false`.
    pub async fn dispatch(&self, text: &str, emitter: &str, issue: &Issue) -> DispatchReport {
        self.dispatch_mentions(extract_machine_mentions(text), emitter, issue)
            .await
    }

    /// Dispatch an explicit list of mentions made by `emitter` on `issue`.
    ///
    /// Applies the same cascade guard and mention policy as [`Dispatcher::dispatch`].
    pub async fn dispatch_mentions(
        &self,
        mentions: Vec<String>,
        emitter: &str,
        issue: &Issue,
    ) -> DispatchReport {
        if mentions.is_empty() {
            info!(agent = emitter, issue = issue.number, "no mentions to dispatch");
            return DispatchReport::default();
        }

        let chain = self.cascade.extended(emitter);
        if chain.depth() >= self.max_depth {
            warn!(
                agent = emitter,
                issue = issue.number,
                cascade = %chain,
                max_depth = self.max_depth,
                "cascade depth reached, not dispatching"
            );
            return DispatchReport {
                filtered: mentions,
                ..Default::default()
            };
        }

        let partition = self.policy.partition(&mentions, Some(emitter), chain.members());
        if !partition.filtered.is_empty() {
            info!(agent = emitter, filtered = ?partition.filtered, "mentions filtered");
        }

        let mut outcomes = BTreeMap::new();
        for agent in &partition.allowed {
            let request = TriggerRequest {
                agent: agent.clone(),
                issue_number: issue.number,
                issue_title: issue.title.clone(),
                issue_body: issue.body.clone(),
                cascade: chain.clone(),
            };
            let ok = match self.trigger.trigger(&request).await {
                Ok(()) => {
                    info!(agent = %agent, issue = issue.number, cascade = %chain, "agent triggered");
                    true
                }
                Err(e) => {
                    error!(agent = %agent, issue = issue.number, error = %e, "trigger failed");
                    false
                }
            };
            outcomes.insert(agent.clone(), ok);
        }

        DispatchReport {
            outcomes,
            allowed: partition.allowed,
            filtered: partition.filtered,
        }
    }
}
