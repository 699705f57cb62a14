//! In-memory collaborators shared by unit tests.

use crate::agent::{AgentBackend, BackendError};
use crate::dispatch::{AgentTrigger, TriggerError, TriggerRequest};
use crate::error::{ParleyError, Result};
use crate::tracker::{Issue, IssueTracker};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};
use std::time::Duration;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

// ============================================================================
// Agent backend
// ============================================================================

/// Scripted answer of a [`FakeBackend`] agent.
#[derive(Debug, Clone)]
pub(crate) enum FakeReply {
    Text(String),
    Fail(String),
    Panic,
    /// Never answers within any reasonable timeout.
    Hang,
}

impl FakeReply {
    pub(crate) fn text(text: &str) -> Self {
        FakeReply::Text(text.to_string())
    }

    pub(crate) fn fail(message: &str) -> Self {
        FakeReply::Fail(message.to_string())
    }
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    replies: HashMap<String, FakeReply>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(mut self, agent: &str, reply: FakeReply) -> Self {
        self.replies.insert(agent.to_string(), reply);
        self
    }

    /// `(agent, prompt)` pairs in call order.
    pub(crate) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentBackend for FakeBackend {
    async fn invoke(&self, prompt: &str, agent: &str) -> std::result::Result<String, BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push((agent.to_string(), prompt.to_string()));

        match self.replies.get(agent) {
            Some(FakeReply::Text(text)) => Ok(text.clone()),
            Some(FakeReply::Fail(message)) => Err(BackendError::Other(message.clone())),
            Some(FakeReply::Panic) => panic!("scripted panic for {}", agent),
            Some(FakeReply::Hang) => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Ok(String::new())
            }
            None => Err(BackendError::Other(format!("unknown agent '{}'", agent))),
        }
    }
}

// ============================================================================
// Trigger
// ============================================================================

#[derive(Default)]
pub(crate) struct FakeTrigger {
    failing: HashSet<String>,
    requests: Mutex<Vec<TriggerRequest>>,
}

impl FakeTrigger {
    /// A trigger rejecting requests for the named agents.
    pub(crate) fn failing_for(agents: &[&str]) -> Self {
        Self {
            failing: agents.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Every request received, including rejected ones.
    pub(crate) fn requests(&self) -> Vec<TriggerRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentTrigger for FakeTrigger {
    async fn trigger(&self, request: &TriggerRequest) -> std::result::Result<(), TriggerError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.failing.contains(&request.agent) {
            return Err(TriggerError::Rejected {
                agent: request.agent.clone(),
                message: "workflow not found".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Issue tracker
// ============================================================================

#[derive(Default)]
pub(crate) struct FakeTracker {
    issue: Issue,
    fail: bool,
    missing: HashSet<u64>,
    comments: Mutex<Vec<(u64, String)>>,
    closed: Mutex<Vec<u64>>,
}

impl FakeTracker {
    /// A tracker whose every operation fails.
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// A tracker serving `issue` for any number.
    pub(crate) fn with_issue(issue: Issue) -> Self {
        Self {
            issue,
            ..Default::default()
        }
    }

    /// Issues that cannot be read; other numbers still work.
    pub(crate) fn without(mut self, numbers: &[u64]) -> Self {
        self.missing.extend(numbers);
        self
    }

    pub(crate) fn comments(&self) -> Vec<(u64, String)> {
        self.comments.lock().unwrap().clone()
    }

    pub(crate) fn closed(&self) -> Vec<u64> {
        self.closed.lock().unwrap().clone()
    }

    fn check(&self, operation: &str, number: u64) -> Result<()> {
        if self.fail {
            return Err(ParleyError::TrackerError(format!(
                "{} #{} failed: HTTP 502",
                operation, number
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn read_issue(&self, number: u64) -> Result<Issue> {
        self.check("read", number)?;
        if self.missing.contains(&number) {
            return Err(ParleyError::TrackerError(format!(
                "issue #{} not found",
                number
            )));
        }
        Ok(Issue {
            number,
            ..self.issue.clone()
        })
    }

    async fn post_comment(&self, number: u64, body: &str) -> Result<()> {
        self.check("comment on", number)?;
        self.comments
            .lock()
            .unwrap()
            .push((number, body.to_string()));
        Ok(())
    }

    async fn close_issue(&self, number: u64) -> Result<()> {
        self.check("close", number)?;
        self.closed.lock().unwrap().push(number);
        Ok(())
    }
}
