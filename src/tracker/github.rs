//! `gh`-backed issue tracker.

use super::{Issue, IssueComment, IssueTracker};
use crate::error::{ParleyError, Result};
use crate::gh::{GhError, run_gh, with_repo};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

/// Issue tracker driving the GitHub CLI.
#[derive(Debug, Clone, Default)]
pub struct GithubTracker {
    repository: Option<String>,
}

impl GithubTracker {
    /// Create a tracker scoped to `repository` (`owner/repo`), or to the
    /// current checkout's repository when `None`.
    pub fn new(repository: Option<String>) -> Self {
        Self { repository }
    }

    fn args(&self, args: &[&str]) -> Vec<String> {
        with_repo(
            args.iter().map(|a| a.to_string()).collect(),
            self.repository.as_deref(),
        )
    }

    pub(super) fn view_args(&self, number: u64) -> Vec<String> {
        self.args(&[
            "issue",
            "view",
            &number.to_string(),
            "--json",
            "title,body,comments",
        ])
    }

    pub(super) fn comment_args(&self, number: u64) -> Vec<String> {
        self.args(&["issue", "comment", &number.to_string(), "--body-file", "-"])
    }

    pub(super) fn close_args(&self, number: u64) -> Vec<String> {
        self.args(&["issue", "close", &number.to_string(), "--reason", "completed"])
    }
}

#[async_trait]
impl IssueTracker for GithubTracker {
    async fn read_issue(&self, number: u64) -> Result<Issue> {
        let output = run_gh(&self.view_args(number), None)
            .await
            .map_err(tracker_error)?;
        parse_issue(number, &output.stdout)
    }

    async fn post_comment(&self, number: u64, body: &str) -> Result<()> {
        run_gh(&self.comment_args(number), Some(body))
            .await
            .map_err(tracker_error)?;
        info!(issue = number, chars = body.chars().count(), "comment posted");
        Ok(())
    }

    async fn close_issue(&self, number: u64) -> Result<()> {
        run_gh(&self.close_args(number), None)
            .await
            .map_err(tracker_error)?;
        info!(issue = number, "issue closed");
        Ok(())
    }
}

fn tracker_error(err: GhError) -> ParleyError {
    ParleyError::TrackerError(err.to_string())
}

#[derive(Deserialize)]
struct IssueView {
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    comments: Vec<CommentView>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentView {
    author: Option<AuthorView>,
    #[serde(default)]
    body: String,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct AuthorView {
    login: String,
}

/// Decode the JSON printed by `gh issue view --json title,body,comments`.
pub(super) fn parse_issue(number: u64, json: &str) -> Result<Issue> {
    let view: IssueView = serde_json::from_str(json).map_err(|e| {
        ParleyError::TrackerError(format!(
            "failed to parse issue #{} returned by gh: {}",
            number, e
        ))
    })?;

    Ok(Issue {
        number,
        title: view.title,
        body: view.body,
        comments: view
            .comments
            .into_iter()
            .map(|c| IssueComment {
                author: c
                    .author
                    .map(|a| a.login)
                    .unwrap_or_else(|| "unknown".to_string()),
                created_at: c.created_at,
                body: c.body,
            })
            .collect(),
    })
}
