//! Issue tracker boundary.
//!
//! The pipeline never owns an issue: it reads one, posts comments on it and
//! may close it, all through [`IssueTracker`]. [`GithubTracker`] implements the
//! trait on top of the `gh` CLI.

mod github;


pub use github::GithubTracker;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Suffix appended to comments cut by [`truncate_comment`].
pub const TRUNCATION_SUFFIX: &str = "\n\n_(content truncated)_";

/// An issue as read from the tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub comments: Vec<IssueComment>,
}

/// One comment on an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueComment {
    pub author: String,
    pub created_at: Option<DateTime<Utc>>,
    pub body: String,
}

impl Issue {
    /// Shared context handed to every agent prompt: title, body and the
    /// discussion so far.
    pub fn prompt_context(&self) -> String {
        let mut context = format!(
            "**Issue title**: {}\n\n**Issue body**:\n{}",
            self.title, self.body
        );

        if !self.comments.is_empty() {
            let comments = self
                .comments
                .iter()
                .map(IssueComment::prompt_entry)
                .collect::<Vec<_>>()
                .join("\n\n");
            context.push_str(&format!(
                "\n\n**This issue has {} earlier comments; read them carefully:**\n\n{}",
                self.comments.len(),
                comments
            ));
        }

        context
    }
}

impl IssueComment {
    fn prompt_entry(&self) -> String {
        let date = self
            .created_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        format!("- **[{}]** ({}):\n{}", self.author, date, self.body)
    }
}

/// Read and write access to issues.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Fetch an issue with its comments.
    async fn read_issue(&self, number: u64) -> Result<Issue>;

    /// Post `body` as a new comment.
    async fn post_comment(&self, number: u64, body: &str) -> Result<()>;

    /// Close the issue as completed.
    async fn close_issue(&self, number: u64) -> Result<()>;
}

/// Shorten `text` to at most `max` characters, marking the cut.
///
/// When the text is too long, the content is cut to `max - suffix` characters.
/// If the last paragraph break (`\n\n`) in that window lies past half of it,
/// the cut happens there; otherwise it is a hard cut. The result, suffix
/// included, never exceeds `max` characters.
pub fn truncate_comment(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }

    let suffix_len = TRUNCATION_SUFFIX.chars().count();
    if max <= suffix_len {
        return text.chars().take(max).collect();
    }

    let available = max - suffix_len;
    let window: String = text.chars().take(available).collect();

    let cut = match window.rfind("\n\n") {
        Some(byte_pos) if window[..byte_pos].chars().count() * 2 > available => {
            &window[..byte_pos]
        }
        _ => window.as_str(),
    };

    format!("{}{}", cut.trim(), TRUNCATION_SUFFIX)
}
