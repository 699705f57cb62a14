//! Mention trust policy.
//!
//! # System accounts
//!
//! A mention names a system account when, compared case-insensitively, it:
//!
//! 1. equals an entry of `system_accounts`, or
//! 2. starts with an entry of `system_prefixes`, or
//! 3. ends with an entry of `system_suffixes`.
//!
//! With the defaults `github`, `github-actions` and `my-github-bot` are system
//! accounts while `githubx` and `octocat` are not.
//!
//! # Filter order
//!
//! Each mention is checked in this order and filtered on the first hit:
//! system account, self-mention, not on a non-empty allow-list, already active
//! in the current cascade, over `max_per_response`.

use super::extract::normalize_mention;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Policy deciding which mentions may be dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MentionPolicy {
    /// Exact system account names.
    pub system_accounts: Vec<String>,

    /// Name prefixes reserved for system accounts.
    pub system_prefixes: Vec<String>,

    /// Name suffixes reserved for system accounts.
    pub system_suffixes: Vec<String>,

    /// When non-empty, only these names may be dispatched.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,

    /// Maximum allowed mentions per response; the rest are filtered.
    pub max_per_response: usize,
}

impl Default for MentionPolicy {
    fn default() -> Self {
        Self {
            system_accounts: [
                "github",
                "github-actions",
                "actions",
                "dependabot",
                "renovate",
                "copilot",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            system_prefixes: vec!["github-".to_string()],
            system_suffixes: ["-bot", "_bot", "[bot]"]
                .into_iter()
                .map(String::from)
                .collect(),
            allow: Vec::new(),
            max_per_response: 5,
        }
    }
}

/// Result of applying the policy: every input mention lands in exactly one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionPartition {
    /// Mentions that may be dispatched, in extraction order.
    pub allowed: Vec<String>,
    /// Mentions that must not be dispatched, in extraction order.
    pub filtered: Vec<String>,
}

impl MentionPolicy {
    /// Whether `name` is a system or bot account.
    pub fn is_system_account(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.system_accounts
            .iter()
            .any(|a| a.eq_ignore_ascii_case(&name))
            || self
                .system_prefixes
                .iter()
                .any(|p| name.starts_with(&p.to_ascii_lowercase()))
            || self
                .system_suffixes
                .iter()
                .any(|s| name.ends_with(&s.to_ascii_lowercase()))
    }

    /// Partition `mentions` into allowed and filtered.
    ///
    /// # Arguments
    ///
    /// * `mentions` - Extracted mentions, in order
    /// * `emitter` - The agent that wrote the response (self-mentions are filtered)
    /// * `active` - Identities already active in the current cascade
    pub fn partition(
        &self,
        mentions: &[String],
        emitter: Option<&str>,
        active: &[String],
    ) -> MentionPartition {
        let emitter = emitter.map(str::to_ascii_lowercase);
        let allow: HashSet<String> = self.allow.iter().map(|a| a.to_ascii_lowercase()).collect();
        let active: HashSet<String> = active.iter().map(|a| a.to_ascii_lowercase()).collect();

        let mut seen = HashSet::new();
        let mut partition = MentionPartition::default();

        for raw in mentions {
            let normalized = normalize_mention(raw);
            let name = normalized
                .clone()
                .unwrap_or_else(|| raw.trim().to_ascii_lowercase());
            if !seen.insert(name.clone()) {
                continue;
            }

            let reason = if normalized.is_none() {
                Some("invalid name")
            } else if self.is_system_account(&name) {
                Some("system account")
            } else if emitter.as_deref() == Some(name.as_str()) {
                Some("self-mention")
            } else if !allow.is_empty() && !allow.contains(&name) {
                Some("not on allow-list")
            } else if active.contains(&name) {
                Some("already active in cascade")
            } else if partition.allowed.len() >= self.max_per_response {
                Some("over max_per_response")
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    debug!(mention = %name, reason, "mention filtered");
                    partition.filtered.push(name);
                }
                None => partition.allowed.push(name),
            }
        }

        partition
    }
}

/// Partition `mentions` for `emitter` outside any cascade.
pub fn filter_mentions(
    mentions: &[String],
    policy: &MentionPolicy,
    emitter: Option<&str>,
) -> MentionPartition {
    policy.partition(mentions, emitter, &[])
}
