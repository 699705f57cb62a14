//! Agent identity.

use crate::mention::normalize_mention;
use serde::Serialize;
use std::fmt;

/// A normalized agent name: lowercase, `[a-z0-9_-]+`, never empty.
///
/// Names compare case-insensitively because they are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AgentName(String);

impl AgentName {
    /// Parse a raw name; a leading `@` is accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        normalize_mention(raw).map(AgentName)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AgentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
