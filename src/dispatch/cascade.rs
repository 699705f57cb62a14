//! Cascade tracking for agent-to-agent dispatch.
//!
//! When an agent mentions another, the mentioned agent is woken by a workflow
//! run that carries the chain of agents already involved. A mention of any
//! agent in that chain is filtered, and once the chain reaches the configured
//! depth no further agent is woken. Together these stop two agents from
//! mentioning each other forever.

use crate::mention::normalize_mention;
use std::fmt;

/// Environment variable carrying the cascade into a woken agent's run.
pub const CASCADE_ENV: &str = "PARLEY_CASCADE";

/// Ordered chain of agents active in the current cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cascade {
    chain: Vec<String>,
}

impl Cascade {
    /// Parse a comma-separated chain. Invalid and repeated names are dropped.
    pub fn parse(value: &str) -> Self {
        let mut cascade = Cascade::default();
        for name in value.split(',').filter_map(normalize_mention) {
            cascade.push(name);
        }
        cascade
    }

    /// Read the chain from [`CASCADE_ENV`]; empty when unset.
    pub fn from_env() -> Self {
        std::env::var(CASCADE_ENV)
            .map(|value| Self::parse(&value))
            .unwrap_or_default()
    }

    /// A copy with `agent` appended (unless already present).
    pub fn extended(&self, agent: &str) -> Self {
        let mut next = self.clone();
        if let Some(name) = normalize_mention(agent) {
            next.push(name);
        }
        next
    }

    fn push(&mut self, name: String) {
        if !self.chain.contains(&name) {
            self.chain.push(name);
        }
    }

    pub fn members(&self) -> &[String] {
        &self.chain
    }

    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

impl fmt::Display for Cascade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.chain.join(","))
    }
}
