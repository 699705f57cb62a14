//! Parley: mention-driven multi-agent discussion for GitHub Issues.
//!
//! Several agent personas answer the same issue in parallel. Their answers
//! are normalized into a fixed section layout, their `@mentions` are policed
//! against a trust policy, and the agents they ask for are woken through a
//! workflow trigger without ever looping.
//!
//! The pipeline for one answer:
//!
//! ```text
//! raw text -> normalize -> mentions -> policy -> dispatch
//! ```

pub mod agent;
pub mod cli;
pub mod close;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod exit_codes;
pub mod gh;
pub mod mention;
pub mod normalize;
pub mod observer;
pub mod processor;
pub mod scan;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_support;
