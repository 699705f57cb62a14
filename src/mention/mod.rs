//! Mention extraction and trust policy.
//!
//! Agents ask each other for help by writing `@name` tokens or by listing
//! names under `mentions:` in their fenced YAML block. This module:
//!
//! - **Extract**: pulls mention tokens out of text, normalized and de-duplicated
//! - **Policy**: partitions mentions into those that may be dispatched and
//!   those that must not (system accounts, self-mentions, loops, overflow)
//! - **Clean**: rewrites mentions into a non-triggering form for display

mod clean;
mod extract;
mod policy;

#[cfg(test)]
mod tests;

pub use clean::clean_mentions_in_text;
pub use extract::{
    extract_machine_mentions, extract_mentions, inline_mentions, mentions_from_yaml,
    normalize_mention,
};
pub use policy::{MentionPartition, MentionPolicy, filter_mentions};
