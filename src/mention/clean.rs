//! Display-safe rewriting of mentions.

use super::extract::{INLINE_MENTION, normalize_mention};
use regex::Captures;

/// Replace every syntactic `@name` with `user name`.
///
/// Used for text shown to people, so a copy-paste of a report can never
/// re-trigger an agent. Tokens that are not valid mentions are left alone.
pub fn clean_mentions_in_text(text: &str) -> String {
    INLINE_MENTION
        .replace_all(text, |caps: &Captures<'_>| {
            let prefix = &caps[1];
            let name = &caps[2];
            match normalize_mention(name) {
                Some(_) => format!("{}user {}", prefix, name),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
