//! Mention token extraction.

use crate::scan;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Inline `@name` mention. The `@` must not follow a word character, `.` or
/// another `@`, so e-mail addresses and `a@b` do not match.
pub(super) static INLINE_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^A-Za-z0-9_.@])@([A-Za-z0-9_-]+)")
        .expect("INLINE_MENTION is a compile-time constant")
});

/// Normalize one mention token.
///
/// Strips a single leading `@` and surrounding whitespace, then lowercases.
/// Returns `None` for empty tokens, tokens with characters outside
/// `[A-Za-z0-9_-]`, and tokens made only of punctuation.
pub fn normalize_mention(raw: &str) -> Option<String> {
    let token = raw.trim();
    let token = token.strip_prefix('@').unwrap_or(token);

    if token.is_empty() {
        return None;
    }
    if !token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }
    if !token.chars().any(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    Some(token.to_ascii_lowercase())
}

/// Mention names listed under `mentions:` in a YAML document.
///
/// Unparseable YAML, a missing key, or a non-list value all yield an empty
/// list. Non-string and invalid items are dropped.
pub fn mentions_from_yaml(yaml: &str) -> Vec<String> {
    let Ok(value) = serde_yaml::from_str::<serde_yaml::Value>(yaml) else {
        return Vec::new();
    };
    let Some(items) = value.get("mentions").and_then(|v| v.as_sequence()) else {
        return Vec::new();
    };

    dedupe(
        items
            .iter()
            .filter_map(|item| item.as_str())
            .filter_map(normalize_mention),
    )
}

/// Inline `@name` mentions in order of first occurrence, outside fenced blocks.
pub fn inline_mentions(text: &str) -> Vec<String> {
    let fences = scan::fenced_blocks(text);
    dedupe(
        positioned_inline(text, &fences)
            .into_iter()
            .map(|(_, name)| name),
    )
}

/// Mentions listed in the machine-readable block only.
///
/// The machine block is the last fenced YAML block in the text; prose
/// `@mentions` are ignored so illustrative examples never dispatch.
pub fn extract_machine_mentions(text: &str) -> Vec<String> {
    scan::last_yaml_block(text)
        .map(|block| mentions_from_yaml(block.body))
        .unwrap_or_default()
}

/// All mentions in `text`: inline tokens outside fenced blocks plus the
/// machine block's `mentions` list.
///
/// Names are lowercased, `@`-stripped and de-duplicated; order is that of
/// first occurrence, with machine block entries positioned at the block.
pub fn extract_mentions(text: &str) -> Vec<String> {
    let fences = scan::fenced_blocks(text);
    let mut found = positioned_inline(text, &fences);

    if let Some(block) = fences.iter().rev().find(|b| b.is_yaml()) {
        found.extend(
            mentions_from_yaml(block.body)
                .into_iter()
                .map(|name| (block.start, name)),
        );
    }

    // Stable: block entries keep their list order.
    found.sort_by_key(|(pos, _)| *pos);
    dedupe(found.into_iter().map(|(_, name)| name))
}

fn positioned_inline(text: &str, fences: &[scan::FencedBlock<'_>]) -> Vec<(usize, String)> {
    INLINE_MENTION
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps.get(2)?;
            if fences.iter().any(|f| f.contains(name.start())) {
                return None;
            }
            normalize_mention(name.as_str()).map(|n| (name.start(), n))
        })
        .collect()
}

fn dedupe(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
