//! Tests for mention extraction, policy and cleaning.

use super::*;
use std::collections::HashSet;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Extraction
// ============================================================================

#[test]
fn test_yaml_mentions_list() {
    let text = r#"```yaml
summary: "Test"
findings:
  - "A"
recommendations:
  - "B"
mentions:
  - alice
  - bob
confidence: "high"
```"#;
    assert_eq!(extract_machine_mentions(text), names(&["alice", "bob"]));
}

#[test]
fn test_yaml_mentions_with_at_prefix() {
    let text = r#"```yaml
mentions:
  - "@charlie"
  - "@Delta"
confidence: "medium"
```"#;
    assert_eq!(extract_machine_mentions(text), names(&["charlie", "delta"]));
}

#[test]
fn test_yaml_invalid_items_dropped() {
    let text = r#"```yaml
mentions:
  - "@charlie"
  - "not valid!"
  - ""
  - "ok_user"
  - "---"
  - 42
confidence: "low"
```"#;
    assert_eq!(extract_machine_mentions(text), names(&["charlie", "ok_user"]));
}

#[test]
fn test_yaml_duplicates_collapse() {
    let text = "```yaml\nmentions: [alice, \"@ALICE\", bob, alice]\n```";
    assert_eq!(extract_machine_mentions(text), names(&["alice", "bob"]));
}

#[test]
fn test_no_machine_block() {
    assert!(extract_machine_mentions("No mentions here").is_empty());
    assert!(extract_machine_mentions("prose with @alice only").is_empty());
}

#[test]
fn test_unparseable_machine_block() {
    let text = "```yaml\nmentions: [alice\n  broken: : :\n```";
    assert!(extract_machine_mentions(text).is_empty());
}

#[test]
fn test_machine_block_is_last_yaml_fence() {
    let text = "Example:\n```yaml\nmentions: [example_user]\n```\nReal:\n```yaml\nmentions: [bob]\n```";
    assert_eq!(extract_machine_mentions(text), names(&["bob"]));
}

#[test]
fn test_inline_mentions() {
    let text = "Thanks @Alice, please ask @bob-2 and @alice again.";
    assert_eq!(inline_mentions(text), names(&["alice", "bob-2"]));
}

#[test]
fn test_inline_ignores_email_addresses() {
    let text = "mail me at someone@example.com or ping @carol";
    assert_eq!(inline_mentions(text), names(&["carol"]));
}

#[test]
fn test_inline_ignores_code_fences() {
    let text = "Ping @dave\n```java\n@Override\nvoid run() {}\n```";
    assert_eq!(inline_mentions(text), names(&["dave"]));
}

#[test]
fn test_extract_mentions_combines_in_position_order() {
    let text = "First @zed.\n```yaml\nmentions:\n  - amy\n  - zed\n```\nLater @bea";
    assert_eq!(extract_mentions(text), names(&["zed", "amy", "bea"]));
}

#[test]
fn test_normalize_mention() {
    assert_eq!(normalize_mention("@Alice"), Some("alice".to_string()));
    assert_eq!(normalize_mention("  ok_user "), Some("ok_user".to_string()));
    assert_eq!(normalize_mention(""), None);
    assert_eq!(normalize_mention("@"), None);
    assert_eq!(normalize_mention("not valid!"), None);
    assert_eq!(normalize_mention("-_-"), None);
}

// ============================================================================
// Policy
// ============================================================================

#[test]
fn test_system_accounts_filtered() {
    let policy = MentionPolicy::default();
    let partition = filter_mentions(&names(&["github", "github-actions"]), &policy, None);
    assert!(partition.allowed.is_empty());
    assert_eq!(partition.filtered, names(&["github", "github-actions"]));
}

#[test]
fn test_system_account_matching_rule() {
    let policy = MentionPolicy::default();
    assert!(policy.is_system_account("GitHub"));
    assert!(policy.is_system_account("github-foo"));
    assert!(policy.is_system_account("my-github-bot"));
    assert!(policy.is_system_account("release_bot"));
    assert!(!policy.is_system_account("githubx"));
    assert!(!policy.is_system_account("robot"));
    assert!(!policy.is_system_account("alice"));
}

#[test]
fn test_mixed_system_and_real_users() {
    let policy = MentionPolicy::default();
    let partition = filter_mentions(&names(&["github-actions", "alice"]), &policy, None);
    assert_eq!(partition.allowed, names(&["alice"]));
    assert_eq!(partition.filtered, names(&["github-actions"]));
}

#[test]
fn test_self_mention_filtered() {
    let policy = MentionPolicy::default();
    let partition = filter_mentions(
        &names(&["reviewer_a", "reviewer_b"]),
        &policy,
        Some("Reviewer_A"),
    );
    assert_eq!(partition.allowed, names(&["reviewer_b"]));
    assert_eq!(partition.filtered, names(&["reviewer_a"]));
}

#[test]
fn test_allow_list_restricts() {
    let policy = MentionPolicy {
        allow: names(&["moderator", "summarizer"]),
        ..Default::default()
    };
    let partition = filter_mentions(&names(&["stranger", "summarizer"]), &policy, None);
    assert_eq!(partition.allowed, names(&["summarizer"]));
    assert_eq!(partition.filtered, names(&["stranger"]));
}

#[test]
fn test_active_cascade_members_filtered() {
    let policy = MentionPolicy::default();
    let partition = policy.partition(
        &names(&["moderator", "summarizer"]),
        Some("reviewer_a"),
        &names(&["moderator", "reviewer_a"]),
    );
    assert_eq!(partition.allowed, names(&["summarizer"]));
    assert_eq!(partition.filtered, names(&["moderator"]));
}

#[test]
fn test_max_per_response_overflow_filtered() {
    let policy = MentionPolicy {
        max_per_response: 2,
        ..Default::default()
    };
    let partition = filter_mentions(&names(&["a1", "github", "b2", "c3"]), &policy, None);
    assert_eq!(partition.allowed, names(&["a1", "b2"]));
    assert_eq!(partition.filtered, names(&["github", "c3"]));
}

#[test]
fn test_partition_is_total_and_disjoint() {
    let policy = MentionPolicy {
        max_per_response: 3,
        ..Default::default()
    };
    let input = names(&[
        "alice",
        "github",
        "bob",
        "dependabot",
        "reviewer_a",
        "carol",
        "dave",
        "my-github-bot",
        "not valid!",
    ]);
    let partition = policy.partition(&input, Some("reviewer_a"), &names(&["carol"]));

    let allowed: HashSet<_> = partition.allowed.iter().cloned().collect();
    let filtered: HashSet<_> = partition.filtered.iter().cloned().collect();
    assert!(allowed.is_disjoint(&filtered));

    let union: HashSet<_> = allowed.union(&filtered).cloned().collect();
    let expected: HashSet<_> = input.iter().map(|s| s.to_ascii_lowercase()).collect();
    assert_eq!(union, expected);
    assert_eq!(partition.allowed, names(&["alice", "bob", "dave"]));
}

// ============================================================================
// Cleaning
// ============================================================================

#[test]
fn test_clean_mentions_in_text() {
    assert_eq!(
        clean_mentions_in_text("Ask @alice and @Bob_2."),
        "Ask user alice and user Bob_2."
    );
}

#[test]
fn test_clean_leaves_email_and_bare_at() {
    let text = "Write to a@b.com @ noon";
    assert_eq!(clean_mentions_in_text(text), text);
}

#[test]
fn test_cleaned_text_has_no_mentions() {
    let cleaned = clean_mentions_in_text("@one @two (@three)");
    assert!(inline_mentions(&cleaned).is_empty());
    assert_eq!(cleaned, "user one user two (user three)");
}
