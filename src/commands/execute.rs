//! Implementation of the `parley execute` and `parley review` commands.
//!
//! Both run a set of agents on one issue:
//! 1. Fetches the issue and its comments
//! 2. Runs every agent in parallel on the same context
//! 3. Normalizes each answer and optionally posts it as a comment
//! 4. Wakes the agents each answer mentions
//! 5. Closes the issue when the summarizer asks for it

use super::Workspace;
use crate::agent::{AgentBackend, AgentName, AgentOutcome, AgentRunner, AgentsConfig, CommandBackend};
use crate::cli::{ExecuteArgs, ReviewArgs};
use crate::close::{close_issue, should_auto_close};
use crate::config::Config;
use crate::dispatch::{AgentTrigger, Cascade, Dispatcher, WorkflowTrigger};
use crate::error::{ParleyError, Result};
use crate::processor::{ProcessedResponse, RawResponse, process_agent_response};
use crate::tracker::{GithubTracker, IssueTracker, truncate_comment};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// Agents run by `parley review`.
pub const REVIEW_ROSTER: [&str; 4] = ["moderator", "reviewer_a", "reviewer_b", "summarizer"];

/// Execute the `parley execute` command.
pub async fn cmd_execute(args: ExecuteArgs) -> Result<()> {
    let names = agent_names(&parse_agents_arg(&args.agents))?;
    run_command(args.issue, &names, args.post, !args.no_dispatch).await
}

/// Execute the `parley review` command.
pub async fn cmd_review(args: ReviewArgs) -> Result<()> {
    let names = agent_names(&REVIEW_ROSTER.map(String::from))?;
    run_command(args.issue, &names, args.post, !args.no_dispatch).await
}

async fn run_command(issue: u64, names: &[AgentName], post: bool, dispatch: bool) -> Result<()> {
    let workspace = Workspace::load()?;
    let config = workspace.config;

    let tracker = GithubTracker::new(config.repository.clone());
    let backend = CommandBackend::new(workspace.agents.clone(), Some(workspace.ctx.prompts_dir()));
    let trigger = WorkflowTrigger::from_config(config);

    println!(
        "Running {} agent(s) on issue #{}...",
        names.len(),
        issue
    );

    let run = IssueRun {
        tracker: &tracker,
        backend: &backend,
        trigger: &trigger,
        config,
        agents: &workspace.agents,
    };
    let options = RunOptions {
        post,
        dispatch,
        cascade: Cascade::from_env(),
    };
    let report = run.run(issue, names, &options).await?;

    for response in &report.responses {
        println!();
        println!("=== {} result ===", response.agent_name);
        println!("{}", response.response);
        if !response.dispatch_results.is_empty() {
            let woken: Vec<&str> = response
                .dispatch_results
                .iter()
                .filter(|(_, ok)| **ok)
                .map(|(agent, _)| agent.as_str())
                .collect();
            println!("  Woke:     {}", woken.join(", "));
        }
        if !response.filtered_mentions.is_empty() {
            println!("  Filtered: {}", response.filtered_mentions.join(", "));
        }
    }
    for (agent, message) in &report.failures {
        println!();
        println!("=== {} failed ===", agent);
        println!("{}", message);
    }

    println!();
    if post {
        println!("Posted {} comment(s) to issue #{}", report.posted, issue);
    }
    if report.closed {
        println!("Issue #{} closed by summarizer", issue);
    }

    Ok(())
}

/// Parse the `--agents` argument.
///
/// Accepts a JSON array (`["a", "b"]`), a comma-separated list (`a,b`) or a
/// space-separated list (`a b`). Names are trimmed and lowercased; empty
/// entries are dropped. A string that looks like a JSON array but does not
/// parse falls back to the list formats.
pub fn parse_agents_arg(agents: &str) -> Vec<String> {
    let agents = agents.trim();

    if agents.starts_with('[') && agents.ends_with(']') {
        match serde_json::from_str::<Vec<String>>(agents) {
            Ok(list) => {
                return list
                    .iter()
                    .map(|a| a.trim().to_lowercase())
                    .filter(|a| !a.is_empty())
                    .collect();
            }
            Err(e) => warn!(input = agents, error = %e, "agents argument is not a JSON array"),
        }
    }

    let parts: Vec<&str> = if agents.contains(',') {
        agents.split(',').collect()
    } else {
        agents.split_whitespace().collect()
    };

    parts
        .into_iter()
        .map(|a| a.trim().to_lowercase())
        .filter(|a| !a.is_empty())
        .collect()
}

fn agent_names(raw: &[String]) -> Result<Vec<AgentName>> {
    let names = raw
        .iter()
        .map(|name| {
            AgentName::parse(name).ok_or_else(|| {
                ParleyError::UserError(format!(
                    "invalid agent name '{}'\n\n\
                     Agent names may contain letters, digits, '_' and '-'.",
                    name
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if names.is_empty() {
        return Err(ParleyError::UserError(
            "no agent names given.\n\n\
             Fix: pass --agents moderator,reviewer_a (or a JSON array)."
                .to_string(),
        ));
    }

    Ok(names)
}

/// What a run may do besides running agents.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Post answers as comments and allow the summarizer to close the issue.
    pub post: bool,
    /// Wake mentioned agents.
    pub dispatch: bool,
    /// Cascade this run was started in.
    pub cascade: Cascade,
}

/// Collaborators and configuration for running agents on one issue.
pub struct IssueRun<'a> {
    pub tracker: &'a dyn IssueTracker,
    pub backend: &'a dyn AgentBackend,
    pub trigger: &'a dyn AgentTrigger,
    pub config: &'a Config,
    pub agents: &'a AgentsConfig,
}

/// Result of [`IssueRun::run`].
#[derive(Debug, Clone, Default)]
pub struct IssueRunReport {
    /// Processed answers of the agents that completed, in name order.
    pub responses: Vec<ProcessedResponse>,
    /// Error message per agent that failed.
    pub failures: BTreeMap<String, String>,
    /// Comments successfully posted.
    pub posted: usize,
    /// Whether the issue was closed.
    pub closed: bool,
}

impl IssueRun<'_> {
    /// Run `agents` on issue `issue_number`.
    ///
    /// # Returns
    ///
    /// * `Ok(IssueRunReport)` - At least one agent completed (or none were asked)
    /// * `Err(ParleyError::TrackerError)` - The issue could not be read
    /// * `Err(ParleyError::BackendError)` - Every agent failed
    pub async fn run(
        &self,
        issue_number: u64,
        agents: &[AgentName],
        options: &RunOptions,
    ) -> Result<IssueRunReport> {
        let issue = self.tracker.read_issue(issue_number).await?;
        info!(
            issue = issue_number,
            title = %issue.title,
            comments = issue.comments.len(),
            "issue loaded"
        );

        let runner = AgentRunner::new(self.backend, self.agents.clone());
        let outcomes = runner
            .run_parallel(issue_number, agents, &issue.prompt_context())
            .await;

        let dispatcher = Dispatcher::new(self.trigger, &self.config.mentions)
            .with_cascade(options.cascade.clone(), self.config.cascade_max_depth);

        let mut report = IssueRunReport::default();
        for (name, outcome) in outcomes.outcomes {
            let agent = name.as_str();
            let response = match outcome {
                AgentOutcome::Completed { response } => response,
                AgentOutcome::Failed { error } => {
                    report.failures.insert(agent.to_string(), error);
                    continue;
                }
            };

            let mut processed = process_agent_response(
                agent,
                &RawResponse::Text(response),
                &issue,
                &self.config.format,
                None,
            )
            .await;

            if options.post {
                let body = truncate_comment(&processed.clean_response, self.config.comment_max_chars);
                match self.tracker.post_comment(issue_number, &body).await {
                    Ok(()) => {
                        info!(agent, issue = issue_number, "response posted");
                        report.posted += 1;
                    }
                    Err(e) => error!(agent, issue = issue_number, error = %e, "failed to post response"),
                }
            }

            if options.dispatch {
                processed.dispatch(&dispatcher, &issue).await;
            }

            if options.post && !report.closed && should_auto_close(&processed.response, agent) {
                report.closed = close_issue(self.tracker, issue_number).await;
            }

            report.responses.push(processed);
        }

        if !report.failures.is_empty() && report.responses.is_empty() {
            let details = report
                .failures
                .iter()
                .map(|(agent, message)| format!("{}: {}", agent, message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ParleyError::BackendError(format!(
                "all {} agent(s) failed ({})",
                report.failures.len(),
                details
            )));
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;
    use crate::test_support::{FakeBackend, FakeReply, FakeTracker, FakeTrigger};
    use crate::tracker::{Issue, TRUNCATION_SUFFIX};

    const MODERATOR_ANSWER: &str = "\
## Summary
Worth a full review.

## Key Findings
- Novel sparsity pattern
- Strong long-context results
- Limited ablations

## Recommended Actions
- [ ] @reviewer_a assess the method
- [ ] @github-actions rerun CI

## Structured (YAML)
```yaml
confidence: medium
```
";

    fn names(list: &[&str]) -> Vec<AgentName> {
        list.iter().map(|n| AgentName::parse(n).unwrap()).collect()
    }

    fn tracker() -> FakeTracker {
        FakeTracker::with_issue(Issue {
            title: "Sparse Attention".to_string(),
            body: "Please review".to_string(),
            ..Default::default()
        })
    }

    struct Harness {
        tracker: FakeTracker,
        backend: FakeBackend,
        trigger: FakeTrigger,
        config: Config,
        agents: AgentsConfig,
    }

    impl Harness {
        fn new(backend: FakeBackend) -> Self {
            Self {
                tracker: tracker(),
                backend,
                trigger: FakeTrigger::default(),
                config: Config::default(),
                agents: AgentsConfig::default(),
            }
        }

        fn run(&self) -> IssueRun<'_> {
            IssueRun {
                tracker: &self.tracker,
                backend: &self.backend,
                trigger: &self.trigger,
                config: &self.config,
                agents: &self.agents,
            }
        }
    }

    fn post_and_dispatch() -> RunOptions {
        RunOptions {
            post: true,
            dispatch: true,
            cascade: Cascade::default(),
        }
    }

    // =========================================================================
    // parse_agents_arg
    // =========================================================================

    #[test]
    fn parse_agents_comma_separated() {
        assert_eq!(
            parse_agents_arg("Moderator, reviewer_a,,summarizer"),
            vec!["moderator", "reviewer_a", "summarizer"]
        );
    }

    #[test]
    fn parse_agents_space_separated() {
        assert_eq!(parse_agents_arg("  echo   test "), vec!["echo", "test"]);
    }

    #[test]
    fn parse_agents_json_array() {
        assert_eq!(parse_agents_arg(r#"["Echo", "test"]"#), vec!["echo", "test"]);
    }

    #[test]
    fn parse_agents_broken_json_falls_back() {
        assert_eq!(parse_agents_arg("[echo,test]"), vec!["[echo", "test]"]);
    }

    #[test]
    fn parse_agents_empty() {
        assert!(parse_agents_arg("   ").is_empty());
    }

    #[test]
    fn agent_names_rejects_invalid_and_empty() {
        let err = agent_names(&["ok".to_string(), "not valid!".to_string()]).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        assert!(err.to_string().contains("not valid!"));

        let err = agent_names(&[]).unwrap_err();
        assert!(err.to_string().contains("no agent names"));
    }

    // =========================================================================
    // IssueRun
    // =========================================================================

    #[tokio::test]
    async fn posts_clean_responses_and_dispatches_mentions() {
        let harness = Harness::new(
            FakeBackend::new()
                .reply("moderator", FakeReply::text(MODERATOR_ANSWER))
                .reply("reviewer_b", FakeReply::text("No concerns.")),
        );

        let report = harness
            .run()
            .run(5, &names(&["moderator", "reviewer_b"]), &post_and_dispatch())
            .await
            .unwrap();

        assert_eq!(report.responses.len(), 2);
        assert_eq!(report.posted, 2);
        assert!(!report.closed);

        let comments = harness.tracker.comments();
        assert_eq!(comments.len(), 2);
        assert!(comments.iter().all(|(number, body)| *number == 5 && !body.contains('@')));
        assert!(comments[0].1.starts_with("[Agent: moderator]"));

        let moderator = &report.responses[0];
        assert_eq!(moderator.allowed_mentions, vec!["reviewer_a"]);
        assert_eq!(moderator.filtered_mentions, vec!["github-actions"]);

        let requests = harness.trigger.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].agent, "reviewer_a");
        assert_eq!(requests[0].issue_title, "Sparse Attention");
    }

    #[tokio::test]
    async fn no_post_and_no_dispatch_touch_nothing() {
        let harness = Harness::new(
            FakeBackend::new().reply("moderator", FakeReply::text(MODERATOR_ANSWER)),
        );

        let report = harness
            .run()
            .run(5, &names(&["moderator"]), &RunOptions::default())
            .await
            .unwrap();

        assert_eq!(report.responses.len(), 1);
        assert_eq!(report.posted, 0);
        assert!(harness.tracker.comments().is_empty());
        assert!(harness.trigger.requests().is_empty());
    }

    #[tokio::test]
    async fn summarizer_close_marker_closes_issue() {
        let harness = Harness::new(
            FakeBackend::new().reply("summarizer", FakeReply::text("Consensus reached. [CLOSE]")),
        );

        let report = harness
            .run()
            .run(9, &names(&["summarizer"]), &post_and_dispatch())
            .await
            .unwrap();

        assert!(report.closed);
        assert_eq!(harness.tracker.closed(), vec![9]);
    }

    #[tokio::test]
    async fn close_marker_needs_post() {
        let harness = Harness::new(
            FakeBackend::new().reply("summarizer", FakeReply::text("Done. [CLOSE]")),
        );

        let report = harness
            .run()
            .run(9, &names(&["summarizer"]), &RunOptions::default())
            .await
            .unwrap();

        assert!(!report.closed);
        assert!(harness.tracker.closed().is_empty());
    }

    #[tokio::test]
    async fn other_agents_cannot_close() {
        let harness = Harness::new(
            FakeBackend::new().reply("moderator", FakeReply::text("[CLOSE]")),
        );

        let report = harness
            .run()
            .run(9, &names(&["moderator"]), &post_and_dispatch())
            .await
            .unwrap();

        assert!(!report.closed);
    }

    #[tokio::test]
    async fn failed_agent_is_reported_beside_successes() {
        let harness = Harness::new(
            FakeBackend::new()
                .reply("moderator", FakeReply::text("fine"))
                .reply("reviewer_a", FakeReply::fail("model overloaded")),
        );

        let report = harness
            .run()
            .run(1, &names(&["moderator", "reviewer_a"]), &post_and_dispatch())
            .await
            .unwrap();

        assert_eq!(report.responses.len(), 1);
        assert_eq!(
            report.failures.get("reviewer_a").map(String::as_str),
            Some("model overloaded")
        );
        assert_eq!(harness.tracker.comments().len(), 1);
    }

    #[tokio::test]
    async fn all_agents_failing_is_a_backend_error() {
        let harness = Harness::new(
            FakeBackend::new().reply("moderator", FakeReply::fail("quota exceeded")),
        );

        let err = harness
            .run()
            .run(1, &names(&["moderator", "reviewer_a"]), &RunOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), exit_codes::BACKEND_FAILURE);
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn unreadable_issue_is_a_tracker_error() {
        let mut harness = Harness::new(FakeBackend::new());
        harness.tracker = FakeTracker::failing();

        let err = harness
            .run()
            .run(1, &names(&["moderator"]), &RunOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), exit_codes::TRACKER_FAILURE);
    }

    #[tokio::test]
    async fn long_responses_are_truncated_before_posting() {
        let long = format!("{}\n\n{}", "a".repeat(300), "b".repeat(300));
        let mut harness = Harness::new(FakeBackend::new().reply("moderator", FakeReply::Text(long)));
        harness.config.comment_max_chars = 400;

        harness
            .run()
            .run(2, &names(&["moderator"]), &post_and_dispatch())
            .await
            .unwrap();

        let comments = harness.tracker.comments();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].1.chars().count() <= 400);
        assert!(comments[0].1.ends_with(TRUNCATION_SUFFIX));
    }

    #[tokio::test]
    async fn inherited_cascade_blocks_loops() {
        let answer = "ask back\n```yaml\nmentions:\n  - moderator\n```";
        let harness = Harness::new(FakeBackend::new().reply("reviewer_a", FakeReply::text(answer)));
        let options = RunOptions {
            post: false,
            dispatch: true,
            cascade: Cascade::parse("moderator"),
        };

        let report = harness
            .run()
            .run(3, &names(&["reviewer_a"]), &options)
            .await
            .unwrap();

        assert_eq!(report.responses[0].filtered_mentions, vec!["moderator"]);
        assert!(harness.trigger.requests().is_empty());
    }
}
