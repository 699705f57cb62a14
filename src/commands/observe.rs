//! Implementation of the `parley observe` and `parley observe-batch` commands.
//!
//! Both ask the observer whether an issue needs an agent:
//! 1. Fetches the issue (or each issue of the batch)
//! 2. Runs the observer, in parallel across a batch
//! 3. With `--post`, posts the trigger comment and wakes the chosen agent

use super::{RunOptions, Workspace};
use crate::agent::{AgentBackend, AgentsConfig, CommandBackend};
use crate::cli::{ObserveArgs, ObserveBatchArgs};
use crate::config::Config;
use crate::dispatch::{AgentTrigger, Cascade, DispatchReport, Dispatcher, WorkflowTrigger};
use crate::error::{ParleyError, Result};
use crate::mention::clean_mentions_in_text;
use crate::observer::{OBSERVER_AGENT, Observer, ObserverDecision};
use crate::tracker::{GithubTracker, Issue, IssueTracker, truncate_comment};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// Execute the `parley observe` command.
pub async fn cmd_observe(args: ObserveArgs) -> Result<()> {
    let workspace = Workspace::load()?;
    let config = workspace.config;

    let tracker = GithubTracker::new(config.repository.clone());
    let backend = CommandBackend::new(workspace.agents.clone(), Some(workspace.ctx.prompts_dir()));
    let trigger = WorkflowTrigger::from_config(config);

    let run = ObserveRun {
        tracker: &tracker,
        backend: &backend,
        trigger: &trigger,
        config,
        agents: &workspace.agents,
    };
    let report = run.observe(args.issue, &options(args.post, args.no_dispatch)).await?;

    println!("=== Observer analysis for issue #{} ===", report.issue_number);
    println!();
    println!("Analysis:");
    println!("{}", display_or_na(&report.decision.analysis));
    println!();
    print_decision(&report, "");

    Ok(())
}

/// Execute the `parley observe-batch` command.
pub async fn cmd_observe_batch(args: ObserveBatchArgs) -> Result<()> {
    let numbers = parse_issue_numbers(&args.issues)?;
    let workspace = Workspace::load()?;
    let config = workspace.config;

    let tracker = GithubTracker::new(config.repository.clone());
    let backend = CommandBackend::new(workspace.agents.clone(), Some(workspace.ctx.prompts_dir()));
    let trigger = WorkflowTrigger::from_config(config);

    println!("Observing {} issue(s) in parallel...", numbers.len());

    let run = ObserveRun {
        tracker: &tracker,
        backend: &backend,
        trigger: &trigger,
        config,
        agents: &workspace.agents,
    };
    let batch = run
        .observe_batch(&numbers, &options(args.post, args.no_dispatch))
        .await?;

    for (number, message) in &batch.unreadable {
        println!("Skipped issue #{}: {}", number, message);
    }
    for report in &batch.reports {
        println!();
        println!("Issue #{}:", report.issue_number);
        print_decision(report, "  ");
    }
    for (number, message) in &batch.failures {
        println!();
        println!("Issue #{}:", number);
        println!("  Error: {}", message);
    }

    println!();
    println!(
        "Triggered {}/{} issue(s)",
        batch.triggered(),
        batch.reports.len() + batch.failures.len()
    );

    Ok(())
}

fn options(post: bool, no_dispatch: bool) -> RunOptions {
    RunOptions {
        post,
        dispatch: post && !no_dispatch,
        cascade: Cascade::from_env(),
    }
}

fn print_decision(report: &ObserveReport, indent: &str) {
    let decision = &report.decision;
    if !decision.should_trigger {
        println!("{}Should trigger: no", indent);
        println!("{}Skip reason:    {}", indent, display_or_na(&decision.reason));
        return;
    }

    println!("{}Should trigger: yes", indent);
    println!("{}Agent:          {}", indent, decision.agent.as_deref().unwrap_or("N/A"));
    println!("{}Comment:        {}", indent, decision.comment.as_deref().unwrap_or("N/A"));
    println!("{}Reason:         {}", indent, display_or_na(&decision.reason));
    if report.posted {
        println!("{}Posted trigger comment to issue #{}", indent, report.issue_number);
    }
    for (agent, ok) in &report.dispatch.outcomes {
        let status = if *ok { "woken" } else { "trigger failed" };
        println!("{}  {}: {}", indent, agent, status);
    }
    if !report.dispatch.filtered.is_empty() {
        println!("{}Filtered:       {}", indent, report.dispatch.filtered.join(", "));
    }
}

fn display_or_na(text: &str) -> &str {
    if text.trim().is_empty() { "N/A" } else { text }
}

/// Parse the `--issues` argument: comma-separated issue numbers.
///
/// Blank entries are skipped and repeated numbers are kept once, in first-seen
/// order.
pub fn parse_issue_numbers(raw: &str) -> Result<Vec<u64>> {
    let mut numbers = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let number = part.trim_start_matches('#').parse::<u64>().map_err(|_| {
            ParleyError::UserError(format!(
                "invalid issue number '{}'\n\n\
                 Fix: pass --issues as comma-separated numbers, e.g. --issues 12,15,20",
                part
            ))
        })?;
        if !numbers.contains(&number) {
            numbers.push(number);
        }
    }

    if numbers.is_empty() {
        return Err(ParleyError::UserError(
            "no issue numbers given.\n\n\
             Fix: pass --issues 12,15,20"
                .to_string(),
        ));
    }
    Ok(numbers)
}

/// Collaborators and configuration for observing issues.
pub struct ObserveRun<'a> {
    pub tracker: &'a dyn IssueTracker,
    pub backend: &'a dyn AgentBackend,
    pub trigger: &'a dyn AgentTrigger,
    pub config: &'a Config,
    pub agents: &'a AgentsConfig,
}

/// Observer result for one issue and what was done about it.
#[derive(Debug, Clone, Default)]
pub struct ObserveReport {
    pub issue_number: u64,
    pub decision: ObserverDecision,
    /// Whether the trigger comment was posted.
    pub posted: bool,
    /// Outcome of waking the chosen agent.
    pub dispatch: DispatchReport,
}

/// Result of [`ObserveRun::observe_batch`].
#[derive(Debug, Clone, Default)]
pub struct ObserveBatchReport {
    /// One report per issue the observer answered, in request order.
    pub reports: Vec<ObserveReport>,
    /// Error message per issue the observer failed on.
    pub failures: BTreeMap<u64, String>,
    /// Error message per issue that could not be read.
    pub unreadable: BTreeMap<u64, String>,
}

impl ObserveBatchReport {
    /// Issues the observer wants an agent on.
    pub fn triggered(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.decision.should_trigger)
            .count()
    }
}

impl ObserveRun<'_> {
    /// Observe issue `issue_number`.
    ///
    /// # Returns
    ///
    /// * `Ok(ObserveReport)` - The observer answered
    /// * `Err(ParleyError::TrackerError)` - The issue could not be read
    /// * `Err(ParleyError::BackendError)` - The observer failed
    pub async fn observe(&self, issue_number: u64, options: &RunOptions) -> Result<ObserveReport> {
        let issue = self.tracker.read_issue(issue_number).await?;
        let observer = Observer::new(self.backend, self.agents)?;
        let decision = observer.observe(&issue).await?;
        Ok(self.act(&issue, decision, options).await)
    }

    /// Observe several issues, running the observer on all of them at once.
    ///
    /// Issues that cannot be read are skipped and observer failures are
    /// recorded per issue.
    ///
    /// # Returns
    ///
    /// * `Ok(ObserveBatchReport)` - At least one issue was observed
    /// * `Err(ParleyError::TrackerError)` - No issue could be read
    /// * `Err(ParleyError::BackendError)` - The observer failed on every issue
    pub async fn observe_batch(
        &self,
        issue_numbers: &[u64],
        options: &RunOptions,
    ) -> Result<ObserveBatchReport> {
        let mut batch = ObserveBatchReport::default();

        let mut issues = Vec::new();
        for &number in issue_numbers {
            match self.tracker.read_issue(number).await {
                Ok(issue) => issues.push(issue),
                Err(e) => {
                    warn!(issue = number, error = %e, "skipping unreadable issue");
                    batch.unreadable.insert(number, e.to_string());
                }
            }
        }
        if issues.is_empty() {
            return Err(ParleyError::TrackerError(format!(
                "none of the {} issue(s) could be read",
                issue_numbers.len()
            )));
        }

        let observer = Observer::new(self.backend, self.agents)?;
        let observations = observer.observe_batch(&issues).await;

        for (issue, observation) in issues.iter().zip(observations) {
            match observation.outcome {
                Ok(decision) => batch.reports.push(self.act(issue, decision, options).await),
                Err(e) => {
                    batch.failures.insert(observation.issue_number, e.to_string());
                }
            }
        }

        if batch.reports.is_empty() {
            return Err(ParleyError::BackendError(format!(
                "observer failed on all {} issue(s)",
                batch.failures.len()
            )));
        }

        info!(
            observed = batch.reports.len(),
            triggered = batch.triggered(),
            "batch observed"
        );
        Ok(batch)
    }

    async fn act(&self, issue: &Issue, decision: ObserverDecision, options: &RunOptions) -> ObserveReport {
        let mut report = ObserveReport {
            issue_number: issue.number,
            ..Default::default()
        };

        if decision.should_trigger && options.post {
            if let Some(comment) = &decision.comment {
                let body = truncate_comment(&clean_mentions_in_text(comment), self.config.comment_max_chars);
                match self.tracker.post_comment(issue.number, &body).await {
                    Ok(()) => {
                        info!(issue = issue.number, "trigger comment posted");
                        report.posted = true;
                    }
                    Err(e) => error!(issue = issue.number, error = %e, "failed to post trigger comment"),
                }
            }

            if options.dispatch
                && let Some(agent) = &decision.agent
            {
                let dispatcher = Dispatcher::new(self.trigger, &self.config.mentions)
                    .with_cascade(options.cascade.clone(), self.config.cascade_max_depth);
                report.dispatch = dispatcher
                    .dispatch_mentions(vec![agent.clone()], OBSERVER_AGENT, issue)
                    .await;
            }
        }

        report.decision = decision;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;
    use crate::test_support::{FakeBackend, FakeReply, FakeTracker, FakeTrigger};

    const WAKE_MODERATOR: &str = "\
Fresh submission, nobody has looked yet.

```yaml
should_trigger: true
agent: moderator
comment: \"@moderator please triage this paper.\"
reason: \"Untriaged issue\"
```
";

    const SKIP: &str = "```yaml\nshould_trigger: false\nreason: \"Discussion is active\"\n```";

    struct Harness {
        tracker: FakeTracker,
        backend: FakeBackend,
        trigger: FakeTrigger,
        config: Config,
        agents: AgentsConfig,
    }

    impl Harness {
        fn new(reply: FakeReply) -> Self {
            Self {
                tracker: FakeTracker::with_issue(Issue {
                    title: "Sparse Attention".to_string(),
                    ..Default::default()
                }),
                backend: FakeBackend::new().reply(OBSERVER_AGENT, reply),
                trigger: FakeTrigger::default(),
                config: Config::default(),
                agents: AgentsConfig::default(),
            }
        }

        fn run(&self) -> ObserveRun<'_> {
            ObserveRun {
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
    // parse_issue_numbers
    // =========================================================================

    #[test]
    fn parse_issue_numbers_accepts_lists() {
        assert_eq!(parse_issue_numbers("1, 2,,#3 ,2").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn parse_issue_numbers_rejects_garbage_and_empty() {
        let err = parse_issue_numbers("1,two").unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        assert!(err.to_string().contains("'two'"));

        let err = parse_issue_numbers(" , ").unwrap_err();
        assert!(err.to_string().contains("no issue numbers"));
    }

    // =========================================================================
    // ObserveRun::observe
    // =========================================================================

    #[tokio::test]
    async fn observe_without_post_only_reports() {
        let harness = Harness::new(FakeReply::text(WAKE_MODERATOR));

        let report = harness.run().observe(4, &RunOptions::default()).await.unwrap();

        assert!(report.decision.should_trigger);
        assert_eq!(report.decision.agent.as_deref(), Some("moderator"));
        assert!(!report.posted);
        assert!(harness.tracker.comments().is_empty());
        assert!(harness.trigger.requests().is_empty());
    }

    #[tokio::test]
    async fn observe_with_post_comments_and_wakes_agent() {
        let harness = Harness::new(FakeReply::text(WAKE_MODERATOR));

        let report = harness.run().observe(4, &post_and_dispatch()).await.unwrap();

        assert!(report.posted);
        assert_eq!(
            harness.tracker.comments(),
            vec![(4, "user moderator please triage this paper.".to_string())]
        );
        assert_eq!(report.dispatch.outcomes.get("moderator"), Some(&true));

        let requests = harness.trigger.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].agent, "moderator");
        assert_eq!(requests[0].issue_number, 4);
        assert_eq!(requests[0].cascade.members(), ["observer"]);
    }

    #[tokio::test]
    async fn observe_respects_cascade() {
        let harness = Harness::new(FakeReply::text(WAKE_MODERATOR));
        let options = RunOptions {
            cascade: Cascade::parse("moderator"),
            ..post_and_dispatch()
        };

        let report = harness.run().observe(4, &options).await.unwrap();

        assert_eq!(report.dispatch.filtered, vec!["moderator"]);
        assert!(harness.trigger.requests().is_empty());
        assert!(report.posted);
    }

    #[tokio::test]
    async fn observe_skip_decision_posts_nothing() {
        let harness = Harness::new(FakeReply::text(SKIP));

        let report = harness.run().observe(4, &post_and_dispatch()).await.unwrap();

        assert!(!report.decision.should_trigger);
        assert_eq!(report.decision.reason, "Discussion is active");
        assert!(harness.tracker.comments().is_empty());
        assert!(harness.trigger.requests().is_empty());
    }

    #[tokio::test]
    async fn observe_failure_is_a_backend_error() {
        let harness = Harness::new(FakeReply::fail("model overloaded"));

        let err = harness.run().observe(4, &post_and_dispatch()).await.unwrap_err();

        assert_eq!(err.exit_code(), exit_codes::BACKEND_FAILURE);
    }

    // =========================================================================
    // ObserveRun::observe_batch
    // =========================================================================

    #[tokio::test]
    async fn batch_skips_unreadable_issues() {
        let mut harness = Harness::new(FakeReply::text(WAKE_MODERATOR));
        harness.tracker = FakeTracker::default().without(&[2]);

        let batch = harness
            .run()
            .observe_batch(&[1, 2, 3], &post_and_dispatch())
            .await
            .unwrap();

        let observed: Vec<u64> = batch.reports.iter().map(|r| r.issue_number).collect();
        assert_eq!(observed, vec![1, 3]);
        assert!(batch.unreadable.contains_key(&2));
        assert_eq!(batch.triggered(), 2);

        let commented: Vec<u64> = harness.tracker.comments().iter().map(|(n, _)| *n).collect();
        assert_eq!(commented, vec![1, 3]);
        assert_eq!(harness.trigger.requests().len(), 2);
        assert_eq!(harness.backend.calls().len(), 2);
    }

    #[tokio::test]
    async fn batch_with_no_readable_issue_is_a_tracker_error() {
        let mut harness = Harness::new(FakeReply::text(SKIP));
        harness.tracker = FakeTracker::failing();

        let err = harness
            .run()
            .observe_batch(&[1, 2], &RunOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), exit_codes::TRACKER_FAILURE);
    }

    #[tokio::test]
    async fn batch_observer_failing_everywhere_is_a_backend_error() {
        let harness = Harness::new(FakeReply::fail("quota exceeded"));

        let err = harness
            .run()
            .observe_batch(&[1, 2], &RunOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), exit_codes::BACKEND_FAILURE);
        assert!(err.to_string().contains("all 2 issue(s)"));
    }
}
