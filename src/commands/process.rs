//! Implementation of the `parley process` command.
//!
//! Post-processes a response an agent already produced (for example in a
//! workflow step that ran the model itself): normalizes it, reports its
//! mentions and wakes the mentioned agents.

use super::Workspace;
use crate::cli::ProcessArgs;
use crate::dispatch::{Cascade, Dispatcher, WorkflowTrigger};
use crate::error::{ParleyError, Result};
use crate::processor::{RawResponse, process_agent_response};
use crate::tracker::{GithubTracker, Issue, IssueTracker};
use std::io::Read;

/// Execute the `parley process` command.
pub async fn cmd_process(args: ProcessArgs) -> Result<()> {
    let workspace = Workspace::load()?;
    let config = workspace.config;

    let input = read_input(&args)?;
    let raw = RawResponse::parse(&input);

    let processed = if args.no_dispatch {
        let issue = Issue {
            number: args.issue,
            ..Default::default()
        };
        process_agent_response(&args.agent, &raw, &issue, &config.format, None).await
    } else {
        let tracker = GithubTracker::new(config.repository.clone());
        let issue = tracker.read_issue(args.issue).await?;
        let trigger = WorkflowTrigger::from_config(config);
        let dispatcher = Dispatcher::new(&trigger, &config.mentions)
            .with_cascade(Cascade::from_env(), config.cascade_max_depth);
        process_agent_response(&args.agent, &raw, &issue, &config.format, Some(&dispatcher)).await
    };

    if args.json {
        let json = serde_json::to_string_pretty(&processed).map_err(|e| {
            ParleyError::UserError(format!("failed to serialize processed response: {}", e))
        })?;
        println!("{}", json);
        return Ok(());
    }

    println!("{}", processed.response);
    println!();
    println!("  Mentions: {}", display_list(&processed.mentions));
    if !args.no_dispatch {
        println!("  Allowed:  {}", display_list(&processed.allowed_mentions));
        println!("  Filtered: {}", display_list(&processed.filtered_mentions));
    }
    for warning in &processed.format_warnings {
        println!("  Warning:  {}", warning);
    }

    Ok(())
}

fn read_input(args: &ProcessArgs) -> Result<String> {
    match &args.file {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            ParleyError::UserError(format!(
                "failed to read response file '{}': {}",
                path.display(),
                e
            ))
        }),
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input).map_err(|e| {
                ParleyError::UserError(format!("failed to read response from stdin: {}", e))
            })?;
            Ok(input)
        }
    }
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
