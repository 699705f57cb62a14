//! Implementation of the `parley list-agents` command.

use super::Workspace;
use crate::agent::AgentProfile;
use crate::error::Result;
use crate::observer::agent_matrix;

/// Execute the `parley list-agents` command.
///
/// Lists the roster from `agents.yaml` (or the built-in roster) with the
/// settings each agent resolves to, then the agent matrix the observer sees.
pub fn cmd_list_agents() -> Result<()> {
    let workspace = Workspace::load()?;
    let agents = &workspace.agents;

    if agents.agents.is_empty() {
        println!("No agents configured.");
        println!();
        println!(
            "Add agents to {} to configure the roster.",
            workspace.ctx.agents_path().display()
        );
        return Ok(());
    }

    println!(
        "{:<15} {:<45} {:>8}  {}",
        "Agent", "Description", "Timeout", "Trigger Conditions"
    );
    println!("{}", "-".repeat(100));
    for (name, profile) in agents.iter() {
        let resolved = agents.resolve(name);
        println!(
            "{:<15} {:<45} {:>7}s  {}",
            name,
            truncate_description(&profile.description, 45),
            resolved.timeout.as_secs(),
            truncate_description(&conditions(profile), 40)
        );
    }

    println!();
    println!("=== Agent matrix (for the observer) ===");
    println!();
    print!("{}", agent_matrix(agents));

    Ok(())
}

fn conditions(profile: &AgentProfile) -> String {
    if profile.trigger_conditions.is_empty() {
        "auto-detect".to_string()
    } else {
        profile.trigger_conditions.join(", ")
    }
}

fn truncate_description(description: &str, width: usize) -> String {
    if description.chars().count() <= width {
        return description.to_string();
    }
    let mut short: String = description.chars().take(width.saturating_sub(3)).collect();
    short.push_str("...");
    short
}
