//! Auto-close decision.
//!
//! Only the summarizer may close an issue, and only by writing the
//! [`CLOSE_MARKER`] in its response.

use crate::tracker::IssueTracker;
use tracing::{error, info};

/// Marker that asks for the issue to be closed.
pub const CLOSE_MARKER: &str = "[CLOSE]";

/// The one agent allowed to close issues.
pub const PRIVILEGED_AGENT: &str = "summarizer";

/// Whether a response from `agent_name` asks to close the issue.
pub fn should_auto_close(response_text: &str, agent_name: &str) -> bool {
    agent_name == PRIVILEGED_AGENT && response_text.contains(CLOSE_MARKER)
}

/// Close issue `number`, reporting success instead of failing.
pub async fn close_issue(tracker: &dyn IssueTracker, number: u64) -> bool {
    match tracker.close_issue(number).await {
        Ok(()) => {
            info!(issue = number, "issue auto-closed");
            true
        }
        Err(e) => {
            error!(issue = number, error = %e, "failed to close issue");
            false
        }
    }
}
