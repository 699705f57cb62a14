//! GitHub CLI runner for parley.
//!
//! Provides an async wrapper around `gh` with captured stdout/stderr and
//! structured errors. The issue tracker and the workflow trigger both talk to
//! GitHub exclusively through this module.

use std::process::{Output, Stdio};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Program invoked for every GitHub operation.
pub const GH_PROGRAM: &str = "gh";

/// Result of a successful `gh` invocation.
#[derive(Debug, Clone)]
pub struct GhOutput {
    /// Standard output (trimmed).
    pub stdout: String,
    /// Standard error (trimmed).
    pub stderr: String,
}

impl GhOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

/// Errors raised while running `gh`.
#[derive(Debug, Error)]
pub enum GhError {
    /// The process could not be started or its stdin could not be written.
    #[error("failed to execute gh {subcommand}: {source} (is the GitHub CLI installed?)")]
    Spawn {
        subcommand: String,
        #[source]
        source: std::io::Error,
    },

    /// `gh` ran and exited non-zero.
    #[error("gh {subcommand} failed (exit code {code}): {message}")]
    Failed {
        subcommand: String,
        code: i32,
        message: String,
    },
}

/// Run `gh` with `args`, optionally feeding `stdin`.
///
/// # Arguments
///
/// * `args` - Arguments without the leading `gh`
/// * `stdin` - Text written to the child's standard input, then closed
///
/// # Returns
///
/// * `Ok(GhOutput)` - On exit code 0
/// * `Err(GhError)` - When the process cannot start or exits non-zero
pub async fn run_gh(args: &[String], stdin: Option<&str>) -> Result<GhOutput, GhError> {
    run_program(GH_PROGRAM, args, stdin).await
}

async fn run_program(
    program: &str,
    args: &[String],
    stdin: Option<&str>,
) -> Result<GhOutput, GhError> {
    let subcommand = describe(args);
    tracing::debug!(program, command = %subcommand, "running gh");

    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| GhError::Spawn {
            subcommand: subcommand.clone(),
            source,
        })?;

    // Written alongside the output drain; the pipe is dropped afterwards so
    // the child sees EOF.
    let pipe = child.stdin.take();
    let feed = async move {
        if let (Some(input), Some(mut pipe)) = (stdin, pipe) {
            pipe.write_all(input.as_bytes()).await?;
        }
        Ok::<(), std::io::Error>(())
    };
    let (fed, output) = tokio::join!(feed, child.wait_with_output());

    let output = output.map_err(|source| GhError::Spawn {
        subcommand: subcommand.clone(),
        source,
    })?;
    fed.map_err(|source| GhError::Spawn {
        subcommand: subcommand.clone(),
        source,
    })?;

    let gh_output = GhOutput::from_output(&output);

    if output.status.success() {
        Ok(gh_output)
    } else {
        let message = if gh_output.stderr.is_empty() {
            gh_output.stdout
        } else {
            gh_output.stderr
        };
        Err(GhError::Failed {
            subcommand,
            code: output.status.code().unwrap_or(-1),
            message,
        })
    }
}

/// Append `--repo <slug>` when a repository is configured.
pub fn with_repo(mut args: Vec<String>, repository: Option<&str>) -> Vec<String> {
    if let Some(repo) = repository.filter(|r| !r.trim().is_empty()) {
        args.push("--repo".to_string());
        args.push(repo.to_string());
    }
    args
}

/// First two arguments, for log lines and error messages (`issue view`).
fn describe(args: &[String]) -> String {
    args.iter()
        .take(2)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}
