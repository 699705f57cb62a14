//! Agent backends.
//!
//! An [`AgentBackend`] turns a prompt into an answer for one named agent.
//! [`CommandBackend`] does it by running the agent's configured command with
//! the prompt on standard input.

use super::config::{AgentsConfig, OutputFormat, ResolvedAgent};
use super::template::{TemplateError, render_template, vars};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Longest stderr excerpt carried in an error.
const STDERR_EXCERPT_CHARS: usize = 500;

/// Errors raised while invoking an agent.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("agent command template for '{agent}' is invalid: {source}")]
    Template {
        agent: String,
        #[source]
        source: TemplateError,
    },

    #[error("failed to parse agent command '{command}': {message}")]
    InvalidCommand { command: String, message: String },

    #[error("agent command for '{agent}' is empty")]
    EmptyCommand { agent: String },

    #[error("failed to execute agent command '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("agent '{agent}' exited with code {code}: {stderr}")]
    Exited {
        agent: String,
        code: i32,
        stderr: String,
    },

    #[error("agent '{agent}' returned no text")]
    EmptyResponse { agent: String },

    /// Failure reported by a backend that is not process based.
    #[error("{0}")]
    Other(String),
}

/// Text-in, text-out access to an agent.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Ask `agent` to answer `prompt`.
    async fn invoke(&self, prompt: &str, agent: &str) -> Result<String, BackendError>;
}

/// Backend running each agent's configured command.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    config: AgentsConfig,
    prompts_dir: Option<PathBuf>,
}

impl CommandBackend {
    /// # Arguments
    ///
    /// * `config` - Agent roster and defaults
    /// * `prompts_dir` - Directory holding `<agent>.md` persona files
    pub fn new(config: AgentsConfig, prompts_dir: Option<PathBuf>) -> Self {
        Self {
            config,
            prompts_dir,
        }
    }

    /// Persona text for `agent`, empty when no persona file exists.
    async fn persona(&self, agent: &str) -> String {
        let Some(dir) = &self.prompts_dir else {
            return String::new();
        };
        let path = dir.join(format!("{}.md", agent));
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(_) => {
                debug!(agent, path = %path.display(), "no persona file");
                String::new()
            }
        }
    }
}

#[async_trait]
impl AgentBackend for CommandBackend {
    async fn invoke(&self, prompt: &str, agent: &str) -> Result<String, BackendError> {
        let resolved = self.config.resolve(agent);
        let args = command_args(&resolved)?;
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| BackendError::EmptyCommand {
                agent: agent.to_string(),
            })?;

        let persona = self.persona(agent).await;
        let input = if persona.trim().is_empty() {
            prompt.to_string()
        } else {
            format!("{}\n\n{}", persona.trim_end(), prompt)
        };

        debug!(agent, program = %program, "starting agent command");
        let mut child = Command::new(program)
            .args(rest)
            .envs(&resolved.environment)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BackendError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Feed stdin while stdout and stderr drain; a command that echoes
        // its input would otherwise fill the pipes and stall both sides. A
        // command may also exit without reading its input; its exit status
        // is reported below instead of the broken pipe.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(input.as_bytes()).await {
                    Err(err) if err.kind() != std::io::ErrorKind::BrokenPipe => return Err(err),
                    _ => {}
                }
            }
            Ok(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output = output.map_err(|source| BackendError::Spawn {
            program: program.clone(),
            source,
        })?;
        fed.map_err(|source| BackendError::Spawn {
            program: program.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::Exited {
                agent: agent.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: tail(stderr.trim(), STDERR_EXCERPT_CHARS),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = match resolved.output {
            OutputFormat::Text => stdout.trim().to_string(),
            OutputFormat::StreamJson => assistant_text(&stdout),
        };

        if text.trim().is_empty() {
            return Err(BackendError::EmptyResponse {
                agent: agent.to_string(),
            });
        }
        Ok(text)
    }
}

/// Render the command template for `agent` and split it into arguments.
fn command_args(agent: &ResolvedAgent) -> Result<Vec<String>, BackendError> {
    let command = render_template(&agent.command, &vars([("agent", agent.name.as_str())]))
        .map_err(|source| BackendError::Template {
            agent: agent.name.clone(),
            source,
        })?;

    shell_words::split(&command).map_err(|e| BackendError::InvalidCommand {
        command: command.clone(),
        message: format!("{} (check for unmatched quotes)", e),
    })
}

/// Collect the answer from `stream-json` output.
///
/// Text blocks of `assistant` messages are joined with newlines in stream
/// order. When there are none, the final `result` event's text is used.
/// Lines that are not JSON are skipped.
pub(crate) fn assistant_text(stdout: &str) -> String {
    let mut blocks = Vec::new();
    let mut result = None;

    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Ok(event) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        match event.get("type").and_then(Value::as_str) {
            Some("assistant") => {
                let content = event
                    .pointer("/message/content")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten();
                for block in content {
                    if block.get("type").and_then(Value::as_str) == Some("text")
                        && let Some(text) = block.get("text").and_then(Value::as_str)
                    {
                        blocks.push(text.to_string());
                    }
                }
            }
            Some("result") => {
                result = event
                    .get("result")
                    .and_then(Value::as_str)
                    .map(str::to_string);
            }
            _ => {}
        }
    }

    if blocks.is_empty() {
        result.unwrap_or_default()
    } else {
        blocks.join("\n")
    }
}

fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_text_joins_text_blocks() {
        let stdout = r#"{"type":"system","subtype":"init"}
{"type":"assistant","message":{"content":[{"type":"text","text":"Hello"},{"type":"tool_use","name":"Read"}]}}
not json at all
{"type":"assistant","message":{"content":[{"type":"text","text":"World"}]}}
{"type":"result","result":"Hello\nWorld"}
"#;
        assert_eq!(assistant_text(stdout), "Hello\nWorld");
    }

    #[test]
    fn assistant_text_falls_back_to_result() {
        let stdout = r#"{"type":"result","result":"Only the result"}"#;
        assert_eq!(assistant_text(stdout), "Only the result");
    }

    #[test]
    fn assistant_text_empty_stream() {
        assert_eq!(assistant_text(""), "");
    }

    #[test]
    fn command_args_substitutes_agent() {
        let config = AgentsConfig::from_yaml(
            "agents:\n  moderator:\n    command: \"ask --persona {agent} --flag 'two words'\"\n",
        )
        .unwrap();
        let args = command_args(&config.resolve("moderator")).unwrap();
        assert_eq!(args, vec!["ask", "--persona", "moderator", "--flag", "two words"]);
    }

    #[test]
    fn command_args_reports_unbalanced_quotes() {
        let config =
            AgentsConfig::from_yaml("agents:\n  moderator:\n    command: \"ask 'oops\"\n").unwrap();
        let err = command_args(&config.resolve("moderator")).unwrap_err();
        assert!(matches!(err, BackendError::InvalidCommand { .. }));
    }

    #[test]
    fn tail_keeps_last_chars() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("ab", 3), "ab");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_backend_text_output() {
        let config = AgentsConfig::from_yaml(
            "agents:\n  echo:\n    command: \"cat\"\n    output: text\n",
        )
        .unwrap();
        let backend = CommandBackend::new(config, None);
        let answer = backend.invoke("ping from stdin", "echo").await.unwrap();
        assert_eq!(answer, "ping from stdin");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_backend_streams_large_prompt_through_echoing_command() {
        let config = AgentsConfig::from_yaml(
            "agents:\n  echo:\n    command: \"cat\"\n    output: text\n",
        )
        .unwrap();
        let backend = CommandBackend::new(config, None);
        let prompt = "x".repeat(512 * 1024);

        let answer = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            backend.invoke(&prompt, "echo"),
        )
        .await
        .expect("echoing a large prompt should not stall")
        .unwrap();
        assert_eq!(answer.len(), prompt.len());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_backend_prepends_persona() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("echo.md"), "You are terse.\n").unwrap();
        let config = AgentsConfig::from_yaml(
            "agents:\n  echo:\n    command: \"cat\"\n    output: text\n",
        )
        .unwrap();
        let backend = CommandBackend::new(config, Some(temp.path().to_path_buf()));
        let answer = backend.invoke("Question?", "echo").await.unwrap();
        assert_eq!(answer, "You are terse.\n\nQuestion?");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_backend_reports_exit_code() {
        let config = AgentsConfig::from_yaml(
            "agents:\n  broken:\n    command: \"sh -c 'echo boom >&2; exit 3'\"\n    output: text\n",
        )
        .unwrap();
        let backend = CommandBackend::new(config, None);
        let err = backend.invoke("x", "broken").await.unwrap_err();
        match err {
            BackendError::Exited { code, stderr, .. } => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_backend_missing_program() {
        let config = AgentsConfig::from_yaml(
            "agents:\n  ghost:\n    command: \"parley-no-such-program-xyz\"\n",
        )
        .unwrap();
        let backend = CommandBackend::new(config, None);
        let err = backend.invoke("x", "ghost").await.unwrap_err();
        assert!(matches!(err, BackendError::Spawn { .. }));
    }
}
