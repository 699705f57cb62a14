//! Agent response post-processing.
//!
//! Turns one raw agent answer into what gets published: the normalized text,
//! a copy with every mention defused, the mentions found, and (when a
//! dispatcher is supplied) the result of waking the agents it asked for.

use crate::config::FormatRules;
use crate::dispatch::Dispatcher;
use crate::mention::{clean_mentions_in_text, extract_mentions};
use crate::normalize::normalize;
use crate::tracker::Issue;
use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Agent output as received from a backend or read from disk.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    /// Plain text.
    Text(String),
    /// A JSON record whose `response` field holds the text. Other fields
    /// (`cost_usd`, `num_turns`, ...) ride along untouched.
    Structured(Map<String, Value>),
}

impl RawResponse {
    /// Read a response: a JSON object becomes [`RawResponse::Structured`],
    /// anything else is taken as text.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim_start();
        if trimmed.starts_with('{')
            && let Ok(Value::Object(record)) = serde_json::from_str::<Value>(trimmed)
        {
            return RawResponse::Structured(record);
        }
        RawResponse::Text(input.to_string())
    }

    /// The response text.
    ///
    /// For a record this is its `response` string; a non-string `response`
    /// renders as JSON, and a record without one renders whole.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            RawResponse::Text(text) => Cow::Borrowed(text),
            RawResponse::Structured(record) => match record.get("response") {
                Some(Value::String(text)) => Cow::Borrowed(text),
                Some(other) => Cow::Owned(other.to_string()),
                None => Cow::Owned(Value::Object(record.clone()).to_string()),
            },
        }
    }
}

impl From<String> for RawResponse {
    fn from(text: String) -> Self {
        RawResponse::Text(text)
    }
}

impl From<&str> for RawResponse {
    fn from(text: &str) -> Self {
        RawResponse::Text(text.to_string())
    }
}

/// Everything derived from one agent response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessedResponse {
    pub agent_name: String,
    /// Normalized text, the form that is published.
    pub response: String,
    /// Text as the agent wrote it.
    pub raw_response: String,
    /// `response` with every `@name` rewritten to `user name`.
    pub clean_response: String,
    /// Every mention in the raw text, inline and machine block.
    pub mentions: Vec<String>,
    pub allowed_mentions: Vec<String>,
    pub filtered_mentions: Vec<String>,
    pub dispatch_results: BTreeMap<String, bool>,
    pub format_warnings: Vec<String>,
}

impl ProcessedResponse {
    /// Wake the agents this response asks for and record the outcome.
    ///
    /// Does nothing when the response mentions nobody.
    pub async fn dispatch(&mut self, dispatcher: &Dispatcher<'_>, issue: &Issue) {
        if self.mentions.is_empty() {
            return;
        }
        info!(
            agent = %self.agent_name,
            mentions = self.mentions.len(),
            "response mentions other agents"
        );

        let report = dispatcher
            .dispatch(&self.response, &self.agent_name, issue)
            .await;
        self.dispatch_results = report.outcomes;
        self.allowed_mentions = report.allowed;
        self.filtered_mentions = report.filtered;
    }
}

/// Post-process one agent response.
///
/// # Arguments
///
/// * `agent_name` - Agent that wrote the response
/// * `raw` - The response as received
/// * `issue` - Issue the response belongs to
/// * `rules` - Normalizer format rules
/// * `dispatcher` - When given, mentioned agents are woken
///
/// # Returns
///
/// The processed response. Never fails: format problems become
/// `format_warnings` and trigger failures become `false` results.
pub async fn process_agent_response(
    agent_name: &str,
    raw: &RawResponse,
    issue: &Issue,
    rules: &FormatRules,
    dispatcher: Option<&Dispatcher<'_>>,
) -> ProcessedResponse {
    let raw_text = raw.text().into_owned();

    let (normalization, format_warnings) = normalize(&raw_text, agent_name, rules);
    if !format_warnings.is_empty() {
        warn!(
            agent = agent_name,
            warnings = %format_warnings.join("; "),
            "response format warnings"
        );
    }
    let response = normalization.into_text();

    let mut processed = ProcessedResponse {
        agent_name: agent_name.to_string(),
        clean_response: clean_mentions_in_text(&response),
        mentions: extract_mentions(&raw_text),
        response,
        raw_response: raw_text,
        format_warnings,
        ..Default::default()
    };

    if let Some(dispatcher) = dispatcher {
        processed.dispatch(dispatcher, issue).await;
    }

    processed
}
