//! AI assistant for gentask
//!
//! This module provides best-effort natural-language helpers backed by a
//! hosted language-model API. Every operation degrades to a safe default on
//! failure: the parser returns `None`, the tip falls back to a canned
//! string, and the title rewriter echoes its input. Errors never reach the
//! caller. The View Resolver has no dependency on anything in this module.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::{Priority, Project, Task};

/// Advisory string used whenever the tip call fails.
pub const DEFAULT_TIP: &str = "Focus on your most important task today!";

// Only the most recent pending tasks are sent with a tip request.
const TIP_TASK_LIMIT: usize = 10;

/// Structured task fields extracted from free text. Every field other than
/// the title is optional; callers preserve their prior form values when a
/// field is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSuggestion {
    #[serde(rename = "content")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "dueDate", default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(rename = "projectId", default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

/// Stateless natural-language helper consumed by the presentation layer.
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Best-effort structured extraction from free text. `None` on any
    /// failure, network or malformed response alike.
    async fn parse_free_text(&self, input: &str, projects: &[Project]) -> Option<TaskSuggestion>;

    /// Short advisory string for the given pending tasks. Falls back to
    /// [`DEFAULT_TIP`], never an error.
    async fn suggest_tip(&self, pending: &[Task]) -> String;

    /// Rewrites a task title for clarity. Returns the input unchanged on
    /// failure.
    async fn refine_title(&self, text: &str) -> String;
}

/// Assistant errors (internal; the trait surface swallows them)
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed model response: {0}")]
    Malformed(String),
}

/// Assistant configuration
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl AssistantConfig {
    /// Reads the API key from `GEMINI_API_KEY`; model and base URL keep
    /// their defaults unless overridden by the caller.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            ..Self::default()
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-3-flash-preview".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

/// Assistant backed by the Gemini generateContent endpoint.
#[derive(Debug, Clone)]
pub struct GeminiAssistant {
    http: Arc<HttpClient>,
    config: AssistantConfig,
}

impl GeminiAssistant {
    pub fn new(config: AssistantConfig) -> Self {
        Self {
            http: Arc::new(HttpClient::new()),
            config,
        }
    }

    /// Sends one generateContent request and returns the first candidate's
    /// text.
    async fn generate(&self, body: serde_json::Value) -> Result<String, AssistantError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let payload: GenerateContentResponse = response.json().await?;
        payload
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| AssistantError::Malformed("response contained no candidates".into()))
    }

    async fn try_parse(
        &self,
        input: &str,
        projects: &[Project],
    ) -> Result<TaskSuggestion, AssistantError> {
        let project_list = projects
            .iter()
            .map(|p| format!("{} (id: {})", p.name, p.id))
            .collect::<Vec<_>>()
            .join(", ");

        let prompt = format!(
            "Parse this task input into structured data: \"{input}\".\n\
             Current Date: {today}.\n\n\
             Rules:\n\
             - 'priority' should be 1 (urgent) to 4 (normal).\n\
             - 'dueDate' should be in YYYY-MM-DD format if mentioned.\n\
             - Default priority is 4.\n\
             - 'content' is the main task title.\n\
             - 'projectId' may only be one of the known project ids: {project_list}.",
            input = input,
            today = Utc::now().date_naive(),
            project_list = project_list,
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "content": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "dueDate": { "type": "STRING", "description": "YYYY-MM-DD" },
                        "priority": { "type": "INTEGER" },
                        "projectId": { "type": "STRING" },
                    },
                    "required": ["content"]
                }
            }
        });

        let text = self.generate(body).await?;
        serde_json::from_str(text.trim())
            .map_err(|err| AssistantError::Malformed(err.to_string()))
    }

    async fn try_tip(&self, pending: &[Task]) -> Result<String, AssistantError> {
        let sample: Vec<&Task> = pending.iter().take(TIP_TASK_LIMIT).collect();
        let prompt = format!(
            "Based on these tasks: {}, give a one-sentence productivity tip \
             or encouragement. Keep it under 20 words.",
            serde_json::to_string(&sample)
                .map_err(|err| AssistantError::Malformed(err.to_string()))?
        );

        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        Ok(self.generate(body).await?.trim().to_string())
    }

    async fn try_refine(&self, text: &str) -> Result<String, AssistantError> {
        let prompt = format!(
            "Rewrite this task title so it is clear and actionable. Reply \
             with the rewritten title only, no quotes: \"{}\"",
            text
        );

        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        Ok(self.generate(body).await?.trim().to_string())
    }
}

#[async_trait]
impl Assistant for GeminiAssistant {
    async fn parse_free_text(&self, input: &str, projects: &[Project]) -> Option<TaskSuggestion> {
        match self.try_parse(input, projects).await {
            Ok(suggestion) => Some(suggestion),
            Err(err) => {
                tracing::warn!(error = %err, "free-text parse failed");
                None
            }
        }
    }

    async fn suggest_tip(&self, pending: &[Task]) -> String {
        match self.try_tip(pending).await {
            Ok(tip) if !tip.is_empty() => tip,
            Ok(_) => DEFAULT_TIP.to_string(),
            Err(err) => {
                tracing::warn!(error = %err, "tip request failed");
                DEFAULT_TIP.to_string()
            }
        }
    }

    async fn refine_title(&self, text: &str) -> String {
        match self.try_refine(text).await {
            Ok(refined) if !refined.is_empty() => refined,
            Ok(_) => text.to_string(),
            Err(err) => {
                tracing::warn!(error = %err, "title refinement failed");
                text.to_string()
            }
        }
    }
}

// Wire shape of a generateContent response; only the fields we read.
#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

/// Monotonic request generations for in-flight assistant calls.
///
/// Assistant requests are never cancelled, so two overlapping calls can
/// finish out of order. Each caller takes a generation with [`begin`] before
/// issuing its request and checks [`is_current`] before applying the result;
/// a response belonging to a superseded generation is dropped.
///
/// [`begin`]: RequestSeq::begin
/// [`is_current`]: RequestSeq::is_current
#[derive(Debug, Default)]
pub struct RequestSeq(AtomicU64);

impl RequestSeq {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation, superseding all earlier ones.
    pub fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// True while no later generation has begun.
    pub fn is_current(&self, generation: u64) -> bool {
        self.0.load(Ordering::SeqCst) == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_suggestion_parses_model_json() {
        let suggestion: TaskSuggestion = serde_json::from_str(
            r#"{"content":"Call Jane","description":"about the offsite","dueDate":"2024-05-02","priority":1}"#,
        )
        .unwrap();

        assert_eq!(suggestion.title, "Call Jane");
        assert_eq!(suggestion.description.as_deref(), Some("about the offsite"));
        assert_eq!(
            suggestion.due_date,
            NaiveDate::from_ymd_opt(2024, 5, 2)
        );
        assert_eq!(suggestion.priority, Some(Priority::P1));
        assert_eq!(suggestion.project_id, None);
    }

    #[test]
    fn test_suggestion_tolerates_missing_optional_fields() {
        let suggestion: TaskSuggestion =
            serde_json::from_str(r#"{"content":"Water the plants"}"#).unwrap();

        assert_eq!(suggestion.title, "Water the plants");
        assert!(suggestion.description.is_none());
        assert!(suggestion.due_date.is_none());
        assert!(suggestion.priority.is_none());
        assert!(suggestion.project_id.is_none());
    }

    #[test]
    fn test_suggestion_rejects_out_of_range_priority() {
        let result: Result<TaskSuggestion, _> =
            serde_json::from_str(r#"{"content":"Bad","priority":7}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_request_seq_latest_wins() {
        let seq = RequestSeq::new();

        let first = seq.begin();
        assert!(seq.is_current(first));

        let second = seq.begin();
        assert!(!seq.is_current(first), "superseded generation must lose");
        assert!(seq.is_current(second));
    }
}
