//! API client module
//!
//! This module provides HTTP client functionality to interact with the gentask API server.

use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::{Client as ReqwestClient, Error as ReqwestError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ai::TaskSuggestion;
use crate::models::{Project, Task, TaskDraft, View};
use crate::views::ResolvedView;

/// API client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Generic API response structure
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] ReqwestError),

    #[error("API error: {0}")]
    Api(String),

    #[error("Missing data in response")]
    MissingData,
}

/// API client for the gentask service
#[derive(Debug, Clone)]
pub struct Client {
    http_client: Arc<ReqwestClient>,
    config: ClientConfig,
}

impl Client {
    /// Create a new client with default configuration
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            http_client: Arc::new(ReqwestClient::new()),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    // Unwraps the standard response envelope.
    fn unwrap_response<T>(api_response: ApiResponse<T>) -> Result<T, ClientError> {
        if api_response.success {
            api_response.data.ok_or(ClientError::MissingData)
        } else {
            Err(ClientError::Api(
                api_response
                    .error
                    .unwrap_or_else(|| "Unknown API error".to_string()),
            ))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.http_client.get(self.url(path)).send().await?;
        let api_response: ApiResponse<T> = response.json().await?;
        Self::unwrap_response(api_response)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self
            .http_client
            .post(self.url(path))
            .json(body)
            .send()
            .await?;
        let api_response: ApiResponse<T> = response.json().await?;
        Self::unwrap_response(api_response)
    }

    /// Get the full task set
    pub async fn list_tasks(&self) -> Result<Vec<Task>, ClientError> {
        self.get_json("/api/tasks").await
    }

    /// Add a new task from a draft
    pub async fn add_task(&self, draft: &TaskDraft) -> Result<Task, ClientError> {
        self.post_json("/api/tasks", draft).await
    }

    /// Toggle a task's completion flag. Returns false when the id is unknown
    /// (the server treats that as a no-op).
    pub async fn toggle_task(&self, id: &str) -> Result<bool, ClientError> {
        self.post_json(&format!("/api/tasks/{}/toggle", id), &()).await
    }

    /// Delete a task. Returns false when the id is unknown.
    pub async fn delete_task(&self, id: &str) -> Result<bool, ClientError> {
        let response = self
            .http_client
            .delete(self.url(&format!("/api/tasks/{}", id)))
            .send()
            .await?;
        let api_response: ApiResponse<bool> = response.json().await?;
        Self::unwrap_response(api_response)
    }

    /// List the user-facing projects (the reserved inbox is excluded)
    pub async fn list_projects(&self) -> Result<Vec<Project>, ClientError> {
        self.get_json("/api/projects").await
    }

    /// Add a new project
    pub async fn add_project(&self, name: &str, color: &str) -> Result<Project, ClientError> {
        #[derive(Serialize)]
        struct AddProjectRequest<'a> {
            name: &'a str,
            color: &'a str,
        }

        self.post_json("/api/projects", &AddProjectRequest { name, color })
            .await
    }

    /// Resolve a view on the server
    pub async fn resolve_view(
        &self,
        view: &View,
        search: Option<&str>,
        today: Option<NaiveDate>,
    ) -> Result<ResolvedView, ClientError> {
        let mut path = format!("/api/views/{}?", view.token());
        if let Some(search) = search {
            path.push_str(&format!("search={}&", urlencode(search)));
        }
        if let Some(today) = today {
            path.push_str(&format!("today={}&", today));
        }
        self.get_json(path.trim_end_matches(&['?', '&'][..])).await
    }

    /// Parse free text into a task suggestion. `Ok(None)` means the
    /// assistant could not produce one; keep the prior form values.
    pub async fn parse_free_text(&self, input: &str) -> Result<Option<TaskSuggestion>, ClientError> {
        #[derive(Serialize)]
        struct ParseRequest<'a> {
            input: &'a str,
        }

        let response = self
            .http_client
            .post(self.url("/api/ai/parse"))
            .json(&ParseRequest { input })
            .send()
            .await?;
        let api_response: ApiResponse<Option<TaskSuggestion>> = response.json().await?;

        // A null payload is a valid "no suggestion" outcome, not MissingData.
        if api_response.success {
            Ok(api_response.data.flatten())
        } else {
            Err(ClientError::Api(
                api_response
                    .error
                    .unwrap_or_else(|| "Unknown API error".to_string()),
            ))
        }
    }

    /// Fetch a productivity tip
    pub async fn suggest_tip(&self) -> Result<String, ClientError> {
        self.get_json("/api/ai/tip").await
    }

    /// Rewrite a task title for clarity
    pub async fn refine_title(&self, text: &str) -> Result<String, ClientError> {
        #[derive(Serialize)]
        struct RefineRequest<'a> {
            text: &'a str,
        }

        self.post_json("/api/ai/refine", &RefineRequest { text })
            .await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

// Minimal percent-encoding for query values; enough for search strings.
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urlencode_passthrough_and_escapes() {
        assert_eq!(urlencode("plain"), "plain");
        assert_eq!(urlencode("two words"), "two%20words");
        assert_eq!(urlencode("a&b=c"), "a%26b%3Dc");
    }
}
