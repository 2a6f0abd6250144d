//! GenTask library crate
//!
//! A single-user, Todoist-style task manager: an HTTP API with a
//! server-rendered web UI, JSON document persistence, and optional
//! AI-assisted task entry backed by a hosted language model.
//!
//! The heart of the crate is [`views::resolve_view`], a pure derivation from
//! the full task set, the selected [`models::View`], the caller-supplied
//! "today", and an optional search filter to the lists the UI displays.
//! Everything around it — storage, the assistant, the HTTP surface — sits
//! behind the seams in [`store`] and [`ai`].

pub mod ai;
pub mod api;
pub mod cli;
pub mod models;
pub mod store;
pub mod views;

// Re-export the types most callers need
pub use ai::{Assistant, AssistantConfig, GeminiAssistant, TaskSuggestion, DEFAULT_TIP};
pub use models::{
    default_projects, AppState, Core, Priority, Project, Task, TaskDraft, View,
    ACCENT_COLOR, INBOX_PROJECT_ID, UNTITLED_TASK,
};
pub use store::{JsonFileStore, MemoryStore, Store, StoreError};
pub use views::{resolve_view, ResolvedView};
