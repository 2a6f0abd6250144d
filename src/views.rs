//! View resolution for gentask
//!
//! This module derives the list of tasks to display from the full task set,
//! the selected view, and an optional search filter. It is a pure derivation:
//! it never mutates the task or project sets and is safe to re-run any number
//! of times for the same inputs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Project, Task, View, ACCENT_COLOR, INBOX_PROJECT_ID};

/// The derived, disposable display state for one view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedView {
    /// Matched tasks that are not yet completed, sorted ascending by
    /// priority. Ties keep input order, so within a priority the newest
    /// task comes first.
    pub pending: Vec<Task>,
    /// Matched tasks that are completed, in input order.
    pub completed: Vec<Task>,
    /// Heading for the view: the project name, or the capitalized token.
    pub title: String,
    /// Heading color: the project color, or the fixed accent color.
    pub color: String,
}

/// Resolves the active view.
///
/// `today` is supplied by the caller rather than read from a clock so the
/// operation is deterministic. The search query is an optional
/// case-insensitive substring filter over title and description; an empty
/// query matches everything.
pub fn resolve_view(
    tasks: &[Task],
    projects: &[Project],
    view: &View,
    today: NaiveDate,
    search: &str,
) -> ResolvedView {
    let needle = search.trim().to_lowercase();

    let mut pending = Vec::new();
    let mut completed = Vec::new();
    for task in tasks {
        if !in_view(task, view, today) {
            continue;
        }
        if !needle.is_empty() && !matches_search(task, &needle) {
            continue;
        }
        if task.completed {
            completed.push(task.clone());
        } else {
            pending.push(task.clone());
        }
    }

    // Stable: equal priorities keep their relative input order.
    pending.sort_by_key(|t| t.priority);

    let (title, color) = view_heading(projects, view);

    ResolvedView {
        pending,
        completed,
        title,
        color,
    }
}

/// View membership for one task.
fn in_view(task: &Task, view: &View, today: NaiveDate) -> bool {
    match view {
        View::Inbox => task.project_id == INBOX_PROJECT_ID,
        View::Today => task.due_date == Some(today),
        // Strictly later than today; tasks without a due date never match.
        View::Upcoming => task.due_date.map_or(false, |due| due > today),
        View::Project(id) => task.project_id == *id,
    }
}

/// Case-insensitive substring match on title or description.
/// `needle` must already be lowercased.
fn matches_search(task: &Task, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle)
        || task.description.to_lowercase().contains(needle)
}

/// Heading lookup. Runs after filtering but is independent of it: a selector
/// naming an existing project uses that project's name and color, anything
/// else falls back to the capitalized token and the accent color.
fn view_heading(projects: &[Project], view: &View) -> (String, String) {
    let token = view.token();
    match projects.iter().find(|p| p.id == token) {
        Some(project) => (project.name.clone(), project.color.clone()),
        None => (capitalize(token), ACCENT_COLOR.to_string()),
    }
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
