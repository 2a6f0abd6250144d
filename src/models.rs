//! Core models for the gentask library
//!
//! This module contains the core data types and business logic for the gentask tool.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::store::Store;
use crate::views::{resolve_view, ResolvedView};

/// The reserved project every task falls back to.
pub const INBOX_PROJECT_ID: &str = "inbox";

/// Title substituted when a task is added with a blank title.
pub const UNTITLED_TASK: &str = "Untitled Task";

/// Accent color used for the reserved views and the UI chrome.
pub const ACCENT_COLOR: &str = "#db4c3f";

lazy_static! {
    static ref DEFAULT_PROJECTS: Vec<Project> = vec![
        Project {
            id: INBOX_PROJECT_ID.to_string(),
            name: "Inbox".to_string(),
            color: ACCENT_COLOR.to_string(),
            icon: Some("inbox".to_string()),
        },
        Project {
            id: "work".to_string(),
            name: "Work".to_string(),
            color: "#246fe0".to_string(),
            icon: Some("briefcase".to_string()),
        },
        Project {
            id: "personal".to_string(),
            name: "Personal".to_string(),
            color: "#299438".to_string(),
            icon: Some("home".to_string()),
        },
        Project {
            id: "shopping".to_string(),
            name: "Shopping".to_string(),
            color: "#eb8909".to_string(),
            icon: None,
        },
    ];
}

/// Returns the seed project set: the reserved inbox plus a small starter set.
pub fn default_projects() -> Vec<Project> {
    DEFAULT_PROJECTS.clone()
}

/// Ordinal urgency rank. 1 is the most urgent, 4 the least.
///
/// Persisted documents and the AI response schema both carry the bare integer,
/// so the enum round-trips through `u8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    P1,
    P2,
    P3,
    P4,
}

impl Priority {
    /// Display color for this priority. Total over the four values.
    pub fn color(&self) -> &'static str {
        match self {
            Priority::P1 => "#d1453b",
            Priority::P2 => "#eb8909",
            Priority::P3 => "#246fe0",
            Priority::P4 => "#808080",
        }
    }

    /// The numeric rank, 1..=4.
    pub fn rank(&self) -> u8 {
        (*self).into()
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::P4
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> u8 {
        match priority {
            Priority::P1 => 1,
            Priority::P2 => 2,
            Priority::P3 => 3,
            Priority::P4 => 4,
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::P1),
            2 => Ok(Priority::P2),
            3 => Ok(Priority::P3),
            4 => Ok(Priority::P4),
            other => Err(format!("priority must be 1..=4, got {}", other)),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s
            .parse()
            .map_err(|_| format!("priority must be 1..=4, got '{}'", s))?;
        Priority::try_from(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rank())
    }
}

/// A single task. Field names in the serialized form match the original
/// document layout (`content`, `dueDate`, `projectId`, `isCompleted`,
/// `createdAt` as epoch milliseconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(rename = "content")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "dueDate", default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(rename = "isCompleted")]
    pub completed: bool,
    #[serde(rename = "createdAt", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// A user project. The `"inbox"` id is reserved and excluded from
/// user-facing listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// The current filter context controlling which tasks are displayed.
///
/// A closed variant rather than a raw string so view matching is exhaustive.
/// Any token other than the three reserved ones names a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum View {
    Inbox,
    Today,
    Upcoming,
    Project(String),
}

impl View {
    /// The string token for this view: the reserved word or the project id.
    pub fn token(&self) -> &str {
        match self {
            View::Inbox => "inbox",
            View::Today => "today",
            View::Upcoming => "upcoming",
            View::Project(id) => id,
        }
    }
}

impl From<String> for View {
    fn from(token: String) -> Self {
        match token.as_str() {
            "inbox" => View::Inbox,
            "today" => View::Today,
            "upcoming" => View::Upcoming,
            _ => View::Project(token),
        }
    }
}

impl From<View> for String {
    fn from(view: View) -> String {
        view.token().to_string()
    }
}

impl FromStr for View {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(View::from(s.to_string()))
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Partial task input for the add operation. Everything is optional; the
/// defaults in [`AppState::add_task`] fill in the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDraft {
    #[serde(rename = "content", default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "dueDate", default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(rename = "projectId", default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

/// The full task and project sets, owned explicitly and passed to the
/// resolver and mutation operations rather than living in ambient state.
pub struct AppState {
    tasks: Vec<Task>,
    projects: Vec<Project>,
    rng: StdRng,
}

impl AppState {
    /// Creates application state from previously loaded documents.
    pub fn new(tasks: Vec<Task>, projects: Vec<Project>) -> Self {
        Self {
            tasks,
            projects,
            rng: StdRng::from_entropy(),
        }
    }

    /// First-run state: no tasks, the default project seed.
    pub fn seeded() -> Self {
        Self::new(Vec::new(), default_projects())
    }

    /// The full task set, newest first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// The full project set, including the reserved inbox.
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// The user-facing project list; the reserved inbox is excluded.
    pub fn user_projects(&self) -> Vec<Project> {
        self.projects
            .iter()
            .filter(|p| p.id != INBOX_PROJECT_ID)
            .cloned()
            .collect()
    }

    /// Adds a task, filling in defaults for anything the draft leaves out,
    /// and prepends it to the task set. Newest-first is the set's natural
    /// order; the resolver's stable sort depends on it.
    pub fn add_task(&mut self, draft: TaskDraft) -> Task {
        let title = if draft.title.trim().is_empty() {
            UNTITLED_TASK.to_string()
        } else {
            draft.title
        };
        let project_id = draft
            .project_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| INBOX_PROJECT_ID.to_string());

        let task = Task {
            id: generate_id(&mut self.rng),
            title,
            description: draft.description,
            due_date: draft.due_date,
            priority: draft.priority.unwrap_or_default(),
            project_id,
            completed: false,
            created_at: Utc::now(),
        };
        self.tasks.insert(0, task.clone());
        task
    }

    /// Flips the completion flag on the task with the given id.
    /// Returns false (a no-op) when the id is absent.
    pub fn toggle_task(&mut self, id: &str) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.completed = !task.completed;
                true
            }
            None => false,
        }
    }

    /// Removes the task with the given id. Returns false when absent.
    pub fn delete_task(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    /// Appends a project with a generated id. A blank name is rejected and
    /// nothing changes.
    pub fn add_project(&mut self, name: &str, color: &str) -> Option<Project> {
        if name.trim().is_empty() {
            return None;
        }
        let project = Project {
            id: generate_id(&mut self.rng),
            name: name.to_string(),
            color: color.to_string(),
            icon: None,
        };
        self.projects.push(project.clone());
        Some(project)
    }

    /// Number of not-yet-completed tasks in the inbox. Used by the sidebar.
    pub fn pending_inbox_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.project_id == INBOX_PROJECT_ID && !t.completed)
            .count()
    }

    /// Number of not-yet-completed tasks due on the given date.
    pub fn pending_due_count(&self, today: NaiveDate) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.due_date == Some(today) && !t.completed)
            .count()
    }
}

/// Generates an opaque 9-character base-36 identifier. Collisions are
/// accepted as negligible and not checked.
fn generate_id(rng: &mut StdRng) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Shared handle over the application state.
///
/// All mutations run to completion under the lock, one event at a time; each
/// one re-persists the affected document through the store and notifies SSE
/// subscribers. Store failures are logged and never halt a mutation.
#[derive(Clone)]
pub struct Core {
    inner: Arc<Mutex<AppState>>,
    store: Arc<dyn Store>,
    update_tx: Arc<tokio::sync::broadcast::Sender<()>>,
}

impl Core {
    pub fn new(state: AppState, store: Arc<dyn Store>) -> Self {
        // Create a broadcast channel with capacity for 100 messages
        let (tx, _rx) = tokio::sync::broadcast::channel(100);

        Self {
            inner: Arc::new(Mutex::new(state)),
            store,
            update_tx: Arc::new(tx),
        }
    }

    /// Loads both documents from the store, seeding defaults for whichever
    /// is absent. Run once at startup.
    pub fn load(store: Arc<dyn Store>) -> Result<Self, crate::store::StoreError> {
        let tasks = store.load_tasks()?.unwrap_or_default();
        let projects = match store.load_projects()? {
            Some(projects) => projects,
            None => {
                let seeded = default_projects();
                store.save_projects(&seeded)?;
                tracing::info!(count = seeded.len(), "seeded default projects");
                seeded
            }
        };
        Ok(Self::new(AppState::new(tasks, projects), store))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AppState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // Helper for task mutations: apply, re-persist the tasks document,
    // notify observers.
    fn with_tasks<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut AppState) -> R,
    {
        let mut state = self.lock();
        let result = f(&mut state);

        if let Err(err) = self.store.save_tasks(state.tasks()) {
            tracing::error!(error = %err, "failed to persist tasks document");
        }
        let _ = self.update_tx.send(());

        result
    }

    // Same shape for project mutations.
    fn with_projects<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut AppState) -> R,
    {
        let mut state = self.lock();
        let result = f(&mut state);

        if let Err(err) = self.store.save_projects(state.projects()) {
            tracing::error!(error = %err, "failed to persist projects document");
        }
        let _ = self.update_tx.send(());

        result
    }

    pub fn add_task(&self, draft: TaskDraft) -> Task {
        self.with_tasks(|state| state.add_task(draft))
    }

    pub fn toggle_task(&self, id: &str) -> bool {
        self.with_tasks(|state| state.toggle_task(id))
    }

    pub fn delete_task(&self, id: &str) -> bool {
        self.with_tasks(|state| state.delete_task(id))
    }

    pub fn add_project(&self, name: &str, color: &str) -> Option<Project> {
        self.with_projects(|state| state.add_project(name, color))
    }

    /// The full task set, newest first.
    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks().to_vec()
    }

    /// Not-yet-completed tasks across all projects, newest first.
    pub fn pending_tasks(&self) -> Vec<Task> {
        self.lock()
            .tasks()
            .iter()
            .filter(|t| !t.completed)
            .cloned()
            .collect()
    }

    /// The full project set, including the reserved inbox.
    pub fn projects(&self) -> Vec<Project> {
        self.lock().projects().to_vec()
    }

    /// The user-facing project list (inbox excluded).
    pub fn user_projects(&self) -> Vec<Project> {
        self.lock().user_projects()
    }

    /// Runs the view resolver against a snapshot of the current state.
    pub fn resolve(&self, view: &View, today: NaiveDate, search: &str) -> ResolvedView {
        let state = self.lock();
        resolve_view(state.tasks(), state.projects(), view, today, search)
    }

    /// Sidebar counts: (inbox pending, due-today pending).
    pub fn nav_counts(&self, today: NaiveDate) -> (usize, usize) {
        let state = self.lock();
        (state.pending_inbox_count(), state.pending_due_count(today))
    }

    // Subscribe to state updates
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<()> {
        self.update_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            ..TaskDraft::default()
        }
    }

    #[test]
    fn test_add_task_defaults() {
        let mut state = AppState::seeded();
        let task = state.add_task(TaskDraft::default());

        assert_eq!(task.title, UNTITLED_TASK);
        assert_eq!(task.priority, Priority::P4);
        assert_eq!(task.project_id, INBOX_PROJECT_ID);
        assert!(!task.completed);
        assert_eq!(state.tasks().len(), 1);
    }

    #[test]
    fn test_add_task_prepends() {
        let mut state = AppState::seeded();
        let first = state.add_task(draft("first"));
        let second = state.add_task(draft("second"));

        // Newest first
        assert_eq!(state.tasks()[0].id, second.id);
        assert_eq!(state.tasks()[1].id, first.id);
    }

    #[test]
    fn test_add_task_keeps_explicit_fields() {
        let mut state = AppState::seeded();
        let task = state.add_task(TaskDraft {
            title: "Call Jane".to_string(),
            description: "about the renewal".to_string(),
            due_date: Some(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
            priority: Some(Priority::P1),
            project_id: Some("work".to_string()),
        });

        assert_eq!(task.title, "Call Jane");
        assert_eq!(task.description, "about the renewal");
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(task.priority, Priority::P1);
        assert_eq!(task.project_id, "work");
    }

    #[test]
    fn test_toggle_task() {
        let mut state = AppState::seeded();
        let task = state.add_task(draft("toggle me"));

        assert!(state.toggle_task(&task.id));
        assert!(state.tasks()[0].completed);

        assert!(state.toggle_task(&task.id));
        assert!(!state.tasks()[0].completed);
    }

    #[test]
    fn test_toggle_unknown_id_is_noop() {
        let mut state = AppState::seeded();
        state.add_task(draft("only task"));

        assert!(!state.toggle_task("missing"));
        assert!(!state.tasks()[0].completed);
    }

    #[test]
    fn test_delete_task() {
        let mut state = AppState::seeded();
        let task = state.add_task(draft("doomed"));

        assert!(state.delete_task(&task.id));
        assert!(state.tasks().is_empty());
    }

    #[test]
    fn test_delete_unknown_id_leaves_set_unchanged() {
        let mut state = AppState::seeded();
        let task = state.add_task(draft("survivor"));

        assert!(!state.delete_task("missing"));
        assert_eq!(state.tasks().len(), 1);
        assert_eq!(state.tasks()[0].id, task.id);
    }

    #[test]
    fn test_add_project() {
        let mut state = AppState::seeded();
        let before = state.projects().len();

        let project = state.add_project("Errands", "#ff9933").unwrap();
        assert_eq!(project.name, "Errands");
        assert_eq!(state.projects().len(), before + 1);
    }

    #[test]
    fn test_add_project_rejects_blank_name() {
        let mut state = AppState::seeded();
        let before = state.projects().len();

        assert!(state.add_project("", "#ff9933").is_none());
        assert!(state.add_project("   ", "#ff9933").is_none());
        assert_eq!(state.projects().len(), before);
    }

    #[test]
    fn test_user_projects_excludes_inbox() {
        let state = AppState::seeded();
        assert!(state
            .user_projects()
            .iter()
            .all(|p| p.id != INBOX_PROJECT_ID));
    }

    #[test]
    fn test_priority_round_trip() {
        for rank in 1u8..=4 {
            let priority = Priority::try_from(rank).unwrap();
            assert_eq!(u8::from(priority), rank);
        }
        assert!(Priority::try_from(0).is_err());
        assert!(Priority::try_from(5).is_err());
    }

    #[test]
    fn test_priority_color_total() {
        // Every priority maps to a distinct display color.
        let colors: Vec<&str> = [Priority::P1, Priority::P2, Priority::P3, Priority::P4]
            .iter()
            .map(|p| p.color())
            .collect();
        assert_eq!(colors.len(), 4);
        for (i, a) in colors.iter().enumerate() {
            for b in colors.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_view_tokens() {
        assert_eq!("inbox".parse::<View>().unwrap(), View::Inbox);
        assert_eq!("today".parse::<View>().unwrap(), View::Today);
        assert_eq!("upcoming".parse::<View>().unwrap(), View::Upcoming);
        assert_eq!(
            "work".parse::<View>().unwrap(),
            View::Project("work".to_string())
        );
        assert_eq!(View::Project("work".to_string()).to_string(), "work");
    }

    #[test]
    fn test_task_document_shape() {
        let mut state = AppState::seeded();
        let task = state.add_task(TaskDraft {
            title: "Ship it".to_string(),
            due_date: Some(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()),
            ..TaskDraft::default()
        });

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["content"], "Ship it");
        assert_eq!(value["dueDate"], "2024-05-02");
        assert_eq!(value["projectId"], "inbox");
        assert_eq!(value["isCompleted"], false);
        assert_eq!(value["priority"], 4);
        assert!(value["createdAt"].is_number());

        let back: Task = serde_json::from_value(value).unwrap();
        assert_eq!(back.id, task.id);
        assert_eq!(back.due_date, task.due_date);
    }

    #[test]
    fn test_generated_ids_look_opaque() {
        let mut rng = StdRng::from_entropy();
        let id = generate_id(&mut rng);
        assert_eq!(id.len(), 9);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_nav_counts() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut state = AppState::seeded();
        state.add_task(draft("inbox pending"));
        state.add_task(TaskDraft {
            title: "due today".to_string(),
            due_date: Some(today),
            project_id: Some("work".to_string()),
            ..TaskDraft::default()
        });
        let done = state.add_task(draft("inbox done"));
        state.toggle_task(&done.id);

        assert_eq!(state.pending_inbox_count(), 1);
        assert_eq!(state.pending_due_count(today), 1);
    }
}
