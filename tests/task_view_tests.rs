use std::sync::Arc;

use chrono::NaiveDate;
use gentask::{
    default_projects, resolve_view, AppState, Core, JsonFileStore, MemoryStore, Priority,
    Store, TaskDraft, View, INBOX_PROJECT_ID, UNTITLED_TASK,
};

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn draft(title: &str) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        ..TaskDraft::default()
    }
}

#[test]
fn test_add_task_on_empty_set_uses_documented_defaults() {
    let mut state = AppState::new(Vec::new(), default_projects());
    let task = state.add_task(TaskDraft::default());

    assert_eq!(task.title, UNTITLED_TASK);
    assert_eq!(task.priority, Priority::P4);
    assert_eq!(task.project_id, INBOX_PROJECT_ID);
    assert!(!task.completed);
}

#[test]
fn test_priority_order_beats_insertion_order() {
    // Two pending tasks inserted with priorities [4, 1]; the resolved
    // pending list leads with the priority-1 task.
    let mut state = AppState::seeded();
    let low = state.add_task(TaskDraft {
        title: "low".to_string(),
        priority: Some(Priority::P4),
        ..TaskDraft::default()
    });
    let urgent = state.add_task(TaskDraft {
        title: "urgent".to_string(),
        priority: Some(Priority::P1),
        ..TaskDraft::default()
    });

    let resolved = resolve_view(
        state.tasks(),
        state.projects(),
        &View::Inbox,
        date("2024-05-01"),
        "",
    );
    assert_eq!(resolved.pending[0].id, urgent.id);
    assert_eq!(resolved.pending[1].id, low.id);
}

#[test]
fn test_equal_priorities_list_newest_first() {
    // Prepend-on-add plus the resolver's stable sort puts newer tasks ahead
    // of older ones within a priority band.
    let mut state = AppState::seeded();
    let older = state.add_task(draft("older"));
    let newer = state.add_task(draft("newer"));

    let resolved = resolve_view(
        state.tasks(),
        state.projects(),
        &View::Inbox,
        date("2024-05-01"),
        "",
    );
    assert_eq!(resolved.pending[0].id, newer.id);
    assert_eq!(resolved.pending[1].id, older.id);
}

#[test]
fn test_delete_unknown_id_leaves_set_identical() {
    let mut state = AppState::seeded();
    state.add_task(draft("a"));
    state.add_task(draft("b"));
    let before: Vec<String> = state.tasks().iter().map(|t| t.id.clone()).collect();

    assert!(!state.delete_task("not-a-real-id"));

    let after: Vec<String> = state.tasks().iter().map(|t| t.id.clone()).collect();
    assert_eq!(before, after);
}

#[test]
fn test_due_date_scenarios_from_both_calendar_views() {
    let mut state = AppState::seeded();
    state.add_task(TaskDraft {
        title: "a".to_string(),
        due_date: Some(date("2024-05-01")),
        priority: Some(Priority::P2),
        ..TaskDraft::default()
    });
    state.add_task(TaskDraft {
        title: "b".to_string(),
        due_date: Some(date("2024-05-02")),
        priority: Some(Priority::P1),
        ..TaskDraft::default()
    });
    let today = date("2024-05-01");

    let today_view = resolve_view(state.tasks(), state.projects(), &View::Today, today, "");
    assert_eq!(today_view.pending.len(), 1);
    assert_eq!(today_view.pending[0].title, "a");

    let upcoming = resolve_view(state.tasks(), state.projects(), &View::Upcoming, today, "");
    assert_eq!(upcoming.pending.len(), 1);
    assert_eq!(upcoming.pending[0].title, "b");
}

#[test]
fn test_core_persists_every_mutation() {
    let store = Arc::new(MemoryStore::new());
    let core = Core::new(AppState::seeded(), store.clone());

    let task = core.add_task(draft("persist me"));
    let saved = store.load_tasks().unwrap().expect("tasks were saved");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, task.id);

    core.toggle_task(&task.id);
    let saved = store.load_tasks().unwrap().expect("tasks were saved");
    assert!(saved[0].completed);

    core.delete_task(&task.id);
    let saved = store.load_tasks().unwrap().expect("tasks were saved");
    assert!(saved.is_empty());

    core.add_project("Errands", "#ff9933");
    let saved = store.load_projects().unwrap().expect("projects were saved");
    assert!(saved.iter().any(|p| p.name == "Errands"));
}

#[test]
fn test_core_load_seeds_defaults_on_first_run() {
    let store = Arc::new(MemoryStore::new());
    let core = Core::load(store.clone()).unwrap();

    assert!(core.tasks().is_empty());
    assert_eq!(core.projects().len(), default_projects().len());
    // The seed is written back so the next run loads it as an existing
    // document.
    assert!(store.load_projects().unwrap().is_some());
}

#[test]
fn test_state_survives_restart_through_file_store() {
    let dir = tempfile::tempdir().unwrap();

    let task_id = {
        let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
        let core = Core::load(store).unwrap();
        let task = core.add_task(TaskDraft {
            title: "outlives the process".to_string(),
            due_date: Some(date("2024-06-01")),
            priority: Some(Priority::P2),
            project_id: Some("work".to_string()),
            ..TaskDraft::default()
        });
        core.toggle_task(&task.id);
        task.id
    };

    // Fresh store + core over the same directory, as after a restart.
    let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    let core = Core::load(store).unwrap();

    let tasks = core.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, task_id);
    assert_eq!(tasks[0].title, "outlives the process");
    assert_eq!(tasks[0].due_date, Some(date("2024-06-01")));
    assert_eq!(tasks[0].priority, Priority::P2);
    assert_eq!(tasks[0].project_id, "work");
    assert!(tasks[0].completed);
}

#[test]
fn test_resolve_through_core_matches_direct_resolution() {
    let store = Arc::new(MemoryStore::new());
    let core = Core::new(AppState::seeded(), store);
    core.add_task(TaskDraft {
        title: "review budget".to_string(),
        project_id: Some("work".to_string()),
        ..TaskDraft::default()
    });
    core.add_task(draft("inbox task"));

    let resolved = core.resolve(
        &View::Project("work".to_string()),
        date("2024-05-01"),
        "",
    );
    assert_eq!(resolved.pending.len(), 1);
    assert_eq!(resolved.pending[0].title, "review budget");
    assert_eq!(resolved.title, "Work");
}

#[test]
fn test_search_reaches_descriptions() {
    let store = Arc::new(MemoryStore::new());
    let core = Core::new(AppState::seeded(), store);
    core.add_task(TaskDraft {
        title: "Weekly review".to_string(),
        description: "include the BUDGET spreadsheet".to_string(),
        ..TaskDraft::default()
    });
    core.add_task(draft("unrelated"));

    let resolved = core.resolve(&View::Inbox, date("2024-05-01"), "budget");
    assert_eq!(resolved.pending.len(), 1);
    assert_eq!(resolved.pending[0].title, "Weekly review");
}
