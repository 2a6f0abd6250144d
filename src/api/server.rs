//! API Server module
//!
//! This module provides the HTTP API server functionality for the gentask tool,
//! plus the server-rendered web UI.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::ai::{Assistant, RequestSeq, TaskSuggestion};
use crate::models::{Core, Priority, Project, TaskDraft, View};
use crate::views::ResolvedView;

/// Request to add a new project
#[derive(Serialize, Deserialize)]
pub struct AddProjectRequest {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// Request to parse free text into a task suggestion
#[derive(Serialize, Deserialize)]
pub struct ParseRequest {
    pub input: String,
}

/// Request to rewrite a task title
#[derive(Serialize, Deserialize)]
pub struct RefineRequest {
    pub text: String,
}

/// Query parameters for view resolution
#[derive(Deserialize, Default)]
pub struct ViewQuery {
    #[serde(default)]
    pub search: String,
    /// Overrides the caller's notion of "today"; defaults to the current
    /// UTC date.
    pub today: Option<NaiveDate>,
}

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 3000).into(),
        }
    }
}

/// API responses
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Shared handler state: the core plus the AI assistant and the tip cache.
#[derive(Clone)]
pub struct ApiState {
    core: Core,
    assistant: Arc<dyn Assistant>,
    tip: Arc<tokio::sync::RwLock<String>>,
    tip_seq: Arc<RequestSeq>,
}

impl ApiState {
    pub fn new(core: Core, assistant: Arc<dyn Assistant>) -> Self {
        Self {
            core,
            assistant,
            tip: Arc::new(tokio::sync::RwLock::new(
                "Loading smart tips...".to_string(),
            )),
            tip_seq: Arc::new(RequestSeq::new()),
        }
    }
}

/// Starts the API server
pub async fn serve(
    core: Core,
    assistant: Arc<dyn Assistant>,
    config: ServerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let state = ApiState::new(core, assistant);

    // Fetch the first tip in the background; the server never waits on the
    // assistant.
    tokio::spawn(refresh_tip(state.clone()));

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build application with routes
    let app = router(state);

    // Start server
    tracing::info!("Starting server on {}", config.address);
    let listener = TcpListener::bind(config.address).await?;
    axum::serve(listener, app.layer(cors)).await?;

    Ok(())
}

/// Builds the full route table. Split out so tests can drive it directly.
fn router(state: ApiState) -> Router {
    Router::new()
        // --- Redirect root to the UI --- //
        .route("/", get(|| async { Redirect::temporary("/ui") }))
        // --- Tasks --- //
        .route("/api/tasks", get(list_tasks).post(add_task))
        .route("/api/tasks/:id/toggle", post(toggle_task))
        .route("/api/tasks/:id", delete(delete_task))
        // --- Projects --- //
        .route("/api/projects", get(list_projects).post(add_project))
        // --- View resolution --- //
        .route("/api/views/:view", get(get_view))
        // --- AI assistant --- //
        .route("/api/ai/parse", post(ai_parse))
        .route("/api/ai/tip", get(ai_tip))
        .route("/api/ai/refine", post(ai_refine))
        // --- UI --- //
        .route("/ui", get(ui_root_handler))
        .route("/ui/events", get(events_handler))
        .route("/ui/:view", get(ui_view_handler))
        .with_state(state)
}

/// Refreshes the cached productivity tip.
///
/// Requests race freely (they are never cancelled); the generation check
/// ensures only the most recently issued request's result is stored.
async fn refresh_tip(state: ApiState) -> String {
    let generation = state.tip_seq.begin();
    let pending = state.core.pending_tasks();
    let tip = state.assistant.suggest_tip(&pending).await;

    if state.tip_seq.is_current(generation) {
        *state.tip.write().await = tip;
    }
    state.tip.read().await.clone()
}

// --- Task Handlers --- //

async fn list_tasks(State(state): State<ApiState>) -> impl IntoResponse {
    (StatusCode::OK, Json(ApiResponse::success(state.core.tasks())))
}

async fn add_task(
    State(state): State<ApiState>,
    Json(draft): Json<TaskDraft>,
) -> impl IntoResponse {
    let task = state.core.add_task(draft);
    (StatusCode::OK, Json(ApiResponse::success(task)))
}

async fn toggle_task(State(state): State<ApiState>, Path(id): Path<String>) -> impl IntoResponse {
    // A missing id is silently a no-op, not an error.
    let toggled = state.core.toggle_task(&id);
    (StatusCode::OK, Json(ApiResponse::success(toggled)))
}

async fn delete_task(State(state): State<ApiState>, Path(id): Path<String>) -> impl IntoResponse {
    let deleted = state.core.delete_task(&id);
    (StatusCode::OK, Json(ApiResponse::success(deleted)))
}

// --- Project Handlers --- //

async fn list_projects(State(state): State<ApiState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse::success(state.core.user_projects())),
    )
}

async fn add_project(
    State(state): State<ApiState>,
    Json(payload): Json<AddProjectRequest>,
) -> Response {
    let color = payload.color.unwrap_or_else(|| "#808080".to_string());
    match state.core.add_project(&payload.name, &color) {
        Some(project) => (StatusCode::OK, Json(ApiResponse::success(project))).into_response(),
        None => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::<Project>::error(
                "Project name must not be empty".to_string(),
            )),
        )
            .into_response(),
    }
}

// --- View Handler --- //

async fn get_view(
    State(state): State<ApiState>,
    Path(token): Path<String>,
    Query(query): Query<ViewQuery>,
) -> impl IntoResponse {
    let view = View::from(token);
    let today = query.today.unwrap_or_else(|| Utc::now().date_naive());
    let resolved = state.core.resolve(&view, today, &query.search);
    (StatusCode::OK, Json(ApiResponse::success(resolved)))
}

// --- AI Handlers --- //

async fn ai_parse(
    State(state): State<ApiState>,
    Json(payload): Json<ParseRequest>,
) -> impl IntoResponse {
    let projects = state.core.projects();
    let suggestion: Option<TaskSuggestion> = state
        .assistant
        .parse_free_text(&payload.input, &projects)
        .await;
    // None is a valid outcome, not an error: the caller keeps its form state.
    (StatusCode::OK, Json(ApiResponse::success(suggestion)))
}

async fn ai_tip(State(state): State<ApiState>) -> impl IntoResponse {
    let tip = refresh_tip(state).await;
    (StatusCode::OK, Json(ApiResponse::success(tip)))
}

async fn ai_refine(
    State(state): State<ApiState>,
    Json(payload): Json<RefineRequest>,
) -> impl IntoResponse {
    let refined = state.assistant.refine_title(&payload.text).await;
    (StatusCode::OK, Json(ApiResponse::success(refined)))
}

// --- UI and Event Handlers --- //

async fn events_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let receiver = state.core.subscribe();
    let stream = EventStream::new(state.core.clone(), receiver);

    // Set headers for event stream
    let headers = [
        (
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("text/event-stream"),
        ),
        (
            axum::http::header::CACHE_CONTROL,
            axum::http::HeaderValue::from_static("no-cache"),
        ),
    ];

    // Return response with headers and stream body
    (headers, axum::body::Body::from_stream(stream))
}

struct EventStream {
    core: Core,
    receiver: tokio::sync::broadcast::Receiver<()>,
}

impl EventStream {
    fn new(core: Core, receiver: tokio::sync::broadcast::Receiver<()>) -> Self {
        Self { core, receiver }
    }
}

impl Stream for EventStream {
    type Item = Result<String, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // Try to receive from the broadcast channel with a non-blocking approach
        match self.receiver.try_recv() {
            Ok(()) => {
                // State changed, send event to client
                Poll::Ready(Some(Ok("event: update\ndata: change\n\n".to_string())))
            }
            Err(tokio::sync::broadcast::error::TryRecvError::Empty) => {
                // No updates available now, register the waker to be notified later
                let waker = cx.waker().clone();
                tokio::spawn(async move {
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    waker.wake();
                });
                Poll::Pending
            }
            Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_)) => {
                // Some messages were missed; a single change event is enough
                Poll::Ready(Some(Ok("event: update\ndata: change\n\n".to_string())))
            }
            Err(tokio::sync::broadcast::error::TryRecvError::Closed) => {
                // Channel closed, try to resubscribe
                self.receiver = self.core.subscribe();
                Poll::Pending
            }
        }
    }
}

#[derive(Deserialize, Default)]
struct UiQuery {
    #[serde(default)]
    search: String,
}

async fn ui_root_handler(
    State(state): State<ApiState>,
    Query(query): Query<UiQuery>,
) -> Html<String> {
    render_page(state, View::Inbox, query.search).await
}

async fn ui_view_handler(
    State(state): State<ApiState>,
    Path(token): Path<String>,
    Query(query): Query<UiQuery>,
) -> Html<String> {
    render_page(state, View::from(token), query.search).await
}

async fn render_page(state: ApiState, view: View, search: String) -> Html<String> {
    let today = Utc::now().date_naive();
    let resolved = state.core.resolve(&view, today, &search);
    let projects = state.core.user_projects();
    let (inbox_count, today_count) = state.core.nav_counts(today);
    let tip = state.tip.read().await.clone();

    Html(render_ui_template(
        &view,
        &resolved,
        &projects,
        inbox_count,
        today_count,
        &tip,
        &search,
    ))
}

fn esc(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

fn esc_attr(text: &str) -> String {
    html_escape::encode_double_quoted_attribute(text).into_owned()
}

// --- Template Rendering --- //

fn render_ui_template(
    view: &View,
    resolved: &ResolvedView,
    projects: &[Project],
    inbox_count: usize,
    today_count: usize,
    tip: &str,
    search: &str,
) -> String {
    let mut html = String::from(HTML_TEMPLATE_HEADER);

    // --- Sidebar ---
    html.push_str("<aside class='sidebar'>");
    html.push_str("<div class='brand'><span class='brand-mark'>G</span>GenTask AI</div>");
    html.push_str("<nav class='views'>");
    for (target, label, count) in [
        (View::Inbox, "Inbox", Some(inbox_count)),
        (View::Today, "Today", Some(today_count)),
        (View::Upcoming, "Upcoming", None),
    ] {
        let class = if *view == target { "active" } else { "" };
        let badge = match count {
            Some(n) if n > 0 => format!("<span class='count'>{}</span>", n),
            _ => String::new(),
        };
        html.push_str(&format!(
            "<a href='/ui/{token}' class='{class}'>{label}{badge}</a>",
            token = target.token(),
            class = class,
            label = label,
            badge = badge,
        ));
    }
    html.push_str("</nav>");

    html.push_str("<div class='projects-heading'>Projects ");
    html.push_str("<button class='add-project' onclick='addProject()' title='Add project'>+</button>");
    html.push_str("</div><nav class='projects'>");
    for project in projects {
        let class = if view.token() == project.id { "active" } else { "" };
        html.push_str(&format!(
            "<a href='/ui/{id}' class='{class}'><span class='dot' style=\"background-color: {color}\"></span>{name}</a>",
            id = esc_attr(&project.id),
            class = class,
            color = esc_attr(&project.color),
            name = esc(&project.name),
        ));
    }
    html.push_str("</nav>");

    html.push_str(&format!(
        "<div class='tip-card'><div class='tip-label'>AI Tip</div><p>\"{}\"</p></div>",
        esc(tip)
    ));
    html.push_str("</aside>");

    // --- Main column ---
    html.push_str("<main class='content'>");
    html.push_str(&format!(
        "<header><h2 style=\"border-color: {color}\">{title}</h2>",
        color = esc_attr(&resolved.color),
        title = esc(&resolved.title),
    ));
    html.push_str(&format!(
        "<form class='search' method='get' action='/ui/{token}'>\
         <input type='text' name='search' placeholder='Search tasks' value=\"{search}\">\
         </form></header>",
        token = esc_attr(view.token()),
        search = esc_attr(search),
    ));

    render_add_task_form(&mut html, view, projects);

    // --- Pending tasks ---
    if resolved.pending.is_empty() && resolved.completed.is_empty() {
        html.push_str(
            "<div class='empty'><p>Nothing to do here yet.</p>\
             <p class='hint'>Enjoy your peace of mind or add a new task.</p></div>",
        );
    } else {
        html.push_str("<section class='task-list'>");
        for task in &resolved.pending {
            render_task_html(&mut html, task, false);
        }
        html.push_str("</section>");

        if !resolved.completed.is_empty() {
            html.push_str("<h3 class='completed-heading'>Completed</h3>");
            html.push_str("<section class='task-list completed'>");
            for task in &resolved.completed {
                render_task_html(&mut html, task, true);
            }
            html.push_str("</section>");
        }
    }
    html.push_str("</main>");

    html.push_str(HTML_TEMPLATE_FOOTER);
    html
}

// Helper function to render one task row
fn render_task_html(html: &mut String, task: &crate::models::Task, completed: bool) {
    let class = if completed { "task done" } else { "task" };
    html.push_str(&format!("<div class='{}'>", class));

    let check = if completed { "✓" } else { "" };
    html.push_str(&format!(
        "<button class='check' style=\"border-color: {color}\" onclick='toggleTask(\"{id}\")'>{check}</button>",
        color = task.priority.color(),
        id = esc_attr(&task.id),
        check = check,
    ));

    html.push_str("<div class='task-body'>");
    html.push_str(&format!("<div class='task-title'>{}</div>", esc(&task.title)));
    if !task.description.is_empty() {
        html.push_str(&format!(
            "<div class='task-desc'>{}</div>",
            esc(&task.description)
        ));
    }
    if let Some(due) = task.due_date {
        html.push_str(&format!("<div class='task-due'>{}</div>", due));
    }
    html.push_str("</div>");

    html.push_str(&format!(
        "<button class='trash' onclick='deleteTask(\"{}\")' title='Delete task'>✕</button>",
        esc_attr(&task.id)
    ));
    html.push_str("</div>");
}

// Helper function to render the add-task form
fn render_add_task_form(html: &mut String, view: &View, projects: &[Project]) {
    // The form's project select defaults to the active project view.
    html.push_str("<form class='add-task' onsubmit='addTask(event)'>");
    html.push_str(
        "<div class='ai-row'>\
         <button type='button' id='ai-parse' onclick='aiParse()'>AI Parser</button>\
         <button type='button' id='ai-refine' onclick='aiRefine()'>Refine title</button>\
         <span class='ai-hint'>Example: \"Call Jane tomorrow at 10am P1\"</span>\
         </div>",
    );
    html.push_str(
        "<input id='task-title' type='text' placeholder='Task name' \
         oninput='titleChanged()' autocomplete='off'>",
    );
    html.push_str("<textarea id='task-description' placeholder='Description'></textarea>");

    html.push_str("<div class='form-row'>");
    html.push_str("<input id='task-due' type='date'>");
    html.push_str("<select id='task-priority'>");
    for priority in [Priority::P4, Priority::P3, Priority::P2, Priority::P1] {
        html.push_str(&format!(
            "<option value='{rank}'>Priority {rank}</option>",
            rank = priority.rank()
        ));
    }
    html.push_str("</select>");

    // The reserved inbox is listed first; user_projects() already excludes it.
    html.push_str("<select id='task-project'>");
    for (id, name) in std::iter::once(("inbox", "Inbox".to_string()))
        .chain(projects.iter().map(|p| (p.id.as_str(), p.name.clone())))
    {
        let selected = if view.token() == id { " selected" } else { "" };
        html.push_str(&format!(
            "<option value=\"{id}\"{selected}>{name}</option>",
            id = esc_attr(id),
            selected = selected,
            name = esc(&name),
        ));
    }
    html.push_str("</select>");
    html.push_str("</div>");

    html.push_str("<button id='task-submit' type='submit' disabled>Add task</button>");
    html.push_str("</form>");
}

// HTML template header with CSS styles
const HTML_TEMPLATE_HEADER: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>GenTask AI</title>
    <style>
        * { box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, 'Open Sans', 'Helvetica Neue', sans-serif;
            margin: 0;
            display: flex;
            min-height: 100vh;
            color: #333;
            background: #fff;
        }
        .sidebar {
            width: 260px;
            flex-shrink: 0;
            background: #fafafa;
            border-right: 1px solid #e5e5e5;
            padding: 20px 16px;
            display: flex;
            flex-direction: column;
        }
        .brand {
            font-weight: 700;
            font-size: 18px;
            margin-bottom: 28px;
            display: flex;
            align-items: center;
            gap: 8px;
        }
        .brand-mark {
            display: inline-flex;
            align-items: center;
            justify-content: center;
            width: 30px;
            height: 30px;
            border-radius: 6px;
            background: #db4c3f;
            color: #fff;
        }
        .views a, .projects a {
            display: flex;
            align-items: center;
            gap: 10px;
            padding: 7px 10px;
            border-radius: 8px;
            color: #555;
            text-decoration: none;
            font-size: 14px;
            margin-bottom: 2px;
        }
        .views a.active, .projects a.active {
            background: #eee;
            color: #000;
            font-weight: 500;
        }
        .views a:hover, .projects a:hover { background: #f0f0f0; }
        .count {
            margin-left: auto;
            font-size: 11px;
            font-weight: 700;
            color: #999;
        }
        .projects-heading {
            margin-top: 28px;
            margin-bottom: 6px;
            font-size: 11px;
            font-weight: 700;
            letter-spacing: 0.08em;
            text-transform: uppercase;
            color: #888;
            display: flex;
            justify-content: space-between;
            align-items: center;
        }
        .add-project {
            border: none;
            background: none;
            color: #999;
            font-size: 16px;
            cursor: pointer;
        }
        .add-project:hover { color: #db4c3f; }
        .dot {
            width: 10px;
            height: 10px;
            border-radius: 50%;
            flex-shrink: 0;
        }
        .tip-card {
            margin-top: auto;
            background: #fff;
            border: 1px solid #eee;
            border-radius: 12px;
            padding: 14px;
            box-shadow: 0 1px 4px rgba(0,0,0,0.06);
        }
        .tip-label {
            color: #db4c3f;
            font-size: 10px;
            font-weight: 700;
            letter-spacing: 0.1em;
            text-transform: uppercase;
            margin-bottom: 4px;
        }
        .tip-card p {
            margin: 0;
            font-size: 12px;
            font-style: italic;
            color: #666;
            line-height: 1.5;
        }
        .content {
            flex: 1;
            max-width: 760px;
            margin: 0 auto;
            padding: 24px 32px;
        }
        header {
            display: flex;
            align-items: center;
            justify-content: space-between;
            gap: 16px;
            margin-bottom: 18px;
        }
        header h2 {
            margin: 0;
            border-bottom: 3px solid #db4c3f;
            padding-bottom: 6px;
        }
        .search input {
            border: 1px solid #ddd;
            border-radius: 6px;
            padding: 6px 10px;
            font-size: 13px;
            width: 200px;
        }
        .add-task {
            border: 1px solid #e5e5e5;
            border-radius: 12px;
            padding: 14px;
            margin-bottom: 24px;
            background: #fff;
        }
        .ai-row {
            display: flex;
            align-items: center;
            gap: 10px;
            margin-bottom: 10px;
        }
        .ai-row button {
            border: 1px solid #ddd;
            background: #fff;
            border-radius: 6px;
            padding: 4px 10px;
            font-size: 12px;
            font-weight: 700;
            cursor: pointer;
        }
        .ai-row button:hover { border-color: #db4c3f; color: #db4c3f; }
        .ai-row button:disabled { opacity: 0.5; cursor: default; }
        .ai-hint {
            font-size: 10px;
            font-style: italic;
            color: #aaa;
        }
        .add-task input[type=text] {
            width: 100%;
            border: none;
            outline: none;
            font-size: 17px;
            font-weight: 700;
            margin-bottom: 4px;
        }
        .add-task textarea {
            width: 100%;
            border: none;
            outline: none;
            resize: none;
            font-size: 13px;
            min-height: 48px;
            font-family: inherit;
        }
        .form-row {
            display: flex;
            gap: 8px;
            margin-bottom: 12px;
        }
        .form-row input, .form-row select {
            border: 1px solid #ddd;
            border-radius: 5px;
            padding: 4px 8px;
            font-size: 12px;
            color: #555;
        }
        #task-submit {
            background: #db4c3f;
            border: none;
            color: #fff;
            border-radius: 6px;
            padding: 7px 16px;
            font-size: 13px;
            font-weight: 500;
            cursor: pointer;
        }
        #task-submit:hover { background: #c53727; }
        #task-submit:disabled { opacity: 0.5; cursor: default; }
        .task {
            display: flex;
            align-items: flex-start;
            gap: 12px;
            padding: 12px 4px;
            border-bottom: 1px solid #f0f0f0;
        }
        .check {
            width: 20px;
            height: 20px;
            flex-shrink: 0;
            margin-top: 2px;
            border: 2px solid #808080;
            border-radius: 50%;
            background: #fff;
            cursor: pointer;
            font-size: 11px;
            line-height: 1;
            color: #fff;
        }
        .task.done .check { background: #9e9e9e; border-color: #9e9e9e; }
        .task-body { flex: 1; min-width: 0; }
        .task-title { font-size: 14px; font-weight: 500; }
        .task.done .task-title {
            text-decoration: line-through;
            color: #9e9e9e;
        }
        .task-desc { font-size: 12px; color: #888; margin-top: 2px; }
        .task-due {
            font-size: 11px;
            color: #db4c3f;
            font-weight: 500;
            margin-top: 4px;
        }
        .trash {
            border: none;
            background: none;
            color: #ccc;
            cursor: pointer;
            font-size: 13px;
        }
        .trash:hover { color: #d1453b; }
        .completed-heading {
            margin-top: 28px;
            color: #888;
            font-size: 13px;
            text-transform: uppercase;
            letter-spacing: 0.06em;
        }
        .empty {
            text-align: center;
            color: #999;
            padding: 60px 0;
        }
        .empty .hint { font-size: 13px; }
    </style>
</head>
<body>
"#;

// HTML template footer with form handlers and the EventSource reload hook
const HTML_TEMPLATE_FOOTER: &str = r#"
    <script>
        const titleInput = document.getElementById('task-title');
        const submitButton = document.getElementById('task-submit');

        function titleChanged() {
            // Blank titles never submit; the control stays disabled.
            submitButton.disabled = titleInput.value.trim() === '';
        }

        async function postJson(url, body) {
            const response = await fetch(url, {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify(body)
            });
            return response.json();
        }

        async function addTask(event) {
            event.preventDefault();
            const body = {
                content: titleInput.value,
                description: document.getElementById('task-description').value,
                priority: parseInt(document.getElementById('task-priority').value, 10),
                projectId: document.getElementById('task-project').value
            };
            const due = document.getElementById('task-due').value;
            if (due) { body.dueDate = due; }
            await postJson('/api/tasks', body);
            titleInput.value = '';
            document.getElementById('task-description').value = '';
            titleChanged();
        }

        async function toggleTask(id) {
            await fetch('/api/tasks/' + id + '/toggle', { method: 'POST' });
        }

        async function deleteTask(id) {
            if (!confirm('Delete this task?')) { return; }
            await fetch('/api/tasks/' + id, { method: 'DELETE' });
        }

        async function addProject() {
            const name = prompt('Project name');
            if (!name) { return; }
            await postJson('/api/projects', { name: name });
        }

        async function aiParse() {
            if (titleInput.value.trim() === '') { return; }
            const button = document.getElementById('ai-parse');
            button.disabled = true;
            button.textContent = 'Magic in progress...';
            try {
                const payload = await postJson('/api/ai/parse', { input: titleInput.value });
                const parsed = payload.data;
                if (parsed) {
                    // Absent fields keep their prior form values.
                    titleInput.value = parsed.content;
                    if (parsed.description) { document.getElementById('task-description').value = parsed.description; }
                    if (parsed.dueDate) { document.getElementById('task-due').value = parsed.dueDate; }
                    if (parsed.priority) { document.getElementById('task-priority').value = parsed.priority; }
                    if (parsed.projectId) { document.getElementById('task-project').value = parsed.projectId; }
                }
            } finally {
                button.disabled = false;
                button.textContent = 'AI Parser';
                titleChanged();
            }
        }

        async function aiRefine() {
            if (titleInput.value.trim() === '') { return; }
            const payload = await postJson('/api/ai/refine', { text: titleInput.value });
            if (payload.data) { titleInput.value = payload.data; }
        }

        // EventSource for reactive updates
        let eventSource;

        function connectEvents() {
            eventSource = new EventSource('/ui/events');

            eventSource.addEventListener('update', () => {
                window.location.reload();
            });

            eventSource.onerror = () => {
                eventSource.close();
                setTimeout(connectEvents, 3000);
            };
        }

        window.addEventListener('load', connectEvents);
        window.addEventListener('beforeunload', () => {
            if (eventSource) { eventSource.close(); }
        });
    </script>
</body>
</html>
"#;
