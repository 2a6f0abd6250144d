//! CLI module
//!
//! This module provides the command-line interface functionality for the gentask tool.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;

use crate::ai::{AssistantConfig, GeminiAssistant};
use crate::api::{serve, Client, ClientConfig, ServerConfig};
use crate::models::{Core, Priority, Task, TaskDraft, View};
use crate::store::{JsonFileStore, MemoryStore, Store};
use crate::views::ResolvedView;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API server URL
    #[arg(
        short,
        long,
        default_value = "http://localhost:3000",
        env = "GENTASK_SERVER"
    )]
    server: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gentask server (API + web UI)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 3000)]
        port: u16,

        /// Directory holding the tasks and projects documents
        #[arg(long, default_value = ".gentask", env = "GENTASK_DATA_DIR")]
        data_dir: PathBuf,

        /// Keep everything in memory; nothing is written to disk
        #[arg(long)]
        ephemeral: bool,
    },

    /// Task management commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Project management commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Parse free text into structured task fields via the AI assistant
    Parse {
        /// Free-form task description, e.g. "Call Jane tomorrow at 10am P1"
        input: String,
    },

    /// Get a productivity tip for the pending tasks
    Tip,

    /// Rewrite a task title for clarity
    Refine {
        /// The title to rewrite
        text: String,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Add a new task
    Add {
        /// Task title
        title: String,

        /// Free-text description
        #[arg(short, long)]
        description: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,

        /// Priority, 1 (most urgent) to 4
        #[arg(short, long)]
        priority: Option<Priority>,

        /// Project id; defaults to the inbox
        #[arg(long)]
        project: Option<String>,
    },

    /// Flip a task's completion flag
    Toggle {
        /// Task id
        id: String,
    },

    /// Delete a task
    Delete {
        /// Task id
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List the tasks in a view
    List {
        /// View to resolve: inbox, today, upcoming, or a project id
        #[arg(short, long, default_value = "inbox")]
        view: View,

        /// Case-insensitive filter over title and description
        #[arg(long)]
        search: Option<String>,

        /// Resolve against this date instead of the current one
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Add a new project
    Add {
        /// Project name
        name: String,

        /// Display color
        #[arg(short, long, default_value = "#808080")]
        color: String,
    },

    /// List projects
    List,
}

/// Run the CLI application
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve {
            port,
            data_dir,
            ephemeral,
        } => {
            println!("Starting gentask server on port {}...", port);

            let store: Arc<dyn Store> = if *ephemeral {
                Arc::new(MemoryStore::new())
            } else {
                Arc::new(JsonFileStore::open(data_dir)?)
            };
            let core = Core::load(store)?;
            let assistant = Arc::new(GeminiAssistant::new(AssistantConfig::from_env()));

            let config = ServerConfig {
                address: ([127, 0, 0, 1], *port).into(),
            };

            serve(core, assistant, config).await?;
            Ok(())
        }

        Commands::Task { command } => {
            let client = create_client(&cli.server);
            match command {
                TaskCommands::Add {
                    title,
                    description,
                    due,
                    priority,
                    project,
                } => {
                    let draft = TaskDraft {
                        title: title.clone(),
                        description: description.clone().unwrap_or_default(),
                        due_date: *due,
                        priority: *priority,
                        project_id: project.clone(),
                    };
                    let task = client.add_task(&draft).await?;
                    println!(
                        "Added task {} {}",
                        task.id.dimmed(),
                        format_title(&task)
                    );
                    Ok(())
                }

                TaskCommands::Toggle { id } => {
                    if client.toggle_task(id).await? {
                        println!("Toggled task {}", id);
                    } else {
                        println!("No task with id {}", id);
                    }
                    Ok(())
                }

                TaskCommands::Delete { id, yes } => {
                    if !*yes && !confirm(&format!("Delete task {}?", id))? {
                        println!("Aborted.");
                        return Ok(());
                    }
                    if client.delete_task(id).await? {
                        println!("Deleted task {}", id);
                    } else {
                        println!("No task with id {}", id);
                    }
                    Ok(())
                }

                TaskCommands::List {
                    view,
                    search,
                    today,
                } => {
                    let resolved = client
                        .resolve_view(view, search.as_deref(), *today)
                        .await?;
                    print_resolved_view(&resolved);
                    Ok(())
                }
            }
        }

        Commands::Project { command } => {
            let client = create_client(&cli.server);
            match command {
                ProjectCommands::Add { name, color } => {
                    let project = client.add_project(name, color).await?;
                    println!("Added project \"{}\" with id: {}", project.name, project.id);
                    Ok(())
                }

                ProjectCommands::List => {
                    let projects = client.list_projects().await?;
                    if projects.is_empty() {
                        println!("No projects yet. Add one with 'gentask project add'");
                    } else {
                        for project in projects {
                            println!("{}  {} ({})", "●".normal(), project.name, project.id.dimmed());
                        }
                    }
                    Ok(())
                }
            }
        }

        Commands::Parse { input } => {
            let client = create_client(&cli.server);
            match client.parse_free_text(input).await? {
                Some(suggestion) => {
                    println!("Title:       {}", suggestion.title);
                    if let Some(description) = &suggestion.description {
                        println!("Description: {}", description);
                    }
                    if let Some(due) = suggestion.due_date {
                        println!("Due:         {}", due);
                    }
                    if let Some(priority) = suggestion.priority {
                        println!("Priority:    {}", priority);
                    }
                    if let Some(project) = &suggestion.project_id {
                        println!("Project:     {}", project);
                    }
                }
                None => println!("Could not parse that input; try rephrasing."),
            }
            Ok(())
        }

        Commands::Tip => {
            let client = create_client(&cli.server);
            let tip = client.suggest_tip().await?;
            println!("{}", tip.italic());
            Ok(())
        }

        Commands::Refine { text } => {
            let client = create_client(&cli.server);
            let refined = client.refine_title(text).await?;
            println!("{}", refined);
            Ok(())
        }

        Commands::Completions { shell } => {
            // Generate completions for the specified shell
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, bin_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn create_client(server_url: &str) -> Client {
    let config = ClientConfig {
        base_url: server_url.to_string(),
    };

    Client::with_config(config)
}

/// Asks a yes/no question on stdout and reads the answer from stdin.
fn confirm(question: &str) -> io::Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

/// Colors a task title by its priority; completed tasks are dimmed.
fn format_title(task: &Task) -> colored::ColoredString {
    if task.completed {
        return task.title.dimmed().strikethrough();
    }
    match task.priority {
        Priority::P1 => task.title.red(),
        Priority::P2 => task.title.yellow(),
        Priority::P3 => task.title.blue(),
        Priority::P4 => task.title.normal(),
    }
}

fn print_task_line(task: &Task) {
    let marker = if task.completed { "[x]" } else { "[ ]" };
    let due = task
        .due_date
        .map(|d| format!("  due {}", d))
        .unwrap_or_default();
    println!(
        "  {} {}  P{} {}{}",
        marker,
        task.id.dimmed(),
        task.priority.rank(),
        format_title(task),
        due.dimmed()
    );
    if !task.description.is_empty() {
        println!("        {}", task.description.dimmed());
    }
}

fn print_resolved_view(resolved: &ResolvedView) {
    println!("{}", resolved.title.bold());

    if resolved.pending.is_empty() && resolved.completed.is_empty() {
        println!("  Nothing to do here yet. Add a task with 'gentask task add'");
        return;
    }

    for task in &resolved.pending {
        print_task_line(task);
    }

    if !resolved.completed.is_empty() {
        println!("\n  {}", "Completed".dimmed());
        for task in &resolved.completed {
            print_task_line(task);
        }
    }
}
