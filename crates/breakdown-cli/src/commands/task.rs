//! Task checklist commands for CLI.

use clap::Subcommand;
use breakdown_core::storage::Database;
use breakdown_core::{Config, TaskList};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        /// Task text
        text: String,
    },
    /// List tasks
    List {
        /// Print JSON instead of a checklist
        #[arg(long)]
        json: bool,
    },
    /// Mark a task done, or not done again
    Toggle {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let user = config.user_id()?;
    let list = TaskList::new(Database::open()?, user);

    match action {
        TaskAction::Add { text } => {
            let task = list.create(&text)?;
            println!("Task created: {}", task.id);
        }
        TaskAction::List { json } => {
            let tasks = list.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else if tasks.is_empty() {
                println!("No tasks for {}", list.user());
            } else {
                for task in &tasks {
                    let mark = if task.done { "x" } else { " " };
                    println!("[{mark}] {}  {}", task.text, task.id);
                }
            }
        }
        TaskAction::Toggle { id } => {
            let task = list.toggle(&id)?;
            let state = if task.done { "done" } else { "open" };
            println!("Task {state}: {}", task.text);
        }
        TaskAction::Delete { id } => {
            list.delete(&id)?;
            println!("Task deleted: {id}");
        }
    }
    Ok(())
}
