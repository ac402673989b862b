use crate::cmd::open_store;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use mc_core::documents::TaskBoard;
use mc_core::task::{self as task_ops, Task};
use serde_json::Value;
use std::path::Path;

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// Add a task to the board
    Add {
        #[arg(required = true)]
        title: Vec<String>,
        #[arg(long)]
        description: Option<String>,
        /// Agent or person responsible
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        project: Option<String>,
    },
    /// List all tasks
    List,
    /// Set a task's status (todo, in_progress, review, done, blocked)
    Status { task_id: String, status: String },
    /// Deep-merge a JSON patch into one task
    Patch {
        task_id: String,
        #[arg(value_name = "JSON")]
        patch: String,
    },
}

pub fn run(root: &Path, subcmd: TaskSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TaskSubcommand::Add {
            title,
            description,
            assignee,
            project,
        } => {
            let mut task = Task::new(task_ops::new_task_id(), title.join(" "));
            task.description = description;
            task.assignee = assignee;
            task.project = project;
            add(root, task, json)
        }
        TaskSubcommand::List => list(root, json),
        TaskSubcommand::Status { task_id, status } => {
            patch(root, &task_id, &serde_json::json!({ "status": status }), json)
        }
        TaskSubcommand::Patch { task_id, patch: raw } => {
            let value: Value = serde_json::from_str(&raw).context("patch is not valid JSON")?;
            patch(root, &task_id, &value, json)
        }
    }
}

fn add(root: &Path, task: Task, json: bool) -> anyhow::Result<()> {
    let (config, store) = open_store(root)?;
    let (id, version) = store.update::<TaskBoard, _, _>(&config.retry.policy(), |board| {
        Ok(task_ops::add_task(&mut board.tasks, task.clone()))
    })?;

    if json {
        print_json(&serde_json::json!({ "task": task, "version": version }))?;
    } else {
        println!("Added task [{id}]: {}", task.title);
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let (_, store) = open_store(root)?;
    let (board, version) = store.load_versioned::<TaskBoard>()?;

    if json {
        print_json(&serde_json::json!({
            "version": version,
            "summary": task_ops::summarize(&board.tasks),
            "tasks": board.tasks,
        }))?;
        return Ok(());
    }

    if board.tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    let rows = board
        .tasks
        .iter()
        .map(|t| {
            vec![
                t.id.clone(),
                t.status.to_string(),
                t.assignee.clone().unwrap_or_else(|| "-".to_string()),
                t.title.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "STATUS", "ASSIGNEE", "TITLE"], rows);
    println!("\n{}", task_ops::summarize(&board.tasks));
    Ok(())
}

fn patch(root: &Path, task_id: &str, patch: &Value, json: bool) -> anyhow::Result<()> {
    let (config, store) = open_store(root)?;
    let (task, version) = store.update::<TaskBoard, _, _>(&config.retry.policy(), |board| {
        task_ops::patch_task(&mut board.tasks, task_id, patch)
    })?;

    if json {
        print_json(&serde_json::json!({ "task": task, "version": version }))?;
    } else {
        println!("Updated task [{}]: {}", task.id, task.status);
    }
    Ok(())
}
