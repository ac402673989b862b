use crate::error::{McError, Result};
use crate::merge;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
    Blocked,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
            TaskStatus::Blocked => "blocked",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    /// Agent or person the task is assigned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            status: TaskStatus::Todo,
            assignee: None,
            project: None,
            created_at: now,
            updated_at: now,
            extra: Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Task list operations (operate on a mutable Vec<Task>)
// ---------------------------------------------------------------------------

pub fn new_task_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("task-{}", &id[..8])
}

pub fn add_task(tasks: &mut Vec<Task>, task: Task) -> String {
    let id = task.id.clone();
    tasks.push(task);
    id
}

/// Deep-merge `patch` into the task with `id`. `id` and `created_at` are
/// not patchable; the merged task must still be a valid task.
pub fn patch_task(tasks: &mut [Task], id: &str, patch: &Value) -> Result<Task> {
    let task = find_mut(tasks, id)?;
    let mut value = serde_json::to_value(&*task)?;
    merge::deep_merge(&mut value, patch);
    let mut patched: Task =
        serde_json::from_value(value).map_err(|e| McError::InvalidDocument {
            key: format!("tasks.json#{id}"),
            reason: e.to_string(),
        })?;
    patched.id = task.id.clone();
    patched.created_at = task.created_at;
    patched.updated_at = Utc::now();
    *task = patched;
    Ok(task.clone())
}

/// Human-readable summary: "3/5 done, 1 in progress, 1 blocked"
pub fn summarize(tasks: &[Task]) -> String {
    let total = tasks.len();
    let done = tasks.iter().filter(|t| t.status == TaskStatus::Done).count();
    let in_progress = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress)
        .count();
    let blocked = tasks.iter().filter(|t| t.status == TaskStatus::Blocked).count();
    format!("{done}/{total} done, {in_progress} in progress, {blocked} blocked")
}

fn find_mut<'a>(tasks: &'a mut [Task], id: &str) -> Result<&'a mut Task> {
    tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| McError::TaskNotFound(id.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_keeps_untouched_fields() {
        let mut tasks = Vec::new();
        let mut task = Task::new("task-1", "Write launch post");
        task.assignee = Some("scribe".into());
        let id = add_task(&mut tasks, task);

        let patched = patch_task(&mut tasks, &id, &json!({"status": "in_progress"})).unwrap();
        assert_eq!(patched.status, TaskStatus::InProgress);
        assert_eq!(patched.assignee.as_deref(), Some("scribe"));
        assert_eq!(patched.title, "Write launch post");
    }

    #[test]
    fn patch_null_does_not_clear() {
        let mut tasks = Vec::new();
        let mut task = Task::new("task-1", "Review PRD");
        task.assignee = Some("atlas".into());
        add_task(&mut tasks, task);

        patch_task(&mut tasks, "task-1", &json!({"assignee": null})).unwrap();
        assert_eq!(tasks[0].assignee.as_deref(), Some("atlas"));
    }

    #[test]
    fn patch_cannot_change_id() {
        let mut tasks = Vec::new();
        add_task(&mut tasks, Task::new("task-1", "A"));
        let patched = patch_task(&mut tasks, "task-1", &json!({"id": "task-9"})).unwrap();
        assert_eq!(patched.id, "task-1");
    }

    #[test]
    fn patch_rejects_bad_status() {
        let mut tasks = Vec::new();
        add_task(&mut tasks, Task::new("task-1", "A"));
        let err = patch_task(&mut tasks, "task-1", &json!({"status": "someday"})).unwrap_err();
        assert!(matches!(err, McError::InvalidDocument { .. }));
        assert_eq!(tasks[0].status, TaskStatus::Todo);
    }

    #[test]
    fn task_not_found() {
        let mut tasks: Vec<Task> = Vec::new();
        let err = patch_task(&mut tasks, "task-404", &json!({})).unwrap_err();
        assert!(matches!(err, McError::TaskNotFound(_)));
    }

    #[test]
    fn extra_fields_survive_patch() {
        let mut tasks = Vec::new();
        let mut task = Task::new("task-1", "A");
        task.extra.insert("labels".into(), json!(["seo"]));
        add_task(&mut tasks, task);
        let patched = patch_task(&mut tasks, "task-1", &json!({"labels": ["seo", "blog"]})).unwrap();
        assert_eq!(patched.extra["labels"], json!(["seo", "blog"]));
    }

    #[test]
    fn summary_counts() {
        let mut tasks = Vec::new();
        add_task(&mut tasks, Task::new("a", "A"));
        let mut done = Task::new("b", "B");
        done.status = TaskStatus::Done;
        add_task(&mut tasks, done);
        assert_eq!(summarize(&tasks), "1/2 done, 0 in progress, 0 blocked");
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(new_task_id(), new_task_id());
        assert!(new_task_id().starts_with("task-"));
    }
}
