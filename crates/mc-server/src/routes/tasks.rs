use axum::extract::{Path, State};
use axum::Json;
use mc_core::documents::{Document, TaskBoard};
use mc_core::task::{self, Task};
use mc_core::{McError, Version};
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/tasks: the task board.
pub async fn list_tasks(State(app): State<AppState>) -> Result<Json<Value>, AppError> {
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        let (board, version) = store.load_versioned::<TaskBoard>()?;
        Ok::<_, McError>(serde_json::json!({
            "version": version,
            "summary": task::summarize(&board.tasks),
            "tasks": board.tasks,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct CreateTaskBody {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
}

/// POST /api/tasks: add a task, retrying if the board moved underneath us.
pub async fn create_task(
    State(app): State<AppState>,
    Json(body): Json<CreateTaskBody>,
) -> Result<Json<Value>, AppError> {
    if body.title.trim().is_empty() {
        return Err(AppError::bad_request("title must not be empty"));
    }

    let mut new_task = Task::new(task::new_task_id(), body.title);
    new_task.description = body.description;
    new_task.assignee = body.assignee;
    new_task.project = body.project;

    let store = app.store.clone();
    let policy = app.retry_policy();
    let result = tokio::task::spawn_blocking(move || {
        let (id, version) = store.update::<TaskBoard, _, _>(&policy, |board| {
            Ok(task::add_task(&mut board.tasks, new_task.clone()))
        })?;
        tracing::info!(task = %id, "task created");
        Ok::<_, McError>(serde_json::json!({
            "task": new_task,
            "version": version,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct PatchTaskBody {
    pub patch: Value,
    #[serde(default)]
    pub version: Option<String>,
}

/// PATCH /api/tasks/{id}: deep-merge a patch into one task.
pub async fn patch_task(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PatchTaskBody>,
) -> Result<Json<Value>, AppError> {
    let store = app.store.clone();
    let policy = app.retry_policy();
    let result = tokio::task::spawn_blocking(move || {
        let (task, version) = match body.version.as_deref() {
            Some(token) => {
                let expected = Version::from_token(token)?;
                let (mut board, current) = store.load_versioned::<TaskBoard>()?;
                if current != expected {
                    return Err(McError::VersionConflict {
                        key: TaskBoard::KEY.to_string(),
                        expected: expected.to_string(),
                        actual: current.to_string(),
                    });
                }
                let task = task::patch_task(&mut board.tasks, &id, &body.patch)?;
                let version = store.save(&board, Some(&expected))?;
                (task, version)
            }
            None => store.update::<TaskBoard, _, _>(&policy, |board| {
                task::patch_task(&mut board.tasks, &id, &body.patch)
            })?,
        };
        Ok::<_, McError>(serde_json::json!({
            "task": task,
            "version": version,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}
