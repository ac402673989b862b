use axum::extract::{Query, State};
use axum::Json;
use mc_core::documents::{ActivityEntry, ActivityLog, Document};
use mc_core::McError;
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct ActivityQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// GET /api/activity: newest entries first.
pub async fn list_activity(
    State(app): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Value>, AppError> {
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        let log: ActivityLog = store.load()?;
        let limit = query.limit.unwrap_or(log.0.len());
        let entries: Vec<&ActivityEntry> = log.0.iter().rev().take(limit).collect();
        Ok::<_, McError>(serde_json::json!({ "entries": entries }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct AppendActivityBody {
    pub actor: String,
    pub action: String,
    #[serde(default)]
    pub detail: Option<String>,
}

/// POST /api/activity: append to the log, trimmed to `activity.max_entries`.
///
/// Unconditional write: concurrent appends may drop an entry.
pub async fn append_activity(
    State(app): State<AppState>,
    Json(body): Json<AppendActivityBody>,
) -> Result<Json<Value>, AppError> {
    if body.actor.trim().is_empty() || body.action.trim().is_empty() {
        return Err(AppError::bad_request("actor and action must not be empty"));
    }
    let mut entry = ActivityEntry::new(body.actor, body.action);
    if let Some(detail) = body.detail {
        entry = entry.with_detail(detail);
    }

    let store = app.store.clone();
    let max_entries = app.config.activity.max_entries;
    let result = tokio::task::spawn_blocking(move || {
        let version = store.append_trimmed(ActivityLog::KEY, &entry, max_entries)?;
        Ok::<_, McError>(serde_json::json!({
            "entry": entry,
            "version": version,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}
