use axum::extract::{Path, State};
use axum::Json;
use mc_core::{with_retry, Version};
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/docs: list stored document keys.
pub async fn list_docs(State(app): State<AppState>) -> Result<Json<Value>, AppError> {
    let store = app.store.clone();
    let keys = tokio::task::spawn_blocking(move || store.keys())
        .await
        .map_err(AppError::join)??;
    Ok(Json(serde_json::json!({ "keys": keys })))
}

/// GET /api/docs/{key}: document plus the version it was read at.
pub async fn get_doc(
    State(app): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, AppError> {
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        let (data, version) = store.read_versioned(&key)?;
        Ok::<_, mc_core::McError>(serde_json::json!({
            "key": key,
            "version": version,
            "data": data,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// GET /api/docs/{key}/version: current version only.
pub async fn get_doc_version(
    State(app): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, AppError> {
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        let version = store.get_version(&key)?;
        Ok::<_, mc_core::McError>(serde_json::json!({
            "key": key,
            "version": version,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct PutDocBody {
    pub data: Value,
    /// Version the caller read. Omit for an unconditional write.
    #[serde(default)]
    pub version: Option<String>,
}

/// PUT /api/docs/{key}: replace a document, conditionally on `version`.
pub async fn put_doc(
    State(app): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<PutDocBody>,
) -> Result<Json<Value>, AppError> {
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        let expected = parse_version(body.version.as_deref())?;
        let version = store.write_checked(&key, &body.data, expected.as_ref())?;
        Ok::<_, mc_core::McError>(serde_json::json!({
            "key": key,
            "version": version,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct PatchDocBody {
    pub patch: Value,
    /// With a version, a stale patch is a 409. Without one, the server
    /// re-reads and retries on conflict.
    #[serde(default)]
    pub version: Option<String>,
}

/// PATCH /api/docs/{key}: deep-merge a partial document.
pub async fn patch_doc(
    State(app): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<PatchDocBody>,
) -> Result<Json<Value>, AppError> {
    let store = app.store.clone();
    let policy = app.retry_policy();
    let result = tokio::task::spawn_blocking(move || {
        let expected = parse_version(body.version.as_deref())?;
        let (data, version) = match expected {
            Some(expected) => store.patch(&key, &body.patch, Some(&expected))?,
            None => with_retry(&policy, || store.patch(&key, &body.patch, None))?,
        };
        Ok::<_, mc_core::McError>(serde_json::json!({
            "key": key,
            "version": version,
            "data": data,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

fn parse_version(token: Option<&str>) -> mc_core::Result<Option<Version>> {
    token.map(Version::from_token).transpose()
}
