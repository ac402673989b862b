use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/config: the effective config the server was started with.
///
/// No PUT endpoint: `.mission-control/config.yaml` is edited by hand and
/// picked up on restart.
pub async fn get_config(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let mut json = serde_json::to_value(app.config.as_ref())?;
    json["data_dir"] = serde_json::json!(app.store.data_dir());
    json["warnings"] = serde_json::to_value(app.config.validate())?;
    Ok(Json(json))
}
