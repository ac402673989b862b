pub mod error;
pub mod feed;
pub mod routes;
pub mod state;

use axum::routing::get;
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router for the project at `root`.
/// Used by `serve_on()` and by the integration tests.
pub fn build_router(root: PathBuf) -> anyhow::Result<Router> {
    let app_state = state::AppState::new(root)?;
    Ok(router_with_state(app_state))
}

/// Build the Router around an already-constructed state.
pub fn router_with_state(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Config
        .route("/api/config", get(routes::config::get_config))
        // Raw documents
        .route("/api/docs", get(routes::docs::list_docs))
        .route(
            "/api/docs/{key}",
            get(routes::docs::get_doc)
                .put(routes::docs::put_doc)
                .patch(routes::docs::patch_doc),
        )
        .route(
            "/api/docs/{key}/version",
            get(routes::docs::get_doc_version),
        )
        // Tasks
        .route(
            "/api/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/api/tasks/{id}",
            axum::routing::patch(routes::tasks::patch_task),
        )
        // Activity
        .route(
            "/api/activity",
            get(routes::activity::list_activity).post(routes::activity::append_activity),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Run the API on an already-bound listener, so the caller can report the
/// actual port first (the OS picks one when binding port 0).
pub async fn serve_on(
    root: PathBuf,
    listener: tokio::net::TcpListener,
    open_browser: bool,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(root)?;

    tracing::info!("Mission Control listening on http://localhost:{actual_port}");

    if open_browser {
        let url = format!("http://localhost:{actual_port}/api/docs");
        let _ = open::that(&url);
    }

    axum::serve(listener, app).await?;
    Ok(())
}
