use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream;
use std::convert::Infallible;

use crate::state::AppState;

/// GET /api/events: SSE stream that emits `update` whenever a document's
/// version changes. The subscription lives as long as the connection.
pub async fn sse_events(State(app): State<AppState>) -> impl axum::response::IntoResponse {
    let subscription = app.feed.subscribe();
    let events = stream::unfold(subscription, |mut sub| async move {
        let change = sub.recv().await?;
        let event = Event::default()
            .event("update")
            .json_data(&change)
            .unwrap_or_else(|_| Event::default().event("update").data(change.key.clone()));
        Some((Ok::<Event, Infallible>(event), sub))
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}
