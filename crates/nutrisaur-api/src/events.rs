use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::{Stream, StreamExt};
use tracing::info;

use nutrisaur_gateway::stream::{HEARTBEAT_INTERVAL, community_stream};

use crate::metrics::LocationQuery;
use crate::state::AppState;

/// `GET /api/events?barangay=`: one SSE stream per dashboard page.
///
/// Each frame's data is the JSON envelope `{"type": .., "data": ..}`.
pub async fn event_stream(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    info!(
        "Dashboard stream opened for {:?} ({} already open)",
        query.barangay,
        state.dispatcher.stream_count()
    );

    let events = community_stream(&state.dispatcher, query.barangay, HEARTBEAT_INTERVAL)
        .map(|event| Event::default().json_data(&event));

    Sse::new(events).keep_alive(KeepAlive::default())
}
