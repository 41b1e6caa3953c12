use std::time::Duration;

use futures_util::Stream;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use nutrisaur_types::events::CommunityEvent;
use nutrisaur_types::models::LocationFilter;

use crate::dispatcher::Dispatcher;

/// Heartbeat cadence for idle dashboard streams.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

enum Next {
    Event(CommunityEvent),
    Skip,
    Closed,
}

/// Event stream for one dashboard: `connected` first, then every dispatched
/// event visible under `barangay`, with a `heartbeat` whenever `heartbeat_every`
/// elapses.
pub fn community_stream(
    dispatcher: &Dispatcher,
    barangay: String,
    heartbeat_every: Duration,
) -> impl Stream<Item = CommunityEvent> + Send + 'static + use<> {
    let mut rx = dispatcher.subscribe();
    let filter = LocationFilter::parse(&barangay);

    async_stream::stream! {
        debug!("Dashboard stream opened (barangay filter: {:?})", filter);
        yield CommunityEvent::Connected {
            barangay,
            timestamp: chrono::Utc::now().timestamp(),
        };

        let mut heartbeat = tokio::time::interval(heartbeat_every);
        // First tick completes immediately
        heartbeat.tick().await;

        loop {
            let next = tokio::select! {
                result = rx.recv() => match result {
                    Ok(event) if event.is_visible_to(&filter) => Next::Event(event),
                    Ok(_) => Next::Skip,
                    Err(RecvError::Lagged(n)) => {
                        warn!("Dashboard stream lagged by {} events", n);
                        Next::Skip
                    }
                    Err(RecvError::Closed) => Next::Closed,
                },
                _ = heartbeat.tick() => Next::Event(CommunityEvent::Heartbeat {
                    timestamp: chrono::Utc::now().timestamp(),
                }),
            };

            match next {
                Next::Event(event) => yield event,
                Next::Skip => continue,
                Next::Closed => break,
            }
        }
    }
}
