use std::time::Duration;

use tracing::{debug, warn};

use crate::client::DashboardClient;
use crate::transport::EventTransport;
use crate::view::DashboardView;

pub const FALLBACK_GRACE: Duration = Duration::from_secs(5);
pub const FALLBACK_INTERVAL: Duration = Duration::from_secs(30);

/// Slow polling used when the event stream never comes up.
#[derive(Debug, Clone)]
pub struct FallbackPoller {
    /// How long the stream gets to connect before polling starts
    pub grace: Duration,
    pub interval: Duration,
}

impl Default for FallbackPoller {
    fn default() -> Self {
        Self {
            grace: FALLBACK_GRACE,
            interval: FALLBACK_INTERVAL,
        }
    }
}

impl FallbackPoller {
    /// Returns after the grace period if the stream is connected. Otherwise
    /// polls every `interval` until the task is dropped.
    pub async fn run<V, T>(&self, client: &DashboardClient<V, T>)
    where
        V: DashboardView + 'static,
        T: EventTransport + 'static,
    {
        tokio::time::sleep(self.grace).await;
        if client.is_connected() {
            debug!("Event stream connected, fallback polling not needed");
            return;
        }

        warn!(
            "Event stream not connected, enabling fallback polling every {:?}",
            self.interval
        );
        let mut ticker = tokio::time::interval(self.interval);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            client.poll().await;
        }
    }
}
