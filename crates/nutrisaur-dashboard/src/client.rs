use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::StreamExt;
use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use nutrisaur_types::events::CommunityEvent;

use crate::dispatch::{Panel, refreshes};
use crate::frame::{Decoded, decode};
use crate::reconnect::ReconnectPolicy;
use crate::transport::{EventTransport, FrameStream};
use crate::view::{ConnectionStatus, DashboardView};

/// What happened to one incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Panels were refreshed. Failed refreshes are logged and not counted.
    Processed { refreshed: usize },
    /// Another event was still being handled.
    Dropped,
    /// Control, unknown, or unreadable event.
    Ignored,
}

enum StreamEnd {
    BarangayChanged,
    Dropped(String),
}

/// Live-update client for one dashboard page.
///
/// Holds one event stream open for the selected barangay, refreshes the
/// panels each event affects, and reconnects with linear backoff when the
/// stream drops.
pub struct DashboardClient<V, T> {
    inner: Arc<ClientInner<V, T>>,
}

struct ClientInner<V, T> {
    view: V,
    transport: T,
    barangay: watch::Sender<String>,
    /// Last growth standard announced by `who_standard_changed`
    who_standard: watch::Sender<Option<String>>,
    /// Set while an event is being handled; events arriving meanwhile are dropped
    busy: AtomicBool,
    connected: AtomicBool,
    policy: ReconnectPolicy,
}

impl<V, T> Clone for DashboardClient<V, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Holds the busy flag. Dropping it clears the flag and the update
/// indicator, so it can travel into a spawned task.
struct BusyGuard<V: DashboardView, T> {
    inner: Arc<ClientInner<V, T>>,
}

impl<V: DashboardView, T> BusyGuard<V, T> {
    fn try_claim(inner: &Arc<ClientInner<V, T>>) -> Option<Self> {
        inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        inner.view.set_update_indicator(true);
        Some(Self {
            inner: inner.clone(),
        })
    }
}

impl<V: DashboardView, T> Drop for BusyGuard<V, T> {
    fn drop(&mut self) {
        self.inner.view.set_update_indicator(false);
        self.inner.busy.store(false, Ordering::Release);
    }
}

impl<V, T> DashboardClient<V, T>
where
    V: DashboardView + 'static,
    T: EventTransport + 'static,
{
    pub fn new(
        view: V,
        transport: T,
        barangay: impl Into<String>,
        policy: ReconnectPolicy,
    ) -> Self {
        let (barangay, _) = watch::channel(barangay.into());
        let (who_standard, _) = watch::channel(None);
        Self {
            inner: Arc::new(ClientInner {
                view,
                transport,
                barangay,
                who_standard,
                busy: AtomicBool::new(false),
                connected: AtomicBool::new(false),
                policy,
            }),
        }
    }

    pub fn view(&self) -> &V {
        &self.inner.view
    }

    pub fn barangay(&self) -> String {
        self.inner.barangay.borrow().clone()
    }

    /// Select a new barangay. An open stream is closed and reopened for it;
    /// otherwise the next connection attempt picks it up.
    pub fn set_barangay(&self, barangay: impl Into<String>) {
        let barangay = barangay.into();
        self.inner.barangay.send_if_modified(|current| {
            if *current == barangay {
                return false;
            }
            *current = barangay;
            true
        });
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Growth standard from the most recent `who_standard_changed`, if any.
    pub fn who_standard(&self) -> Option<String> {
        self.inner.who_standard.borrow().clone()
    }

    /// Decode one `data:` payload and handle it.
    pub async fn handle_frame(&self, data: &str) -> HandleOutcome {
        match self.accept_frame(data) {
            Ok((event, guard)) => self.process(event, guard).await,
            Err(outcome) => outcome,
        }
    }

    pub async fn handle_event(&self, event: CommunityEvent) -> HandleOutcome {
        match self.accept(event) {
            Ok((event, guard)) => self.process(event, guard).await,
            Err(outcome) => outcome,
        }
    }

    fn accept_frame(
        &self,
        data: &str,
    ) -> Result<(CommunityEvent, BusyGuard<V, T>), HandleOutcome> {
        match decode(data) {
            Decoded::Event(event) => self.accept(event),
            Decoded::Unknown { kind } => {
                debug!("Unknown community event type: {}", kind);
                Err(HandleOutcome::Ignored)
            }
            Decoded::Malformed(reason) => {
                warn!("Error parsing community event: {}", reason);
                Err(HandleOutcome::Ignored)
            }
        }
    }

    /// Synchronous half of handling: record state carried by the event and
    /// claim the busy flag. Whoever claims first wins.
    fn accept(
        &self,
        event: CommunityEvent,
    ) -> Result<(CommunityEvent, BusyGuard<V, T>), HandleOutcome> {
        if event.is_control() {
            return Err(HandleOutcome::Ignored);
        }

        if let CommunityEvent::WhoStandardChanged { who_standard, .. } = &event {
            info!("WHO standard changed to {}", who_standard);
            self.inner.who_standard.send_replace(Some(who_standard.clone()));
        }

        match BusyGuard::try_claim(&self.inner) {
            Some(guard) => Ok((event, guard)),
            None => {
                debug!("Update already in progress, dropping {}", event.kind());
                Err(HandleOutcome::Dropped)
            }
        }
    }

    async fn process(&self, event: CommunityEvent, _guard: BusyGuard<V, T>) -> HandleOutcome {
        // Unscoped events refresh whatever barangay is selected
        let barangay = match event.barangay() {
            Some(barangay) => barangay.to_string(),
            None => self.barangay(),
        };
        debug!("Handling {} for {:?}", event.kind(), barangay);

        let view = &self.inner.view;
        let present: Vec<Panel> = refreshes(&event)
            .iter()
            .copied()
            .filter(|p| view.has_panel(*p))
            .collect();
        let results = join_all(present.iter().map(|&panel| {
            let scope = if panel.is_scoped() { barangay.as_str() } else { "" };
            view.refresh(panel, scope)
        }))
        .await;

        let mut refreshed = 0;
        for (panel, result) in present.iter().zip(results) {
            match result {
                Ok(()) => refreshed += 1,
                Err(e) => warn!("Refreshing {:?} failed: {}", panel, e),
            }
        }
        HandleOutcome::Processed { refreshed }
    }

    /// Full reload for the fallback poller. Skipped while an event is being
    /// handled, and holds the busy flag while it runs. Returns whether a
    /// reload ran and succeeded.
    pub async fn poll(&self) -> bool {
        let Some(_guard) = BusyGuard::try_claim(&self.inner) else {
            debug!("Update in progress, skipping fallback poll");
            return false;
        };
        match self.inner.view.poll_all(&self.barangay()).await {
            Ok(()) => true,
            Err(e) => {
                error!("Fallback update error: {}", e);
                false
            }
        }
    }

    /// Keep the event stream open, reconnecting after drops. Returns once
    /// reconnect attempts are exhausted.
    pub async fn run(&self) -> ConnectionStatus {
        let mut barangay_rx = self.inner.barangay.subscribe();
        let mut policy = self.inner.policy.clone();

        loop {
            let barangay = barangay_rx.borrow_and_update().clone();
            info!("Connecting to community event stream (barangay {:?})", barangay);

            match self.inner.transport.open(&barangay).await {
                Ok(frames) => {
                    policy.reset();
                    self.set_connected(true);

                    match self.pump(frames, &mut barangay_rx).await {
                        StreamEnd::BarangayChanged => {
                            debug!("Barangay changed, restarting event stream");
                            self.inner.connected.store(false, Ordering::Release);
                            continue;
                        }
                        StreamEnd::Dropped(reason) => {
                            warn!("Community event stream disconnected: {}", reason)
                        }
                    }
                }
                Err(e) => warn!("Community event stream failed to open: {}", e),
            }

            self.set_connected(false);

            match policy.next_delay() {
                Some(delay) => {
                    info!(
                        "Reconnecting community event stream in {:?} ({}/{})",
                        delay,
                        policy.attempts(),
                        policy.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    error!("Max reconnection attempts reached");
                    self.inner.view.set_connection_status(ConnectionStatus::Failed);
                    return ConnectionStatus::Failed;
                }
            }
        }
    }

    /// Run the stream loop on its own task. Abort the handle to stop.
    pub fn spawn(&self) -> JoinHandle<ConnectionStatus> {
        let client = self.clone();
        tokio::spawn(async move { client.run().await })
    }

    fn set_connected(&self, connected: bool) {
        self.inner.connected.store(connected, Ordering::Release);
        let status = if connected {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        };
        self.inner.view.set_connection_status(status);
    }

    async fn pump(
        &self,
        mut frames: FrameStream,
        barangay_rx: &mut watch::Receiver<String>,
    ) -> StreamEnd {
        loop {
            tokio::select! {
                changed = barangay_rx.changed() => {
                    return match changed {
                        Ok(()) => StreamEnd::BarangayChanged,
                        Err(_) => StreamEnd::Dropped("barangay selector closed".to_string()),
                    };
                }
                frame = frames.next() => match frame {
                    Some(Ok(data)) => {
                        // Claimed here, in arrival order. The refresh is not
                        // awaited, so a frame arriving mid-update is dropped.
                        if let Ok((event, guard)) = self.accept_frame(&data) {
                            let client = self.clone();
                            tokio::spawn(async move {
                                client.process(event, guard).await;
                            });
                        }
                    }
                    Some(Err(e)) => return StreamEnd::Dropped(e.to_string()),
                    None => return StreamEnd::Dropped("stream closed".to_string()),
                },
            }
        }
    }
}
