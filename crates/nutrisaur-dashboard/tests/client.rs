use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{StreamExt, stream};
use tokio::sync::Semaphore;

use nutrisaur_dashboard::client::{DashboardClient, HandleOutcome};
use nutrisaur_dashboard::dispatch::Panel;
use nutrisaur_dashboard::error::DashboardError;
use nutrisaur_dashboard::poller::FallbackPoller;
use nutrisaur_dashboard::reconnect::ReconnectPolicy;
use nutrisaur_dashboard::transport::{EventTransport, FrameStream};
use nutrisaur_dashboard::view::{ConnectionStatus, DashboardView};
use nutrisaur_types::events::CommunityEvent;

#[derive(Default)]
struct RecordingView {
    panels: Vec<Panel>,
    refreshed: Mutex<Vec<(Panel, String)>>,
    statuses: Mutex<Vec<ConnectionStatus>>,
    polls: AtomicUsize,
    indicator: AtomicBool,
    /// When set, refreshes and polls wait for a permit
    gate: Option<Arc<Semaphore>>,
}

impl RecordingView {
    fn with_panels(panels: &[Panel]) -> Self {
        Self {
            panels: panels.to_vec(),
            ..Default::default()
        }
    }

    fn gated(panels: &[Panel], gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::with_panels(panels)
        }
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await;
        }
    }

    fn refreshed(&self) -> Vec<(Panel, String)> {
        self.refreshed.lock().unwrap().clone()
    }

    fn statuses(&self) -> Vec<ConnectionStatus> {
        self.statuses.lock().unwrap().clone()
    }
}

impl DashboardView for RecordingView {
    fn has_panel(&self, panel: Panel) -> bool {
        self.panels.contains(&panel)
    }

    async fn refresh(&self, panel: Panel, barangay: &str) -> Result<(), DashboardError> {
        self.pass_gate().await;
        self.refreshed.lock().unwrap().push((panel, barangay.to_string()));
        Ok(())
    }

    async fn poll_all(&self, _barangay: &str) -> Result<(), DashboardError> {
        self.pass_gate().await;
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_connection_status(&self, status: ConnectionStatus) {
        self.statuses.lock().unwrap().push(status);
    }

    fn set_update_indicator(&self, visible: bool) {
        self.indicator.store(visible, Ordering::SeqCst);
    }
}

enum Script {
    Refuse,
    Frames(Vec<String>),
    /// Deliver the frames, then stay open
    FramesThenHold(Vec<String>),
    Hold,
}

struct ScriptedTransport {
    script: Script,
    opened: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    fn new(script: Script) -> (Self, Arc<Mutex<Vec<String>>>) {
        let opened = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                script,
                opened: opened.clone(),
            },
            opened,
        )
    }
}

impl EventTransport for ScriptedTransport {
    async fn open(&self, barangay: &str) -> Result<FrameStream, DashboardError> {
        self.opened.lock().unwrap().push(barangay.to_string());
        match &self.script {
            Script::Refuse => Err(DashboardError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE)),
            Script::Frames(frames) => Ok(Box::pin(stream::iter(
                frames.clone().into_iter().map(Ok::<String, DashboardError>),
            ))),
            Script::FramesThenHold(frames) => Ok(Box::pin(
                stream::iter(frames.clone().into_iter().map(Ok::<String, DashboardError>))
                    .chain(stream::pending()),
            )),
            Script::Hold => Ok(Box::pin(stream::pending::<Result<String, DashboardError>>())),
        }
    }
}

fn fast_policy(max_attempts: u32) -> ReconnectPolicy {
    ReconnectPolicy::new(max_attempts, Duration::from_millis(1))
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

fn screening(barangay: &str) -> CommunityEvent {
    CommunityEvent::ScreeningDataSaved {
        barangay: barangay.into(),
        screening_id: Some(1),
    }
}

#[tokio::test]
async fn unknown_event_type_is_ignored() {
    let (transport, _) = ScriptedTransport::new(Script::Hold);
    let client = DashboardClient::new(
        RecordingView::with_panels(&Panel::ALL),
        transport,
        "Orion",
        fast_policy(5),
    );

    let outcome = client.handle_frame(r#"{"type":"chart_theme_changed","data":{}}"#).await;
    assert_eq!(outcome, HandleOutcome::Ignored);
    assert_eq!(client.handle_frame("{oops").await, HandleOutcome::Ignored);
    assert_eq!(
        client.handle_frame(r#"{"type":"heartbeat","data":{"timestamp":5}}"#).await,
        HandleOutcome::Ignored
    );
    assert!(client.view().refreshed().is_empty());
}

#[tokio::test]
async fn only_present_panels_are_refreshed() {
    let (transport, _) = ScriptedTransport::new(Script::Hold);
    let view = RecordingView::with_panels(&[
        Panel::CommunityMetrics,
        Panel::TrendsChart,
        Panel::SevereCases,
    ]);
    let client = DashboardClient::new(view, transport, "", fast_policy(5));

    let outcome = client.handle_event(screening("Orion")).await;
    assert_eq!(outcome, HandleOutcome::Processed { refreshed: 3 });

    let refreshed = client.view().refreshed();
    assert!(refreshed.contains(&(Panel::CommunityMetrics, "Orion".to_string())));
    assert!(refreshed.contains(&(Panel::SevereCases, "Orion".to_string())));
    assert!(refreshed.contains(&(Panel::TrendsChart, String::new())));
    assert!(!client.view().indicator.load(Ordering::SeqCst));
    assert!(!client.is_busy());
}

#[tokio::test]
async fn unscoped_event_uses_selected_barangay() {
    let (transport, _) = ScriptedTransport::new(Script::Hold);
    let client = DashboardClient::new(
        RecordingView::with_panels(&[Panel::BarangayDistribution]),
        transport,
        "Orion",
        fast_policy(5),
    );

    client
        .handle_event(CommunityEvent::NewUserRegistered {
            barangay: String::new(),
            username: "maria".into(),
        })
        .await;
    assert_eq!(
        client.view().refreshed(),
        vec![(Panel::BarangayDistribution, "Orion".to_string())]
    );
}

#[tokio::test]
async fn event_during_update_is_dropped() {
    let gate = Arc::new(Semaphore::new(0));
    let view = RecordingView::gated(&[Panel::CommunityMetrics], gate.clone());
    let (transport, _) = ScriptedTransport::new(Script::Hold);
    let client = DashboardClient::new(view, transport, "Orion", fast_policy(5));

    let first = {
        let client = client.clone();
        tokio::spawn(async move { client.handle_event(screening("Orion")).await })
    };
    wait_until(|| client.is_busy()).await;
    assert!(client.view().indicator.load(Ordering::SeqCst));

    assert_eq!(client.handle_event(screening("Orion")).await, HandleOutcome::Dropped);
    // Fallback poll also stands aside
    assert!(!client.poll().await);

    gate.add_permits(10);
    assert_eq!(first.await.unwrap(), HandleOutcome::Processed { refreshed: 1 });
    assert_eq!(client.view().refreshed().len(), 1);
    assert!(!client.is_busy());
    assert!(client.poll().await);
}

fn physical(barangay: &str) -> String {
    format!(r#"{{"type":"physical_data_updated","data":{{"barangay":"{}"}}}}"#, barangay)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn earlier_frame_wins_when_two_arrive_together() {
    for _ in 0..10 {
        let gate = Arc::new(Semaphore::new(0));
        let view = RecordingView::gated(&[Panel::SevereCases], gate.clone());
        let (transport, _) = ScriptedTransport::new(Script::FramesThenHold(vec![
            physical("Orion"),
            physical("Bangkal"),
        ]));
        let client = DashboardClient::new(view, transport, "", fast_policy(5));
        let handle = client.spawn();

        wait_until(|| client.is_busy()).await;
        // Let the second frame reach the client while the first holds the flag
        tokio::time::sleep(Duration::from_millis(30)).await;
        gate.add_permits(10);
        wait_until(|| !client.is_busy()).await;

        assert_eq!(
            client.view().refreshed(),
            vec![(Panel::SevereCases, "Orion".to_string())]
        );
        handle.abort();
    }
}

#[tokio::test]
async fn event_during_poll_is_dropped() {
    let gate = Arc::new(Semaphore::new(0));
    let view = RecordingView::gated(&[Panel::CommunityMetrics], gate.clone());
    let (transport, _) = ScriptedTransport::new(Script::Hold);
    let client = DashboardClient::new(view, transport, "Orion", fast_policy(5));

    let poll = {
        let client = client.clone();
        tokio::spawn(async move { client.poll().await })
    };
    wait_until(|| client.is_busy()).await;

    assert_eq!(client.handle_event(screening("Orion")).await, HandleOutcome::Dropped);

    gate.add_permits(10);
    assert!(poll.await.unwrap());
    assert!(client.view().refreshed().is_empty());
    assert!(!client.is_busy());
}

#[tokio::test]
async fn who_standard_change_is_remembered() {
    let (transport, _) = ScriptedTransport::new(Script::Hold);
    let client = DashboardClient::new(
        RecordingView::with_panels(&[Panel::WhoClassifications]),
        transport,
        "Orion",
        fast_policy(5),
    );
    assert_eq!(client.who_standard(), None);

    let outcome = client
        .handle_frame(r#"{"type":"who_standard_changed","data":{"who_standard":"bmi-adult"}}"#)
        .await;
    assert_eq!(outcome, HandleOutcome::Processed { refreshed: 1 });
    assert_eq!(client.who_standard().as_deref(), Some("bmi-adult"));
    assert_eq!(
        client.view().refreshed(),
        vec![(Panel::WhoClassifications, "Orion".to_string())]
    );
}

#[tokio::test]
async fn gives_up_after_max_reconnects() {
    let (transport, opened) = ScriptedTransport::new(Script::Refuse);
    let client = DashboardClient::new(RecordingView::default(), transport, "Orion", fast_policy(5));

    let status = tokio::time::timeout(Duration::from_secs(5), client.run())
        .await
        .expect("run returns once attempts are exhausted");
    assert_eq!(status, ConnectionStatus::Failed);

    // Initial attempt plus five reconnects
    assert_eq!(opened.lock().unwrap().len(), 6);
    let statuses = client.view().statuses();
    assert_eq!(statuses.last(), Some(&ConnectionStatus::Failed));
    assert_eq!(
        statuses.iter().filter(|s| **s == ConnectionStatus::Disconnected).count(),
        6
    );
    assert!(!client.is_connected());
}

#[tokio::test]
async fn successful_open_resets_attempts_and_handles_frames() {
    let (transport, opened) = ScriptedTransport::new(Script::Frames(vec![physical("Orion")]));
    let client = DashboardClient::new(
        RecordingView::with_panels(&[Panel::SevereCases]),
        transport,
        "Orion",
        fast_policy(2),
    );

    // Every open succeeds, so the attempt budget never runs out
    let result = tokio::time::timeout(Duration::from_millis(200), client.run()).await;
    assert!(result.is_err());
    assert!(opened.lock().unwrap().len() > 3);
    assert!(client.view().statuses().contains(&ConnectionStatus::Connected));

    wait_until(|| !client.view().refreshed().is_empty()).await;
    assert_eq!(client.view().refreshed()[0], (Panel::SevereCases, "Orion".to_string()));
}

#[tokio::test]
async fn barangay_change_restarts_stream() {
    let (transport, opened) = ScriptedTransport::new(Script::Hold);
    let client = DashboardClient::new(RecordingView::default(), transport, "Orion", fast_policy(5));
    let handle = client.spawn();

    wait_until(|| client.is_connected()).await;
    client.set_barangay("Bangkal");
    wait_until(|| opened.lock().unwrap().len() == 2).await;

    assert_eq!(*opened.lock().unwrap(), vec!["Orion".to_string(), "Bangkal".to_string()]);
    wait_until(|| client.is_connected()).await;
    handle.abort();
}

#[tokio::test]
async fn fallback_polls_when_stream_never_connects() {
    let (transport, _) = ScriptedTransport::new(Script::Refuse);
    let client = DashboardClient::new(RecordingView::default(), transport, "Orion", fast_policy(5));
    let poller = FallbackPoller {
        grace: Duration::from_millis(10),
        interval: Duration::from_millis(20),
    };

    let result = tokio::time::timeout(Duration::from_millis(150), poller.run(&client)).await;
    assert!(result.is_err());
    assert!(client.view().polls.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn fallback_stands_down_when_connected() {
    let (transport, _) = ScriptedTransport::new(Script::Hold);
    let client = DashboardClient::new(RecordingView::default(), transport, "Orion", fast_policy(5));
    let handle = client.spawn();
    wait_until(|| client.is_connected()).await;

    let poller = FallbackPoller {
        grace: Duration::from_millis(10),
        interval: Duration::from_millis(20),
    };
    tokio::time::timeout(Duration::from_secs(1), poller.run(&client))
        .await
        .expect("poller returns when the stream is up");
    assert_eq!(client.view().polls.load(Ordering::SeqCst), 0);
    handle.abort();
}
