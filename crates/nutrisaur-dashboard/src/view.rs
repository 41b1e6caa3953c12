use std::future::Future;

use crate::dispatch::Panel;
use crate::error::DashboardError;

/// Connection indicator states shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    /// Reconnect attempts exhausted
    Failed,
}

impl ConnectionStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Connected => "Connected",
            Self::Disconnected => "Disconnected",
            Self::Failed => "Failed",
        }
    }
}

/// The page the client drives. Panels may be missing from a partially
/// loaded view, so every refresh is guarded by `has_panel`.
pub trait DashboardView: Send + Sync {
    fn has_panel(&self, panel: Panel) -> bool;

    /// Refresh one panel. `barangay` is empty for unscoped panels.
    fn refresh(
        &self,
        panel: Panel,
        barangay: &str,
    ) -> impl Future<Output = Result<(), DashboardError>> + Send;

    /// Full reload used by the fallback poller.
    fn poll_all(&self, barangay: &str) -> impl Future<Output = Result<(), DashboardError>> + Send;

    fn set_connection_status(&self, status: ConnectionStatus);

    fn set_update_indicator(&self, visible: bool);
}
