use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::{debug, info};

use crate::dispatch::Panel;
use crate::error::DashboardError;
use crate::view::{ConnectionStatus, DashboardView};

/// Headless dashboard that keeps the latest API response for every panel
/// the server has an endpoint for.
pub struct ApiDashboard {
    http: reqwest::Client,
    base_url: String,
    snapshots: Mutex<HashMap<Panel, Value>>,
    status: Mutex<Option<ConnectionStatus>>,
    updating: AtomicBool,
}

fn endpoint(panel: Panel) -> Option<&'static str> {
    match panel {
        Panel::CommunityMetrics => Some("/api/community/metrics"),
        Panel::SevereCases => Some("/api/community/critical-alerts"),
        _ => None,
    }
}

impl ApiDashboard {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            snapshots: Mutex::new(HashMap::new()),
            status: Mutex::new(None),
            updating: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self, panel: Panel) -> Option<Value> {
        self.snapshots.lock().ok()?.get(&panel).cloned()
    }

    pub fn status(&self) -> Option<ConnectionStatus> {
        self.status.lock().ok().and_then(|s| *s)
    }

    pub fn is_updating(&self) -> bool {
        self.updating.load(Ordering::Relaxed)
    }
}

impl DashboardView for ApiDashboard {
    fn has_panel(&self, panel: Panel) -> bool {
        endpoint(panel).is_some()
    }

    async fn refresh(&self, panel: Panel, barangay: &str) -> Result<(), DashboardError> {
        let path = endpoint(panel)
            .ok_or_else(|| DashboardError::Refresh(format!("{:?} has no data source", panel)))?;

        let value: Value = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(&[("barangay", barangay)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!("Refreshed {:?} for {:?}", panel, barangay);
        if let Ok(mut snapshots) = self.snapshots.lock() {
            snapshots.insert(panel, value);
        }
        Ok(())
    }

    async fn poll_all(&self, barangay: &str) -> Result<(), DashboardError> {
        for panel in Panel::ALL {
            if self.has_panel(panel) {
                let scope = if panel.is_scoped() { barangay } else { "" };
                self.refresh(panel, scope).await?;
            }
        }
        Ok(())
    }

    fn set_connection_status(&self, status: ConnectionStatus) {
        info!("Community connection: {}", status.label());
        if let Ok(mut current) = self.status.lock() {
            *current = Some(status);
        }
    }

    fn set_update_indicator(&self, visible: bool) {
        self.updating.store(visible, Ordering::Relaxed);
    }
}
