use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Event stream rejected with status {0}")]
    Status(reqwest::StatusCode),

    #[error("Panel refresh failed: {0}")]
    Refresh(String),
}
