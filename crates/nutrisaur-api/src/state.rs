use std::sync::Arc;

use tracing::error;

use nutrisaur_db::Database;
use nutrisaur_gateway::dispatcher::Dispatcher;

use crate::error::ApiError;
use crate::session::SessionConfig;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub dispatcher: Dispatcher,
    pub session: SessionConfig,
}

impl AppStateInner {
    pub fn new(db: Database, session: SessionConfig) -> AppState {
        Arc::new(Self {
            db,
            dispatcher: Dispatcher::new(),
            session,
        })
    }
}

/// Run blocking DB work (and password hashing) off the async runtime.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::Database)
}
