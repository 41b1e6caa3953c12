use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::state::AppState;
use crate::{alerts, auth, events, metrics, notifications, recommendations, screenings};

/// Every API route. Layers for CORS and tracing are added by the server.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/login", post(auth::login))
        .route("/api/register", post(auth::register))
        .route("/api/logout", post(auth::logout))
        .route("/api/community/metrics", get(metrics::community_metrics))
        .route("/api/community/critical-alerts", get(alerts::critical_alerts))
        .route("/api/recommendations", get(recommendations::food_recommendations))
        .route("/api/notifications/recent", get(notifications::recent_logs))
        .route("/api/notifications/stats", get(notifications::stats))
        .route("/api/events", get(events::event_stream))
        .route("/health", get(health));

    let protected = Router::new()
        .route("/api/session", get(auth::current_session))
        .route("/api/screenings", post(screenings::submit_screening))
        .route("/api/notifications/logs", post(notifications::record_log))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::require_session,
        ));

    public.merge(protected).with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
