use axum::{
    Extension, Json,
    extract::{Query, State, rejection::JsonRejection},
};
use serde::Deserialize;
use tracing::info;

use nutrisaur_db::models::{NewNotificationLog, NotificationLogRow, NotificationStatsRow};
use nutrisaur_types::api::{
    ApiResponse, CountBy, NotificationLog, NotificationLogsResponse, NotificationStats,
    RecordNotificationRequest, SessionClaims,
};

use crate::error::ApiError;
use crate::metrics::round_one_decimal;
use crate::state::{AppState, blocking};

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 200;

#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<u32>,
}

pub fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

pub async fn recent_logs(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<NotificationLogsResponse>, ApiError> {
    let limit = clamp_limit(query.limit);
    let rows = blocking(&state, move |s| s.db.recent_notification_logs(limit)).await?;

    Ok(Json(NotificationLogsResponse {
        success: true,
        logs: rows.into_iter().map(to_log).collect(),
    }))
}

pub async fn stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<NotificationStats>>, ApiError> {
    let row = blocking(&state, |s| s.db.notification_stats()).await?;
    Ok(Json(ApiResponse::ok(to_stats(row))))
}

/// Record one push dispatch attempt. Admin sessions only.
pub async fn record_log(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    payload: Result<Json<RecordNotificationRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<NotificationLog>>, ApiError> {
    if !claims.is_admin {
        return Err(ApiError::Forbidden);
    }
    let Json(req) = payload?;

    if req.notification_type.trim().is_empty() || req.target_type.trim().is_empty() {
        return Err(ApiError::validation(
            "notification_type and target_type are required",
        ));
    }
    if req.tokens_sent < 0 {
        return Err(ApiError::validation("tokens_sent cannot be negative"));
    }

    let log = NewNotificationLog {
        event_id: req.event_id,
        notification_type: req.notification_type,
        target_type: req.target_type,
        target_value: req.target_value,
        tokens_sent: req.tokens_sent,
        success: req.success,
        error_message: req.error_message,
    };

    let row = blocking(&state, move |s| {
        let id = s.db.insert_notification_log(&log)?;
        // Read back so the response carries the stored timestamp
        s.db.get_notification_log(id)?
            .ok_or_else(|| anyhow::anyhow!("notification log {} missing after insert", id))
    })
    .await?;

    info!(
        "{} recorded {} notification to {} ({} tokens)",
        claims.username, row.notification_type, row.target_type, row.tokens_sent
    );
    Ok(Json(ApiResponse::ok_with_message("Notification logged", to_log(row))))
}

fn to_log(row: NotificationLogRow) -> NotificationLog {
    NotificationLog {
        id: row.id,
        event_id: row.event_id,
        notification_type: row.notification_type,
        target_type: row.target_type,
        target_value: row.target_value,
        tokens_sent: row.tokens_sent,
        success: row.success,
        error_message: row.error_message,
        created_at: row.created_at,
    }
}

fn to_stats(row: NotificationStatsRow) -> NotificationStats {
    let success_rate = if row.total > 0 {
        round_one_decimal(row.successful as f64 / row.total as f64 * 100.0)
    } else {
        0.0
    };
    let counts = |pairs: Vec<(String, i64)>| {
        pairs
            .into_iter()
            .map(|(key, count)| CountBy { key, count })
            .collect()
    };

    NotificationStats {
        total_notifications: row.total,
        successful_notifications: row.successful,
        failed_notifications: row.failed,
        success_rate,
        by_type: counts(row.by_type),
        by_target: counts(row.by_target),
        total_tokens_sent: row.total_tokens_sent,
        notifications_24h: row.last_24h,
    }
}
