use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use nutrisaur_db::models::MetricsRow;
use nutrisaur_types::api::{ApiResponse, CommunityMetrics, RecentActivity, RiskDistribution};
use nutrisaur_types::models::LocationFilter;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// `?barangay=` as sent by the dashboard. Empty means everywhere.
#[derive(Debug, Default, Deserialize)]
pub struct LocationQuery {
    #[serde(default)]
    pub barangay: String,
}

pub async fn community_metrics(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<ApiResponse<CommunityMetrics>>, ApiError> {
    let filter = LocationFilter::parse(&query.barangay);
    let row = blocking(&state, move |s| s.db.community_metrics(&filter)).await?;
    Ok(Json(ApiResponse::ok(to_metrics(row))))
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn to_metrics(row: MetricsRow) -> CommunityMetrics {
    CommunityMetrics {
        total_screenings: row.total_screenings,
        avg_risk_score: round_one_decimal(row.avg_risk_score.unwrap_or(0.0)),
        risk_distribution: RiskDistribution {
            high: row.high_risk,
            moderate: row.moderate_risk,
            low: row.low_risk,
        },
        sam_cases: row.sam_cases,
        critical_muac: row.critical_muac,
        barangays_covered: row.barangays_covered,
        recent_activity: RecentActivity {
            screenings_this_week: row.screenings_this_week,
        },
    }
}
