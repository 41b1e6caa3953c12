use axum::{
    Json,
    extract::{Query, State},
};
use chrono::NaiveDateTime;

use nutrisaur_db::models::ScreeningRow;
use nutrisaur_types::api::{CriticalAlert, CriticalAlertsResponse};
use nutrisaur_types::models::{
    HIGH_RISK_THRESHOLD, LocationFilter, is_critical_muac, is_low_bmi, is_sam,
};

use crate::error::ApiError;
use crate::metrics::LocationQuery;
use crate::state::{AppState, blocking};

const ALERT_LIMIT: u32 = 10;

pub async fn critical_alerts(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<CriticalAlertsResponse>, ApiError> {
    let filter = LocationFilter::parse(&query.barangay);
    let rows = blocking(&state, move |s| s.db.critical_screenings(&filter, ALERT_LIMIT)).await?;

    let data: Vec<CriticalAlert> = rows.iter().map(alert_from_row).collect();
    Ok(Json(CriticalAlertsResponse {
        success: true,
        total_critical_cases: data.len(),
        data,
        barangay_filter: query.barangay,
    }))
}

/// Fired severity predicates, always in the same order.
pub fn risk_factors(row: &ScreeningRow) -> Vec<String> {
    let mut factors = Vec::new();
    if row.risk_score >= HIGH_RISK_THRESHOLD {
        factors.push(format!("High Risk Score ({})", row.risk_score));
    }
    if let Some(bmi) = row.bmi.filter(|_| is_low_bmi(row.bmi)) {
        factors.push(format!("Low BMI ({})", bmi));
    }
    if let Some(muac) = row.muac.filter(|_| is_critical_muac(row.muac)) {
        factors.push(format!("Critical MUAC ({}cm)", muac));
    }
    if let Some(whz) = row.whz_score.filter(|_| is_sam(row.whz_score)) {
        factors.push(format!("SAM Case (WHZ: {})", whz));
    }
    factors
}

pub fn alert_from_row(row: &ScreeningRow) -> CriticalAlert {
    let user = row
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .or_else(|| row.user_email.clone().filter(|e| !e.is_empty()))
        .unwrap_or_else(|| format!("User {}", row.id));

    CriticalAlert {
        kind: "critical".to_string(),
        message: format!("High malnutrition risk: {}", risk_factors(row).join(", ")),
        user,
        user_email: row.user_email.clone(),
        time: format_alert_time(&row.created_at),
        risk_score: row.risk_score,
        bmi: row.bmi,
        muac: row.muac,
        whz_score: row.whz_score,
    }
}

/// `2025-03-07 14:02:11` becomes `Mar 7, 2025`. Unparseable input is passed through.
pub fn format_alert_time(created_at: &str) -> String {
    NaiveDateTime::parse_from_str(created_at, "%Y-%m-%d %H:%M:%S")
        .map(|t| t.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|_| created_at.to_string())
}
