use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::info;

use nutrisaur_db::models::NewScreening;
use nutrisaur_types::api::{ApiResponse, ScreeningSaved, SessionClaims, SubmitScreeningRequest};
use nutrisaur_types::events::CommunityEvent;
use nutrisaur_types::models::RiskLevel;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

fn validate(req: &SubmitScreeningRequest) -> Result<(), ApiError> {
    if req.barangay.trim().is_empty() {
        return Err(ApiError::validation("Barangay is required"));
    }
    if !(0..=100).contains(&req.risk_score) {
        return Err(ApiError::validation("Risk score must be between 0 and 100"));
    }
    Ok(())
}

/// Store a screening for the logged-in user and notify dashboards watching
/// its barangay.
pub async fn submit_screening(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    payload: Result<Json<SubmitScreeningRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ScreeningSaved>>, ApiError> {
    let Json(req) = payload?;
    validate(&req)?;

    let barangay = req.barangay.trim().to_string();
    let screening = NewScreening {
        user_email: Some(claims.email.clone()),
        name: req.name,
        age: req.age,
        gender: req.gender,
        barangay: barangay.clone(),
        municipality: req.municipality,
        bmi: req.bmi,
        muac: req.muac,
        whz_score: req.whz_score,
        risk_score: req.risk_score,
        dietary_diversity_score: req.dietary_diversity_score,
        swelling: req.swelling,
        weight_loss: req.weight_loss,
        feeding_behavior: req.feeding_behavior,
    };

    let id = blocking(&state, move |s| s.db.insert_screening(&screening)).await?;
    info!("{} saved screening {} in {}", claims.username, id, barangay);

    state.dispatcher.broadcast(CommunityEvent::ScreeningDataSaved {
        barangay,
        screening_id: Some(id),
    });

    Ok(Json(ApiResponse::ok_with_message(
        "Screening saved",
        ScreeningSaved {
            id,
            risk_level: RiskLevel::classify(req.risk_score),
        },
    )))
}
