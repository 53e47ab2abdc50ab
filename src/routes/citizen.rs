// src/routes/citizen.rs

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::ValidJson;
use crate::auth::CitizenUser;
use crate::error::AppResult;
use crate::models::{CitizenReport, DbId};
use crate::services::intake::{self, IntakeRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitReportBody {
    #[validate(length(min = 1, max = 200, message = "Problem is required."))]
    pub problem: String,
    #[validate(length(max = 2000, message = "Description is too long."))]
    pub description: Option<String>,
    #[validate(length(max = 2048, message = "Image URL is too long."))]
    pub image_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[validate(length(min = 1, message = "Department is required."))]
    pub department: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitReportResp {
    pub message: &'static str,
    pub merged_report_id: DbId,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PushTokenBody {
    #[validate(length(max = 512, message = "Push token is too long."))]
    pub token: Option<String>,
}

pub async fn submit_report(
    State(state): State<AppState>,
    user: CitizenUser,
    ValidJson(body): ValidJson<SubmitReportBody>,
) -> AppResult<(StatusCode, Json<SubmitReportResp>)> {
    let req = IntakeRequest {
        problem: body.problem,
        description: body.description,
        image_url: body.image_url,
        latitude: body.latitude,
        longitude: body.longitude,
        department: body.department,
    };
    let outcome = intake::submit_report(
        state.store.as_ref(),
        &state.events,
        user.citizen_id,
        req,
        &state.config.placeholder_image_url,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitReportResp {
            message: "Report submitted successfully",
            merged_report_id: outcome.merged_report_id,
        }),
    ))
}

/// Newest first, each with the live status of its aggregate.
pub async fn my_reports(
    State(state): State<AppState>,
    user: CitizenUser,
) -> AppResult<Json<Vec<CitizenReport>>> {
    Ok(Json(state.store.citizen_reports(user.citizen_id).await?))
}

/// An empty or missing token unregisters the device.
pub async fn set_push_token(
    State(state): State<AppState>,
    user: CitizenUser,
    ValidJson(body): ValidJson<PushTokenBody>,
) -> AppResult<StatusCode> {
    let token = body.token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    state.store.set_push_token(user.citizen_id, token).await?;
    Ok(StatusCode::NO_CONTENT)
}
