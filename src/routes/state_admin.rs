// src/routes/state_admin.rs

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::StateAdminUser;
use crate::error::{AppError, AppResult};
use crate::models::{DbId, MergedReport};
use crate::services::analytics::{self, DistrictAnalytics};
use crate::services::escalation;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQ {
    pub district_id: Option<String>,
}

pub async fn escalated_reports(
    State(state): State<AppState>,
    user: StateAdminUser,
) -> AppResult<Json<Vec<MergedReport>>> {
    tracing::debug!(state_admin_id = user.state_admin_id, "escalation list requested");
    let rows = escalation::escalated_reports(state.store.as_ref(), Utc::now()).await?;
    Ok(Json(rows))
}

pub async fn analytics(
    State(state): State<AppState>,
    user: StateAdminUser,
    Query(q): Query<AnalyticsQ>,
) -> AppResult<Json<DistrictAnalytics>> {
    let district_id: DbId = q
        .district_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("districtId is required."))?
        .parse()
        .map_err(|_| AppError::validation("districtId must be a number."))?;

    tracing::debug!(state_admin_id = user.state_admin_id, district_id, "analytics requested");
    let data = analytics::district_analytics(state.store.as_ref(), district_id, Utc::now()).await?;
    Ok(Json(data))
}
