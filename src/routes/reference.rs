// src/routes/reference.rs

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::models::{Department, District};
use crate::state::AppState;

pub async fn list_departments(State(state): State<AppState>) -> AppResult<Json<Vec<Department>>> {
    Ok(Json(state.store.departments().await?))
}

/// Registration keys are never serialized.
pub async fn list_districts(State(state): State<AppState>) -> AppResult<Json<Vec<District>>> {
    Ok(Json(state.store.districts().await?))
}
