// src/routes/reports.rs

use axum::{
    extract::{Path, State},
    Json,
};

use crate::auth::{AuthUser, DistrictAdmin, Role};
use crate::error::{AppError, AppResult};
use crate::models::{DbId, MergedReport};
use crate::state::AppState;

/// One aggregate by id. District admins only see their own district.
pub async fn get_report(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<MergedReport>> {
    let report = state
        .store
        .merged_report(id)
        .await?
        .ok_or_else(|| AppError::not_found("Report not found"))?;

    if user.role == Role::Admin {
        let admin = DistrictAdmin::load(&state, user.id).await?;
        if admin.district_name != report.district {
            tracing::warn!(admin_id = admin.admin_id, merged_report_id = id, "cross-district read rejected");
            return Err(AppError::Forbidden);
        }
    }
    Ok(Json(report))
}
