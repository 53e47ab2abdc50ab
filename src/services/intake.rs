// src/services/intake.rs

use crate::error::{AppError, AppResult};
use crate::events::{ReportEvent, ReportEvents};
use crate::models::{DbId, MergeOutcome, Submission};
use crate::store::Store;

/// A citizen submission after the HTTP layer has checked field presence.
#[derive(Debug, Clone)]
pub struct IntakeRequest {
    pub problem: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub department: String,
}

/// Normalizes the request into a [`Submission`]. A missing image falls back
/// to `placeholder_image` instead of rejecting the report.
pub fn prepare(
    citizen_id: DbId,
    req: IntakeRequest,
    placeholder_image: &str,
) -> AppResult<Submission> {
    let problem = req.problem.trim().to_string();
    if problem.is_empty() {
        return Err(AppError::validation("Problem is required."));
    }
    let department = req.department.trim().to_string();
    if department.is_empty() {
        return Err(AppError::validation("Department is required."));
    }
    if !req.latitude.is_finite() || !req.longitude.is_finite() {
        return Err(AppError::validation("Latitude and longitude must be numbers."));
    }

    let image_url = req
        .image_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| placeholder_image.to_string());
    let description = req
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    Ok(Submission {
        citizen_id,
        problem,
        description,
        image_url,
        department,
        latitude: req.latitude,
        longitude: req.longitude,
    })
}

/// Registers one submission against its (problem, district, ward) key.
pub async fn submit_report(
    store: &dyn Store,
    events: &ReportEvents,
    citizen_id: DbId,
    req: IntakeRequest,
    placeholder_image: &str,
) -> AppResult<MergeOutcome> {
    let submission = prepare(citizen_id, req, placeholder_image)?;
    let problem = submission.problem.clone();

    let outcome = store.submit_report(submission).await?;

    if outcome.location.is_unknown() {
        tracing::warn!(citizen_id, "no wards configured, report filed under unknown location");
    }
    tracing::info!(
        citizen_id,
        merged_report_id = outcome.merged_report_id,
        district = %outcome.location.district_name,
        ward = %outcome.location.ward_no,
        nos = outcome.nos,
        created = outcome.created,
        "report submitted"
    );

    let (merged_report_id, district, ward, nos) = (
        outcome.merged_report_id,
        outcome.location.district_name.clone(),
        outcome.location.ward_no.clone(),
        outcome.nos,
    );
    events.publish(if outcome.created {
        ReportEvent::Created {
            merged_report_id,
            problem,
            district,
            ward,
            nos,
        }
    } else {
        ReportEvent::Merged {
            merged_report_id,
            problem,
            district,
            ward,
            nos,
        }
    });

    Ok(outcome)
}
