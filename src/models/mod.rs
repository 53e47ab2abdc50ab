// src/models/mod.rs

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type DbId = i64;

// ───────────────────────────────────────
// Reference data
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct District {
    pub id: DbId,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub secret_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ward {
    pub id: DbId,
    pub district_id: DbId,
    pub ward_no: i32,
    pub latitude: f64,
    pub longitude: f64,
}

/// A ward centroid joined with the name of its parent district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WardLocation {
    pub ward_id: DbId,
    pub district_name: String,
    pub ward_no: i32,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Department {
    pub id: DbId,
    pub name: String,
}

// ───────────────────────────────────────
// Identities
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Citizen {
    pub id: DbId,
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub points: i32,
    #[serde(skip_serializing, default)]
    pub push_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "admin_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    #[default]
    General,
    #[serde(alias = "department_admin")]
    Department,
}

/// District admin, always loaded together with its district name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Admin {
    pub id: DbId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: AdminRole,
    pub district_id: DbId,
    pub district_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StateAdmin {
    pub id: DbId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCitizen {
    pub name: String,
    pub phone: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: AdminRole,
    pub district_id: DbId,
}

#[derive(Debug, Clone)]
pub struct NewStateAdmin {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

// ───────────────────────────────────────
// Reports
// ───────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Submitted,
    InProgress,
    Resolved,
    Rejected,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 4] = [
        ReportStatus::Submitted,
        ReportStatus::InProgress,
        ReportStatus::Resolved,
        ReportStatus::Rejected,
    ];

    /// Open statuses keep the (problem, district, ward) key occupied.
    pub fn is_open(self) -> bool {
        matches!(self, ReportStatus::Submitted | ReportStatus::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Submitted => "submitted",
            ReportStatus::InProgress => "in_progress",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deduplicated unit of work (`merged_reports`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MergedReport {
    pub id: DbId,
    pub problem: String,
    pub district: String,
    pub ward: String,
    pub department_id: Option<DbId>,
    pub status: ReportStatus,
    pub nos: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One citizen submission (`all_reports`). Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RawReport {
    pub id: DbId,
    pub citizen_id: DbId,
    pub merged_report_id: DbId,
    pub problem: String,
    pub description: Option<String>,
    pub image_url: String,
    pub district: String,
    pub ward: String,
    pub created_at: DateTime<Utc>,
}

/// Raw submission joined with the live status of its aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CitizenReport {
    pub id: DbId,
    pub merged_report_id: DbId,
    pub problem: String,
    pub description: Option<String>,
    pub image_url: String,
    pub district: String,
    pub ward: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// Aggregate enriched for the district dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminReportView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub report: MergedReport,
    pub department_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_url: Option<String>,
    pub image_created_at: Option<DateTime<Utc>>,
}

// ───────────────────────────────────────
// Engine inputs / outputs
// ───────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub district_name: String,
    pub ward_no: String,
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub citizen_id: DbId,
    pub problem: String,
    pub description: Option<String>,
    pub image_url: String,
    pub department: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    pub merged_report_id: DbId,
    pub raw_report_id: DbId,
    pub nos: i32,
    pub created: bool,
    pub location: ResolvedLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ReportStatus,
    pub department_id: Option<DbId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardedCitizen {
    pub citizen_id: DbId,
    pub push_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StatusTransition {
    pub report: MergedReport,
    pub previous_status: ReportStatus,
    pub rewarded: Vec<RewardedCitizen>,
}

// ───────────────────────────────────────
// Analytics
// ───────────────────────────────────────
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub submitted: i64,
    pub in_progress: i64,
    pub resolved: i64,
    pub rejected: i64,
}

impl StatusCounts {
    pub fn add(&mut self, status: ReportStatus, n: i64) {
        match status {
            ReportStatus::Submitted => self.submitted += n,
            ReportStatus::InProgress => self.in_progress += n,
            ReportStatus::Resolved => self.resolved += n,
            ReportStatus::Rejected => self.rejected += n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct WeeklyCount {
    pub week_start: NaiveDate,
    pub count: i64,
}
