// src/store/mod.rs

//! Storage seam.
//!
//! Handlers and services only ever see `Arc<dyn Store>`, injected through
//! [`crate::state::AppState`]. [`PgStore`] is the production backend;
//! [`MemoryStore`] keeps the same guarantees behind a single mutex and is
//! what the test suite runs against.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppResult;
use crate::models::{
    Admin, AdminReportView, Citizen, CitizenReport, DbId, Department, District, MergeOutcome,
    MergedReport, NewAdmin, NewCitizen, NewStateAdmin, StateAdmin, StatusChange, StatusCounts,
    StatusTransition, Submission, WeeklyCount,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Result of an admin update attempt, decided atomically with the write.
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    Updated(StatusTransition),
    NotFound,
    /// The report belongs to another district. Nothing was written.
    WrongDistrict,
    UnknownDepartment,
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    // ── reference data ──
    async fn districts(&self) -> AppResult<Vec<District>>;
    async fn district_by_id(&self, id: DbId) -> AppResult<Option<District>>;
    async fn departments(&self) -> AppResult<Vec<Department>>;

    // ── identities ──
    async fn create_citizen(&self, new: NewCitizen) -> AppResult<Citizen>;
    async fn citizen_by_phone(&self, phone: &str) -> AppResult<Option<Citizen>>;
    async fn set_push_token(&self, citizen_id: DbId, token: Option<String>) -> AppResult<()>;
    async fn create_admin(&self, new: NewAdmin) -> AppResult<Admin>;
    async fn admin_by_id(&self, id: DbId) -> AppResult<Option<Admin>>;
    async fn admin_by_email(&self, email: &str) -> AppResult<Option<Admin>>;
    async fn create_state_admin(&self, new: NewStateAdmin) -> AppResult<StateAdmin>;
    async fn state_admin_by_email(&self, email: &str) -> AppResult<Option<StateAdmin>>;

    // ── reports ──

    /// Registers one submission atomically: resolve the ward, resolve the
    /// department by exact name, bump or create the open aggregate for the
    /// (problem, district, ward) key, append the raw report. An unknown
    /// department aborts the whole unit with `AppError::NotFound`.
    async fn submit_report(&self, submission: Submission) -> AppResult<MergeOutcome>;

    async fn merged_report(&self, id: DbId) -> AppResult<Option<MergedReport>>;

    /// Applies a status/department change if the report belongs to
    /// `district`. When the status moves into `resolved` from anything else,
    /// every distinct contributing citizen gets `reward_points` in the same
    /// transaction.
    async fn update_merged_report(
        &self,
        id: DbId,
        district: &str,
        change: StatusChange,
        reward_points: i32,
    ) -> AppResult<UpdateOutcome>;

    async fn citizen_reports(&self, citizen_id: DbId) -> AppResult<Vec<CitizenReport>>;
    async fn district_reports(&self, district: &str) -> AppResult<Vec<AdminReportView>>;

    /// Aggregates with `nos > min_nos`, not resolved, created before
    /// `created_before`, oldest first.
    async fn escalated_reports(
        &self,
        min_nos: i32,
        created_before: DateTime<Utc>,
    ) -> AppResult<Vec<MergedReport>>;

    async fn status_counts(&self, district: &str) -> AppResult<StatusCounts>;

    /// Raw submissions per Monday-start week since `since`, only weeks with
    /// at least one submission.
    async fn weekly_submissions(
        &self,
        district: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<WeeklyCount>>;
}
