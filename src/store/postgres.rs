// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, query_scalar, Pool, Postgres};

use super::{Store, UpdateOutcome};
use crate::error::{AppError, AppResult};
use crate::geo;
use crate::models::{
    Admin, AdminReportView, Citizen, CitizenReport, DbId, Department, District, MergeOutcome,
    MergedReport, NewAdmin, NewCitizen, NewStateAdmin, ReportStatus, RewardedCitizen, StateAdmin,
    StatusChange, StatusCounts, StatusTransition, Submission, WardLocation, WeeklyCount,
};

const WARD_LOCATIONS: &str = r#"
    SELECT w.id AS ward_id, d.name AS district_name, w.ward_no, w.latitude, w.longitude
    FROM public.wards w
    JOIN public.districts d ON d.id = w.district_id
    ORDER BY w.id
"#;

const ADMIN_COLUMNS: &str = r#"
    a.id, a.name, a.email, a.password_hash, a.role, a.district_id,
    d.name AS district_name, a.created_at
"#;

const MERGED_COLUMNS: &str =
    "id, problem, district, ward, department_id, status, nos, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn districts(&self) -> AppResult<Vec<District>> {
        let rows = query_as::<_, District>(
            r#"SELECT id, name, secret_key FROM public.districts ORDER BY name"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn district_by_id(&self, id: DbId) -> AppResult<Option<District>> {
        let row = query_as::<_, District>(
            r#"SELECT id, name, secret_key FROM public.districts WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn departments(&self) -> AppResult<Vec<Department>> {
        let rows = query_as::<_, Department>(
            r#"SELECT id, name FROM public.departments ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_citizen(&self, new: NewCitizen) -> AppResult<Citizen> {
        let row = query_as::<_, Citizen>(
            r#"
            INSERT INTO public.citizens (name, phone, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, phone, password_hash, points, push_token, created_at
            "#,
        )
        .bind(new.name)
        .bind(new.phone)
        .bind(new.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn citizen_by_phone(&self, phone: &str) -> AppResult<Option<Citizen>> {
        let row = query_as::<_, Citizen>(
            r#"SELECT id, name, phone, password_hash, points, push_token, created_at
               FROM public.citizens WHERE phone = $1"#,
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set_push_token(&self, citizen_id: DbId, token: Option<String>) -> AppResult<()> {
        let res = query(r#"UPDATE public.citizens SET push_token = $2 WHERE id = $1"#)
            .bind(citizen_id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::not_found("Citizen not found"));
        }
        Ok(())
    }

    async fn create_admin(&self, new: NewAdmin) -> AppResult<Admin> {
        let row = query_as::<_, Admin>(
            r#"
            WITH a AS (
                INSERT INTO public.admins (name, email, password_hash, role, district_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            )
            SELECT a.id, a.name, a.email, a.password_hash, a.role, a.district_id,
                   d.name AS district_name, a.created_at
            FROM a JOIN public.districts d ON d.id = a.district_id
            "#,
        )
        .bind(new.name)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.role)
        .bind(new.district_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn admin_by_id(&self, id: DbId) -> AppResult<Option<Admin>> {
        let sql = format!(
            "SELECT {ADMIN_COLUMNS} FROM public.admins a \
             JOIN public.districts d ON d.id = a.district_id WHERE a.id = $1"
        );
        let row = query_as::<_, Admin>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn admin_by_email(&self, email: &str) -> AppResult<Option<Admin>> {
        let sql = format!(
            "SELECT {ADMIN_COLUMNS} FROM public.admins a \
             JOIN public.districts d ON d.id = a.district_id WHERE a.email = $1"
        );
        let row = query_as::<_, Admin>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_state_admin(&self, new: NewStateAdmin) -> AppResult<StateAdmin> {
        let row = query_as::<_, StateAdmin>(
            r#"
            INSERT INTO public.state_admins (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(new.name)
        .bind(new.email)
        .bind(new.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn state_admin_by_email(&self, email: &str) -> AppResult<Option<StateAdmin>> {
        let row = query_as::<_, StateAdmin>(
            r#"SELECT id, name, email, password_hash, created_at
               FROM public.state_admins WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn submit_report(&self, s: Submission) -> AppResult<MergeOutcome> {
        let mut tx = self.pool.begin().await?;

        // 1) Geo key
        let wards = query_as::<_, WardLocation>(WARD_LOCATIONS)
            .fetch_all(&mut *tx)
            .await?;
        let location = geo::resolve(&wards, s.latitude, s.longitude);

        // 2) Department by exact name
        let department_id: Option<DbId> =
            query_scalar(r#"SELECT id FROM public.departments WHERE name = $1"#)
                .bind(&s.department)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(department_id) = department_id else {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!(
                "Department '{}' not found",
                s.department
            )));
        };

        // 3) Find-or-create the open aggregate. The partial unique index on the
        //    open key serializes concurrent submissions for the same key.
        let (merged_report_id, nos, created): (DbId, i32, bool) = query_as(
            r#"
            INSERT INTO public.merged_reports (problem, district, ward, department_id, status, nos)
            VALUES ($1, $2, $3, $4, 'submitted', 1)
            ON CONFLICT (problem, district, ward) WHERE status IN ('submitted', 'in_progress')
            DO UPDATE SET nos = merged_reports.nos + 1,
                          updated_at = now()
            RETURNING id, nos, (xmax = 0) AS created
            "#,
        )
        .bind(&s.problem)
        .bind(&location.district_name)
        .bind(&location.ward_no)
        .bind(department_id)
        .fetch_one(&mut *tx)
        .await?;

        // 4) Append-only raw report
        let raw_report_id: DbId = query_scalar(
            r#"
            INSERT INTO public.all_reports
                (citizen_id, merged_report_id, problem, description, image_url, district, ward)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(s.citizen_id)
        .bind(merged_report_id)
        .bind(&s.problem)
        .bind(&s.description)
        .bind(&s.image_url)
        .bind(&location.district_name)
        .bind(&location.ward_no)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(MergeOutcome {
            merged_report_id,
            raw_report_id,
            nos,
            created,
            location,
        })
    }

    async fn merged_report(&self, id: DbId) -> AppResult<Option<MergedReport>> {
        let sql = format!("SELECT {MERGED_COLUMNS} FROM public.merged_reports WHERE id = $1");
        let row = query_as::<_, MergedReport>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_merged_report(
        &self,
        id: DbId,
        district: &str,
        change: StatusChange,
        reward_points: i32,
    ) -> AppResult<UpdateOutcome> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(String, ReportStatus)> = query_as(
            r#"SELECT district, status FROM public.merged_reports WHERE id = $1 FOR UPDATE"#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((owner, previous_status)) = current else {
            return Ok(UpdateOutcome::NotFound);
        };
        if owner != district {
            return Ok(UpdateOutcome::WrongDistrict);
        }

        if let Some(department_id) = change.department_id {
            let exists: bool =
                query_scalar(r#"SELECT EXISTS(SELECT 1 FROM public.departments WHERE id = $1)"#)
                    .bind(department_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if !exists {
                return Ok(UpdateOutcome::UnknownDepartment);
            }
        }

        let sql = format!(
            "UPDATE public.merged_reports SET \
                 status = $2, \
                 department_id = COALESCE($3, department_id), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {MERGED_COLUMNS}"
        );
        let report = query_as::<_, MergedReport>(&sql)
            .bind(id)
            .bind(change.status)
            .bind(change.department_id)
            .fetch_one(&mut *tx)
            .await?;

        let mut rewarded = Vec::new();
        if change.status == ReportStatus::Resolved && previous_status != ReportStatus::Resolved {
            let rows: Vec<(DbId, Option<String>)> = query_as(
                r#"
                UPDATE public.citizens SET points = points + $2
                WHERE id IN (
                    SELECT DISTINCT citizen_id FROM public.all_reports WHERE merged_report_id = $1
                )
                RETURNING id, push_token
                "#,
            )
            .bind(id)
            .bind(reward_points)
            .fetch_all(&mut *tx)
            .await?;
            rewarded = rows
                .into_iter()
                .map(|(citizen_id, push_token)| RewardedCitizen {
                    citizen_id,
                    push_token,
                })
                .collect();
            rewarded.sort_by_key(|r| r.citizen_id);
        }

        tx.commit().await?;

        Ok(UpdateOutcome::Updated(StatusTransition {
            report,
            previous_status,
            rewarded,
        }))
    }

    async fn citizen_reports(&self, citizen_id: DbId) -> AppResult<Vec<CitizenReport>> {
        let rows = query_as::<_, CitizenReport>(
            r#"
            SELECT r.id, r.merged_report_id, r.problem, r.description, r.image_url,
                   r.district, r.ward, m.status, r.created_at
            FROM public.all_reports r
            JOIN public.merged_reports m ON m.id = r.merged_report_id
            WHERE r.citizen_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .bind(citizen_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn district_reports(&self, district: &str) -> AppResult<Vec<AdminReportView>> {
        let rows = query_as::<_, AdminReportView>(
            r#"
            SELECT m.id, m.problem, m.district, m.ward, m.department_id, m.status, m.nos,
                   m.created_at, m.updated_at,
                   dep.name AS department_name,
                   w.latitude, w.longitude,
                   img.image_url, img.created_at AS image_created_at
            FROM public.merged_reports m
            LEFT JOIN public.departments dep ON dep.id = m.department_id
            LEFT JOIN public.districts d ON d.name = m.district
            LEFT JOIN public.wards w ON w.district_id = d.id AND w.ward_no::text = m.ward
            LEFT JOIN LATERAL (
                SELECT r.image_url, r.created_at
                FROM public.all_reports r
                WHERE r.merged_report_id = m.id
                ORDER BY r.created_at DESC, r.id DESC
                LIMIT 1
            ) img ON TRUE
            WHERE m.district = $1
            ORDER BY m.updated_at DESC, m.id DESC
            "#,
        )
        .bind(district)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn escalated_reports(
        &self,
        min_nos: i32,
        created_before: DateTime<Utc>,
    ) -> AppResult<Vec<MergedReport>> {
        let sql = format!(
            "SELECT {MERGED_COLUMNS} FROM public.merged_reports \
             WHERE nos > $1 AND status <> 'resolved' AND created_at < $2 \
             ORDER BY created_at ASC, id ASC"
        );
        let rows = query_as::<_, MergedReport>(&sql)
            .bind(min_nos)
            .bind(created_before)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn status_counts(&self, district: &str) -> AppResult<StatusCounts> {
        let rows: Vec<(ReportStatus, i64)> = query_as(
            r#"SELECT status, COUNT(*) FROM public.merged_reports
               WHERE district = $1 GROUP BY status"#,
        )
        .bind(district)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            counts.add(status, n);
        }
        Ok(counts)
    }

    async fn weekly_submissions(
        &self,
        district: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<WeeklyCount>> {
        let rows = query_as::<_, WeeklyCount>(
            r#"
            SELECT (date_trunc('week', created_at AT TIME ZONE 'UTC'))::date AS week_start,
                   COUNT(*) AS count
            FROM public.all_reports
            WHERE district = $1 AND created_at >= $2
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(district)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
