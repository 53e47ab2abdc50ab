// src/store/memory.rs

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{Store, UpdateOutcome};
use crate::error::{AppError, AppResult};
use crate::geo;
use crate::models::{
    Admin, AdminReportView, Citizen, CitizenReport, DbId, Department, District, MergeOutcome,
    MergedReport, NewAdmin, NewCitizen, NewStateAdmin, RawReport, ReportStatus, RewardedCitizen,
    StateAdmin, StatusChange, StatusCounts, StatusTransition, Submission, Ward, WardLocation,
    WeeklyCount,
};
use crate::services::analytics::week_start;

#[derive(Default)]
struct Tables {
    next_id: DbId,
    districts: Vec<District>,
    wards: Vec<Ward>,
    departments: Vec<Department>,
    citizens: Vec<Citizen>,
    admins: Vec<Admin>,
    state_admins: Vec<StateAdmin>,
    merged: Vec<MergedReport>,
    raw: Vec<RawReport>,
}

impl Tables {
    fn id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn ward_locations(&self) -> Vec<WardLocation> {
        self.wards
            .iter()
            .filter_map(|w| {
                let district = self.districts.iter().find(|d| d.id == w.district_id)?;
                Some(WardLocation {
                    ward_id: w.id,
                    district_name: district.name.clone(),
                    ward_no: w.ward_no,
                    latitude: w.latitude,
                    longitude: w.longitude,
                })
            })
            .collect()
    }
}

/// In-process [`Store`]. Every operation holds one lock for its whole
/// duration, which gives the same all-or-nothing and no-double-open
/// guarantees the Postgres backend gets from its transaction.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same districts, wards and departments the reference-data migration loads.
    pub async fn seeded() -> Self {
        let store = Self::new();
        let ranchi = store.add_district("Ranchi", "RANCHI_ADMIN_KEY").await;
        let dhanbad = store.add_district("Dhanbad", "DHANBAD_ADMIN_KEY").await;
        let jamshedpur = store.add_district("Jamshedpur", "JAMSHEDPUR_ADMIN_KEY").await;
        for (district, ward_no, lat, lon) in [
            (ranchi.id, 1, 23.3700, 85.3250),
            (ranchi.id, 7, 23.3441, 85.3096),
            (ranchi.id, 12, 23.3569, 85.3340),
            (ranchi.id, 21, 23.4000, 85.3600),
            (dhanbad.id, 3, 23.7957, 86.4304),
            (dhanbad.id, 9, 23.8143, 86.4412),
            (jamshedpur.id, 5, 22.8046, 86.2029),
        ] {
            store.add_ward(district, ward_no, lat, lon).await;
        }
        for name in [
            "Public Health / Sanitation Department",
            "Engineering / Roads Department",
            "Street Lighting / Electrical Department",
            "Water Supply Department",
            "Building & Town Planning",
            "Parks & Horticulture Department",
            "Licensing / Trade & Markets Department",
            "Education & Community Services",
            "Fire & Emergency Services",
            "Health Department",
        ] {
            store.add_department(name).await;
        }
        store
    }

    pub async fn add_district(&self, name: &str, secret_key: &str) -> District {
        let mut t = self.tables.lock().await;
        let district = District {
            id: t.id(),
            name: name.to_string(),
            secret_key: secret_key.to_string(),
        };
        t.districts.push(district.clone());
        district
    }

    pub async fn add_ward(&self, district_id: DbId, ward_no: i32, latitude: f64, longitude: f64) -> Ward {
        let mut t = self.tables.lock().await;
        let ward = Ward {
            id: t.id(),
            district_id,
            ward_no,
            latitude,
            longitude,
        };
        t.wards.push(ward.clone());
        ward
    }

    pub async fn add_department(&self, name: &str) -> Department {
        let mut t = self.tables.lock().await;
        let department = Department {
            id: t.id(),
            name: name.to_string(),
        };
        t.departments.push(department.clone());
        department
    }

    /// Imports an aggregate as-is (historical data). The id is reassigned.
    pub async fn import_merged_report(&self, mut report: MergedReport) -> MergedReport {
        let mut t = self.tables.lock().await;
        report.id = t.id();
        t.merged.push(report.clone());
        report
    }

    pub async fn merged_reports(&self) -> Vec<MergedReport> {
        self.tables.lock().await.merged.clone()
    }

    pub async fn raw_reports(&self) -> Vec<RawReport> {
        self.tables.lock().await.raw.clone()
    }

    pub async fn citizen(&self, id: DbId) -> Option<Citizen> {
        self.tables
            .lock()
            .await
            .citizens
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn districts(&self) -> AppResult<Vec<District>> {
        let mut rows = self.tables.lock().await.districts.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn district_by_id(&self, id: DbId) -> AppResult<Option<District>> {
        let t = self.tables.lock().await;
        Ok(t.districts.iter().find(|d| d.id == id).cloned())
    }

    async fn departments(&self) -> AppResult<Vec<Department>> {
        Ok(self.tables.lock().await.departments.clone())
    }

    async fn create_citizen(&self, new: NewCitizen) -> AppResult<Citizen> {
        let mut t = self.tables.lock().await;
        if t.citizens.iter().any(|c| c.phone == new.phone) {
            return Err(AppError::Conflict(
                "Citizen with this phone number already exists".into(),
            ));
        }
        let citizen = Citizen {
            id: t.id(),
            name: new.name,
            phone: new.phone,
            password_hash: new.password_hash,
            points: 0,
            push_token: None,
            created_at: Utc::now(),
        };
        t.citizens.push(citizen.clone());
        Ok(citizen)
    }

    async fn citizen_by_phone(&self, phone: &str) -> AppResult<Option<Citizen>> {
        let t = self.tables.lock().await;
        Ok(t.citizens.iter().find(|c| c.phone == phone).cloned())
    }

    async fn set_push_token(&self, citizen_id: DbId, token: Option<String>) -> AppResult<()> {
        let mut t = self.tables.lock().await;
        let citizen = t
            .citizens
            .iter_mut()
            .find(|c| c.id == citizen_id)
            .ok_or_else(|| AppError::not_found("Citizen not found"))?;
        citizen.push_token = token;
        Ok(())
    }

    async fn create_admin(&self, new: NewAdmin) -> AppResult<Admin> {
        let mut t = self.tables.lock().await;
        if t.admins.iter().any(|a| a.email == new.email) {
            return Err(AppError::Conflict("Admin with this email already exists".into()));
        }
        let district_name = t
            .districts
            .iter()
            .find(|d| d.id == new.district_id)
            .map(|d| d.name.clone())
            .ok_or_else(|| AppError::not_found("District not found"))?;
        let admin = Admin {
            id: t.id(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            district_id: new.district_id,
            district_name,
            created_at: Utc::now(),
        };
        t.admins.push(admin.clone());
        Ok(admin)
    }

    async fn admin_by_id(&self, id: DbId) -> AppResult<Option<Admin>> {
        let t = self.tables.lock().await;
        Ok(t.admins.iter().find(|a| a.id == id).cloned())
    }

    async fn admin_by_email(&self, email: &str) -> AppResult<Option<Admin>> {
        let t = self.tables.lock().await;
        Ok(t.admins.iter().find(|a| a.email == email).cloned())
    }

    async fn create_state_admin(&self, new: NewStateAdmin) -> AppResult<StateAdmin> {
        let mut t = self.tables.lock().await;
        if t.state_admins.iter().any(|a| a.email == new.email) {
            return Err(AppError::Conflict(
                "State admin with this email already exists".into(),
            ));
        }
        let admin = StateAdmin {
            id: t.id(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            created_at: Utc::now(),
        };
        t.state_admins.push(admin.clone());
        Ok(admin)
    }

    async fn state_admin_by_email(&self, email: &str) -> AppResult<Option<StateAdmin>> {
        let t = self.tables.lock().await;
        Ok(t.state_admins.iter().find(|a| a.email == email).cloned())
    }

    async fn submit_report(&self, s: Submission) -> AppResult<MergeOutcome> {
        let mut t = self.tables.lock().await;

        let location = geo::resolve(&t.ward_locations(), s.latitude, s.longitude);

        let department_id = t
            .departments
            .iter()
            .find(|d| d.name == s.department)
            .map(|d| d.id)
            .ok_or_else(|| AppError::NotFound(format!("Department '{}' not found", s.department)))?;

        let now = Utc::now();
        let open = t.merged.iter_mut().find(|m| {
            m.status.is_open()
                && m.problem == s.problem
                && m.district == location.district_name
                && m.ward == location.ward_no
        });

        let (merged_report_id, nos, created) = match open {
            Some(m) => {
                m.nos += 1;
                m.updated_at = now;
                (m.id, m.nos, false)
            }
            None => {
                let id = t.id();
                t.merged.push(MergedReport {
                    id,
                    problem: s.problem.clone(),
                    district: location.district_name.clone(),
                    ward: location.ward_no.clone(),
                    department_id: Some(department_id),
                    status: ReportStatus::Submitted,
                    nos: 1,
                    created_at: now,
                    updated_at: now,
                });
                (id, 1, true)
            }
        };

        let raw_report_id = t.id();
        t.raw.push(RawReport {
            id: raw_report_id,
            citizen_id: s.citizen_id,
            merged_report_id,
            problem: s.problem,
            description: s.description,
            image_url: s.image_url,
            district: location.district_name.clone(),
            ward: location.ward_no.clone(),
            created_at: now,
        });

        Ok(MergeOutcome {
            merged_report_id,
            raw_report_id,
            nos,
            created,
            location,
        })
    }

    async fn merged_report(&self, id: DbId) -> AppResult<Option<MergedReport>> {
        let t = self.tables.lock().await;
        Ok(t.merged.iter().find(|m| m.id == id).cloned())
    }

    async fn update_merged_report(
        &self,
        id: DbId,
        district: &str,
        change: StatusChange,
        reward_points: i32,
    ) -> AppResult<UpdateOutcome> {
        let mut t = self.tables.lock().await;

        let Some(idx) = t.merged.iter().position(|m| m.id == id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if t.merged[idx].district != district {
            return Ok(UpdateOutcome::WrongDistrict);
        }
        if let Some(department_id) = change.department_id {
            if !t.departments.iter().any(|d| d.id == department_id) {
                return Ok(UpdateOutcome::UnknownDepartment);
            }
        }

        // Reopening must not produce a second open aggregate for the key.
        if change.status.is_open() {
            let current = &t.merged[idx];
            let clash = t.merged.iter().any(|m| {
                m.id != current.id
                    && m.status.is_open()
                    && m.problem == current.problem
                    && m.district == current.district
                    && m.ward == current.ward
            });
            if clash {
                return Err(AppError::Conflict(
                    "Another open report already exists for this problem and location".into(),
                ));
            }
        }

        let previous_status = t.merged[idx].status;
        let report = {
            let m = &mut t.merged[idx];
            m.status = change.status;
            if let Some(department_id) = change.department_id {
                m.department_id = Some(department_id);
            }
            m.updated_at = Utc::now();
            m.clone()
        };

        let mut rewarded = Vec::new();
        if change.status == ReportStatus::Resolved && previous_status != ReportStatus::Resolved {
            let contributors: BTreeSet<DbId> = t
                .raw
                .iter()
                .filter(|r| r.merged_report_id == id)
                .map(|r| r.citizen_id)
                .collect();
            for citizen in t.citizens.iter_mut().filter(|c| contributors.contains(&c.id)) {
                citizen.points += reward_points;
                rewarded.push(RewardedCitizen {
                    citizen_id: citizen.id,
                    push_token: citizen.push_token.clone(),
                });
            }
            rewarded.sort_by_key(|r| r.citizen_id);
        }

        Ok(UpdateOutcome::Updated(StatusTransition {
            report,
            previous_status,
            rewarded,
        }))
    }

    async fn citizen_reports(&self, citizen_id: DbId) -> AppResult<Vec<CitizenReport>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<CitizenReport> = t
            .raw
            .iter()
            .filter(|r| r.citizen_id == citizen_id)
            .filter_map(|r| {
                let merged = t.merged.iter().find(|m| m.id == r.merged_report_id)?;
                Some(CitizenReport {
                    id: r.id,
                    merged_report_id: r.merged_report_id,
                    problem: r.problem.clone(),
                    description: r.description.clone(),
                    image_url: r.image_url.clone(),
                    district: r.district.clone(),
                    ward: r.ward.clone(),
                    status: merged.status,
                    created_at: r.created_at,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn district_reports(&self, district: &str) -> AppResult<Vec<AdminReportView>> {
        let t = self.tables.lock().await;
        let wards = t.ward_locations();
        let mut rows: Vec<AdminReportView> = t
            .merged
            .iter()
            .filter(|m| m.district == district)
            .map(|m| {
                let centroid = wards
                    .iter()
                    .find(|w| w.district_name == m.district && w.ward_no.to_string() == m.ward);
                let latest_image = t
                    .raw
                    .iter()
                    .filter(|r| r.merged_report_id == m.id)
                    .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
                AdminReportView {
                    report: m.clone(),
                    department_name: m.department_id.and_then(|dep| {
                        t.departments.iter().find(|d| d.id == dep).map(|d| d.name.clone())
                    }),
                    latitude: centroid.map(|w| w.latitude),
                    longitude: centroid.map(|w| w.longitude),
                    image_url: latest_image.map(|r| r.image_url.clone()),
                    image_created_at: latest_image.map(|r| r.created_at),
                }
            })
            .collect();
        rows.sort_by(|a, b| {
            b.report
                .updated_at
                .cmp(&a.report.updated_at)
                .then(b.report.id.cmp(&a.report.id))
        });
        Ok(rows)
    }

    async fn escalated_reports(
        &self,
        min_nos: i32,
        created_before: DateTime<Utc>,
    ) -> AppResult<Vec<MergedReport>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<MergedReport> = t
            .merged
            .iter()
            .filter(|m| {
                m.nos > min_nos
                    && m.status != ReportStatus::Resolved
                    && m.created_at < created_before
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn status_counts(&self, district: &str) -> AppResult<StatusCounts> {
        let t = self.tables.lock().await;
        let mut counts = StatusCounts::default();
        for m in t.merged.iter().filter(|m| m.district == district) {
            counts.add(m.status, 1);
        }
        Ok(counts)
    }

    async fn weekly_submissions(
        &self,
        district: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<WeeklyCount>> {
        let t = self.tables.lock().await;
        let mut weeks: Vec<WeeklyCount> = Vec::new();
        for r in t
            .raw
            .iter()
            .filter(|r| r.district == district && r.created_at >= since)
        {
            let start = week_start(r.created_at);
            match weeks.iter_mut().find(|w| w.week_start == start) {
                Some(w) => w.count += 1,
                None => weeks.push(WeeklyCount {
                    week_start: start,
                    count: 1,
                }),
            }
        }
        weeks.sort_by_key(|w| w.week_start);
        Ok(weeks)
    }
}
