// src/services/status.rs

use crate::error::{AppError, AppResult};
use crate::events::{ReportEvent, ReportEvents};
use crate::models::{DbId, MergedReport, StatusChange};
use crate::notify::PushNotifier;
use crate::store::{Store, UpdateOutcome};

/// Outbound collaborators triggered by an update.
pub struct UpdateEffects<'a> {
    pub events: &'a ReportEvents,
    pub notifier: &'a PushNotifier,
    pub reward_points: i32,
}

/// Any status may move to any other. The only guards are district
/// ownership and the open-key uniqueness the store enforces on reopen.
pub async fn update_report(
    store: &dyn Store,
    effects: UpdateEffects<'_>,
    admin_id: DbId,
    admin_district: &str,
    report_id: DbId,
    change: StatusChange,
) -> AppResult<MergedReport> {
    let outcome = store
        .update_merged_report(report_id, admin_district, change, effects.reward_points)
        .await?;

    let transition = match outcome {
        UpdateOutcome::Updated(t) => t,
        UpdateOutcome::NotFound => return Err(AppError::not_found("Report not found")),
        UpdateOutcome::UnknownDepartment => return Err(AppError::validation("Unknown department")),
        UpdateOutcome::WrongDistrict => {
            tracing::warn!(admin_id, report_id, "cross-district update rejected");
            return Err(AppError::Forbidden);
        }
    };

    tracing::info!(
        admin_id,
        merged_report_id = report_id,
        from = %transition.previous_status,
        to = %transition.report.status,
        rewarded = transition.rewarded.len(),
        "report updated"
    );

    if !transition.rewarded.is_empty() {
        effects
            .notifier
            .report_resolved(&transition.report, &transition.rewarded, effects.reward_points);
    }
    effects.events.publish(ReportEvent::Updated {
        report: transition.report.clone(),
    });

    Ok(transition.report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportStatus;
    use crate::services::intake::{submit_report, IntakeRequest};
    use crate::store::MemoryStore;

    const POINTS: i32 = 10;

    fn pothole() -> IntakeRequest {
        IntakeRequest {
            problem: "Pothole".into(),
            description: None,
            image_url: None,
            latitude: 23.3569,
            longitude: 85.3340,
            department: "Engineering / Roads Department".into(),
        }
    }

    async fn citizen(store: &MemoryStore, phone: &str) -> DbId {
        store
            .create_citizen(crate::models::NewCitizen {
                name: "Asha".into(),
                phone: phone.into(),
                password_hash: "x".into(),
            })
            .await
            .unwrap()
            .id
    }

    fn change(status: ReportStatus) -> StatusChange {
        StatusChange {
            status,
            department_id: None,
        }
    }

    async fn update(
        store: &MemoryStore,
        district: &str,
        id: DbId,
        status: ReportStatus,
    ) -> AppResult<MergedReport> {
        let events = ReportEvents::new();
        let notifier = PushNotifier::disabled();
        let effects = UpdateEffects {
            events: &events,
            notifier: &notifier,
            reward_points: POINTS,
        };
        update_report(store, effects, 1, district, id, change(status)).await
    }

    #[tokio::test]
    async fn resolving_frees_the_key_for_a_new_aggregate() {
        let store = MemoryStore::seeded().await;
        let events = ReportEvents::new();
        let first = submit_report(&store, &events, 1, pothole(), "p").await.unwrap();
        submit_report(&store, &events, 2, pothole(), "p").await.unwrap();

        let report = update(&store, "Ranchi", first.merged_report_id, ReportStatus::Resolved)
            .await
            .unwrap();
        assert_eq!(report.status, ReportStatus::Resolved);
        assert_eq!(report.nos, 2);

        let third = submit_report(&store, &events, 3, pothole(), "p").await.unwrap();
        assert!(third.created);
        assert_ne!(third.merged_report_id, first.merged_report_id);
        assert_eq!(third.nos, 1);
    }

    #[tokio::test]
    async fn other_district_admin_cannot_touch_report() {
        let store = MemoryStore::seeded().await;
        let out = submit_report(&store, &ReportEvents::new(), 1, pothole(), "p")
            .await
            .unwrap();

        let err = update(&store, "Dhanbad", out.merged_report_id, ReportStatus::Resolved)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let report = store.merged_report(out.merged_report_id).await.unwrap().unwrap();
        assert_eq!(report.status, ReportStatus::Submitted);
    }

    #[tokio::test]
    async fn missing_report_is_not_found() {
        let store = MemoryStore::seeded().await;
        let err = update(&store, "Ranchi", 9999, ReportStatus::InProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn points_awarded_once_per_distinct_citizen() {
        let store = MemoryStore::seeded().await;
        let events = ReportEvents::new();
        let asha = citizen(&store, "9000000001").await;
        let ravi = citizen(&store, "9000000002").await;
        let out = submit_report(&store, &events, asha, pothole(), "p").await.unwrap();
        submit_report(&store, &events, asha, pothole(), "p").await.unwrap();
        submit_report(&store, &events, ravi, pothole(), "p").await.unwrap();

        update(&store, "Ranchi", out.merged_report_id, ReportStatus::Resolved)
            .await
            .unwrap();
        // Resolving again is not a transition into resolved.
        update(&store, "Ranchi", out.merged_report_id, ReportStatus::Resolved)
            .await
            .unwrap();

        assert_eq!(store.citizen(asha).await.unwrap().points, POINTS);
        assert_eq!(store.citizen(ravi).await.unwrap().points, POINTS);
    }

    #[tokio::test]
    async fn reopening_into_an_occupied_key_conflicts() {
        let store = MemoryStore::seeded().await;
        let events = ReportEvents::new();
        let old = submit_report(&store, &events, 1, pothole(), "p").await.unwrap();
        update(&store, "Ranchi", old.merged_report_id, ReportStatus::Rejected)
            .await
            .unwrap();
        submit_report(&store, &events, 2, pothole(), "p").await.unwrap();

        let err = update(&store, "Ranchi", old.merged_report_id, ReportStatus::InProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn unknown_department_is_rejected() {
        let store = MemoryStore::seeded().await;
        let out = submit_report(&store, &ReportEvents::new(), 1, pothole(), "p")
            .await
            .unwrap();
        let events = ReportEvents::new();
        let notifier = PushNotifier::disabled();
        let effects = UpdateEffects {
            events: &events,
            notifier: &notifier,
            reward_points: POINTS,
        };
        let err = update_report(
            &store,
            effects,
            1,
            "Ranchi",
            out.merged_report_id,
            StatusChange {
                status: ReportStatus::InProgress,
                department_id: Some(424242),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
