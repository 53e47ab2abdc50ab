// src/services/escalation.rs

use chrono::{DateTime, Duration, Months, Utc};

use crate::error::AppResult;
use crate::models::MergedReport;
use crate::store::Store;

/// An aggregate escalates once its submission count exceeds this.
pub const ESCALATION_MIN_SUBMISSIONS: i32 = 100;
/// ...and it has been open at least this long.
pub const ESCALATION_AGE_MONTHS: u32 = 4;

pub fn escalation_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(ESCALATION_AGE_MONTHS))
        .unwrap_or_else(|| now - Duration::days(i64::from(ESCALATION_AGE_MONTHS) * 31))
}

/// Read-only: high-volume, unresolved, old aggregates across every district,
/// oldest first.
pub async fn escalated_reports(store: &dyn Store, now: DateTime<Utc>) -> AppResult<Vec<MergedReport>> {
    let rows = store
        .escalated_reports(ESCALATION_MIN_SUBMISSIONS, escalation_cutoff(now))
        .await?;
    tracing::debug!(count = rows.len(), "escalation query");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn cutoff_is_four_calendar_months_back() {
        let now = Utc.with_ymd_and_hms(2024, 9, 5, 12, 0, 0).unwrap();
        assert_eq!(
            escalation_cutoff(now),
            Utc.with_ymd_and_hms(2024, 5, 5, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn cutoff_clamps_to_month_end() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
        assert_eq!(
            escalation_cutoff(now),
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()
        );
    }

    mod with_store {
        use super::*;
        use crate::models::ReportStatus;
        use crate::store::MemoryStore;

        fn aggregate(nos: i32, status: ReportStatus, created_at: DateTime<Utc>) -> MergedReport {
            MergedReport {
                id: 0,
                problem: "Streetlight out".into(),
                district: "Ranchi".into(),
                ward: "7".into(),
                department_id: None,
                status,
                nos,
                created_at,
                updated_at: created_at,
            }
        }

        #[tokio::test]
        async fn only_old_busy_unresolved_aggregates_escalate() {
            let store = MemoryStore::seeded().await;
            let now = Utc.with_ymd_and_hms(2024, 9, 5, 12, 0, 0).unwrap();
            let five_months_ago = Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap();
            let last_month = Utc.with_ymd_and_hms(2024, 8, 5, 12, 0, 0).unwrap();
            let older = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

            let open = store
                .import_merged_report(aggregate(150, ReportStatus::Submitted, five_months_ago))
                .await;
            store
                .import_merged_report(aggregate(150, ReportStatus::Resolved, five_months_ago))
                .await;
            store
                .import_merged_report(aggregate(150, ReportStatus::InProgress, last_month))
                .await;
            store
                .import_merged_report(aggregate(100, ReportStatus::Submitted, five_months_ago))
                .await;
            let rejected = store
                .import_merged_report(aggregate(101, ReportStatus::Rejected, older))
                .await;

            let ids: Vec<_> = escalated_reports(&store, now)
                .await
                .unwrap()
                .into_iter()
                .map(|r| r.id)
                .collect();
            assert_eq!(ids, vec![rejected.id, open.id]);
        }
    }
}
