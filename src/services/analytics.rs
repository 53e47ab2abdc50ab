// src/services/analytics.rs

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::{DbId, StatusCounts, WeeklyCount};
use crate::store::Store;

/// Weeks shown in the frequency chart, current week included.
pub const FREQUENCY_WEEKS: i64 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequencyData {
    pub labels: Vec<String>,
    pub data: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictAnalytics {
    pub district: String,
    pub status_data: StatusCounts,
    pub frequency_data: FrequencyData,
}

/// Monday of the (UTC) week containing `ts`.
pub fn week_start(ts: DateTime<Utc>) -> NaiveDate {
    let date = ts.date_naive();
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Start of the oldest week in the chart window.
pub fn window_start(now: DateTime<Utc>, weeks: i64) -> DateTime<Utc> {
    let first = week_start(now) - Duration::weeks(weeks.max(1) - 1);
    Utc.from_utc_datetime(&first.and_time(NaiveTime::default()))
}

/// Oldest-first, zero-filled series of `weeks` buckets ending at the week of `now`.
pub fn frequency_series(now: DateTime<Utc>, weeks: i64, rows: &[WeeklyCount]) -> FrequencyData {
    let current = week_start(now);
    let mut labels = Vec::new();
    let mut data = Vec::new();
    for back in (0..weeks.max(1)).rev() {
        let start = current - Duration::weeks(back);
        labels.push(start.format("%Y-%m-%d").to_string());
        data.push(
            rows.iter()
                .find(|r| r.week_start == start)
                .map_or(0, |r| r.count),
        );
    }
    FrequencyData { labels, data }
}

pub async fn district_analytics(
    store: &dyn Store,
    district_id: DbId,
    now: DateTime<Utc>,
) -> AppResult<DistrictAnalytics> {
    let district = store
        .district_by_id(district_id)
        .await?
        .ok_or_else(|| AppError::not_found("District not found"))?;

    let status_data = store.status_counts(&district.name).await?;
    let rows = store
        .weekly_submissions(&district.name, window_start(now, FREQUENCY_WEEKS))
        .await?;

    Ok(DistrictAnalytics {
        frequency_data: frequency_series(now, FREQUENCY_WEEKS, &rows),
        district: district.name,
        status_data,
    })
}
