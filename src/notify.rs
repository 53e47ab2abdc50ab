// src/notify.rs

// Best effort: sends run on a spawned task after commit and failures are
// only logged.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;

use crate::models::{MergedReport, RewardedCitizen};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

#[derive(Clone)]
pub struct PushNotifier {
    client: reqwest::Client,
    endpoint: Option<Arc<str>>,
}

impl PushNotifier {
    pub fn new(endpoint: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            endpoint: endpoint.map(Arc::from),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// One message per rewarded citizen that registered a device.
    pub fn resolution_messages(
        report: &MergedReport,
        rewarded: &[RewardedCitizen],
        points: i32,
    ) -> Vec<PushMessage> {
        rewarded
            .iter()
            .filter_map(|c| {
                let to = c.push_token.clone()?;
                Some(PushMessage {
                    to,
                    title: "Issue resolved".into(),
                    body: format!(
                        "Your {} report in {}, Ward {} has been resolved. You earned {} points!",
                        report.problem, report.district, report.ward, points
                    ),
                    data: json!({
                        "merged_report_id": report.id,
                        "citizen_id": c.citizen_id,
                        "points": points,
                    }),
                })
            })
            .collect()
    }

    pub fn report_resolved(&self, report: &MergedReport, rewarded: &[RewardedCitizen], points: i32) {
        let Some(endpoint) = self.endpoint.clone() else {
            tracing::debug!(merged_report_id = report.id, "push notifications disabled");
            return;
        };
        let messages = Self::resolution_messages(report, rewarded, points);
        if messages.is_empty() {
            return;
        }

        let client = self.client.clone();
        let report_id = report.id;
        tokio::spawn(async move {
            let sent = messages.len();
            let result = client
                .post(endpoint.as_ref())
                .json(&messages)
                .send()
                .await
                .and_then(|r| r.error_for_status());
            match result {
                Ok(_) => tracing::info!(merged_report_id = report_id, sent, "push notifications sent"),
                Err(e) => {
                    tracing::warn!(merged_report_id = report_id, error = %e, "push notification failed")
                }
            }
        });
    }
}
