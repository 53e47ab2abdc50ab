// src/events.rs

//! Live report updates for district dashboards.
//!
//! One `tokio::sync::broadcast` channel carries every [`ReportEvent`];
//! subscribers filter down to their own district. Publishing never blocks
//! and is a no-op when nobody is listening.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::{DbId, MergedReport};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportEvent {
    /// First submission for an open key.
    Created {
        merged_report_id: DbId,
        problem: String,
        district: String,
        ward: String,
        nos: i32,
    },
    /// Another submission counted against an open aggregate.
    Merged {
        merged_report_id: DbId,
        problem: String,
        district: String,
        ward: String,
        nos: i32,
    },
    /// Admin status/department change.
    Updated { report: MergedReport },
}

impl ReportEvent {
    pub fn district(&self) -> &str {
        match self {
            ReportEvent::Created { district, .. } | ReportEvent::Merged { district, .. } => district,
            ReportEvent::Updated { report } => &report.district,
        }
    }
}

#[derive(Clone)]
pub struct ReportEvents {
    sender: broadcast::Sender<ReportEvent>,
}

impl Default for ReportEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: ReportEvent) {
        // Err only means there are no subscribers right now.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self, district: impl Into<String>) -> DistrictSubscription {
        DistrictSubscription {
            district: district.into(),
            receiver: self.sender.subscribe(),
        }
    }
}

pub struct DistrictSubscription {
    district: String,
    receiver: broadcast::Receiver<ReportEvent>,
}

impl DistrictSubscription {
    /// Next event for this district; `None` once the hub is gone.
    /// A lagging subscriber skips what it missed rather than disconnecting.
    pub async fn recv(&mut self) -> Option<ReportEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.district() == self.district => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(district = %self.district, skipped, "live subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
