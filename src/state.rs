// src/state.rs

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::events::ReportEvents;
use crate::notify::PushNotifier;
use crate::rate_limit::SubmissionLimiter;
use crate::store::Store;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
    pub events: ReportEvents,
    pub notifier: PushNotifier,
    pub limiter: SubmissionLimiter,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let limiter = SubmissionLimiter::new(
            config.report_rate_limit,
            Duration::from_secs(config.report_rate_window_secs),
        );
        Self {
            store,
            notifier: PushNotifier::new(config.push_api_url.clone()),
            events: ReportEvents::new(),
            limiter,
            config: Arc::new(config),
        }
    }
}
