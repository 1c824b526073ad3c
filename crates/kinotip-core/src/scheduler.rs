//! Wall-clock refresh schedule for the collector.
//!
//! The snapshot is refreshed at fixed local hours. Boundaries missed while the
//! process was down are not caught up: the next run is always computed from
//! the current time.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Days, Local, TimeZone};
use tokio::{task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;

use crate::{collector::Collector, Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshSchedule {
    hours: Vec<u32>,
}

impl RefreshSchedule {
    pub fn new(hours: &[u32]) -> Result<Self> {
        let mut hours = hours.to_vec();
        if hours.is_empty() {
            return Err(Error::Config("refresh schedule needs at least one hour".to_string()));
        }
        if let Some(bad) = hours.iter().find(|h| **h > 23) {
            return Err(Error::Config(format!("invalid refresh hour: {bad}")));
        }
        hours.sort_unstable();
        hours.dedup();
        Ok(Self { hours })
    }

    pub fn hours(&self) -> &[u32] {
        &self.hours
    }

    /// First scheduled instant strictly after `now`.
    ///
    /// Local times skipped by a DST jump are ignored; ambiguous ones resolve to
    /// the earlier instant.
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = now.timezone();
        let today = now.date_naive();

        (0..=2u64)
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .flat_map(|day| self.hours.iter().filter_map(move |h| day.and_hms_opt(*h, 0, 0)))
            .filter_map(|naive| tz.from_local_datetime(&naive).earliest())
            .filter(|candidate| candidate > now)
            .min()
    }
}

impl Default for RefreshSchedule {
    fn default() -> Self {
        Self { hours: vec![0, 12] }
    }
}

/// Run the collector refresh at every scheduled instant until cancelled.
pub fn spawn_refresh_loop(
    collector: Arc<Collector>,
    schedule: RefreshSchedule,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Local::now();
            let Some(next) = schedule.next_after(&now) else {
                tracing::error!("refresh schedule has no next run, stopping");
                break;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            tracing::info!(
                next = %next.to_rfc3339(),
                in_secs = wait.as_secs(),
                "next scheduled cache refresh"
            );

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(wait) => {
                    let reason = format!("scheduled {}", next.to_rfc3339());
                    collector.refresh(&reason).await;
                }
            }
        }
        tracing::info!("refresh loop stopped");
    })
}
