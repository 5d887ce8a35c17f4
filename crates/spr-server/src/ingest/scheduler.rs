//! Daily schedule for the incremental update.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use spr_store::LookupStore;
use tracing::{error, info};

use crate::config::{parse_daily_time, CrossrefFeedConfig, SearchConfig};
use crate::ingest::loader::{IncrementalLoader, RunKind};

/// Run the daily incremental update at the configured wall-clock time (UTC),
/// forever.
///
/// Runs are awaited in place, so they never overlap; a run that spills past
/// its next slot simply delays it. Failures are logged and the schedule
/// carries on.
pub async fn run_daily(feed: CrossrefFeedConfig, search: SearchConfig, store: LookupStore) {
    let (hour, minute) = match parse_daily_time(&feed.daily_update_time) {
        Ok(time) => time,
        Err(e) => {
            error!(
                value = %feed.daily_update_time,
                error = %e,
                "invalid daily update time, scheduler disabled"
            );
            return;
        }
    };

    loop {
        let wait = until_next(hour, minute, Utc::now());
        info!(in_secs = wait.as_secs(), "next incremental update scheduled");
        tokio::time::sleep(wait).await;

        let loader = match IncrementalLoader::new(&feed, &search, store.clone()) {
            Ok(loader) => loader,
            Err(e) => {
                error!(error = %e, "could not build the incremental loader");
                continue;
            }
        };
        match loader.run(RunKind::Daily).await {
            Ok(summary) => info!(
                pages = summary.pages,
                stored = summary.stored,
                indexed = summary.indexed,
                "daily update done"
            ),
            Err(e) => error!(error = %e, "daily update failed"),
        }
    }
}

/// Wall-clock wait until the next occurrence of `hour:minute` UTC.
fn until_next(hour: u32, minute: u32, now: DateTime<Utc>) -> std::time::Duration {
    let Some(today) = now.date_naive().and_hms_opt(hour, minute, 0) else {
        return std::time::Duration::from_secs(24 * 60 * 60);
    };
    let today = today.and_utc();
    let next = if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    };
    (next - now).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_until_next_later_today() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let wait = until_next(12, 30, now);
        assert_eq!(wait.as_secs(), 2 * 3600 + 30 * 60);
    }

    #[test]
    fn test_until_next_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap();
        let wait = until_next(12, 30, now);
        assert_eq!(wait.as_secs(), 23 * 3600 + 30 * 60);
    }

    #[test]
    fn test_until_next_midnight_schedule() {
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 0).unwrap();
        let wait = until_next(0, 0, now);
        assert_eq!(wait.as_secs(), 60);
    }
}
