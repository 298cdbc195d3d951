// src/pipeline/schedule.rs

//! Recurring runs for the `schedule` command.

use std::time::Duration;

use chrono::{DateTime, Days, Local, NaiveTime, TimeZone};

use crate::error::{AppError, Result};
use crate::models::{ScheduleMode, SchedulerConfig};
use crate::utils::log;

use super::orchestrator::Pipeline;

/// When runs are triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fixed period, first run one period after start
    Interval(Duration),
    /// Once a day at a wall-clock time
    Daily(NaiveTime),
}

impl Schedule {
    pub fn from_config(config: &SchedulerConfig) -> Result<Self> {
        match config.mode {
            ScheduleMode::Interval => {
                let secs = config.interval_hours * 3600 + config.interval_minutes * 60;
                if secs == 0 {
                    return Err(AppError::validation(
                        "scheduler interval must be longer than zero",
                    ));
                }
                Ok(Schedule::Interval(Duration::from_secs(secs)))
            }
            ScheduleMode::Daily => NaiveTime::from_hms_opt(config.hour, config.minute, config.second)
                .map(Schedule::Daily)
                .ok_or_else(|| {
                    AppError::validation(format!(
                        "invalid daily time {:02}:{:02}:{:02}",
                        config.hour, config.minute, config.second
                    ))
                }),
        }
    }

    /// Time to wait from `now` until the next trigger.
    pub fn next_delay<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Duration {
        match self {
            Schedule::Interval(period) => *period,
            Schedule::Daily(time) => (next_daily(now, *time) - now.clone())
                .to_std()
                .unwrap_or(Duration::ZERO),
        }
    }
}

/// First occurrence of `time` strictly after `now`. Days where the time
/// falls into a DST gap are skipped.
fn next_daily<Tz: TimeZone>(now: &DateTime<Tz>, time: NaiveTime) -> DateTime<Tz> {
    let today = now.date_naive();
    for offset in 0..=2 {
        let candidate = today
            .checked_add_days(Days::new(offset))
            .and_then(|date| date.and_time(time).and_local_timezone(now.timezone()).earliest());
        if let Some(candidate) = candidate.filter(|c| c > now) {
            return candidate;
        }
    }
    now.clone() + chrono::Duration::days(1)
}

/// Run the pipeline on `schedule` until Ctrl-C.
///
/// Each run is awaited before the next trigger is computed, so runs never
/// overlap. A failed run is logged and the loop carries on.
pub async fn run_scheduled(pipeline: &Pipeline<'_>, schedule: Schedule) -> Result<()> {
    log::info(&format!("Scheduler started: {schedule:?}"));

    loop {
        let delay = schedule.next_delay(&Local::now());
        let next_at = Local::now() + chrono::Duration::from_std(delay).unwrap_or_default();
        log::info(&format!("Next run at {}", next_at.format("%Y-%m-%d %H:%M:%S")));

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = tokio::signal::ctrl_c() => {
                log::info("Interrupted, stopping scheduler");
                return Ok(());
            }
        }

        match pipeline.run().await {
            Ok(Some(digest)) => log::success(&format!("Sent '{}'", digest.title)),
            Ok(None) => log::info("Nothing to send this run"),
            Err(e) => log::error(&format!("Scheduled run failed: {e}")),
        }
    }
}
