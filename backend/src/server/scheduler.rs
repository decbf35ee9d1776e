//! Daily reset scheduling.
//!
//! A plain tokio loop that sleeps until the configured UTC hour and runs the
//! sweep. The job itself is re-entrant, so a manual trigger racing the
//! scheduled fire is harmless.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::info;

use crate::domain::ports::{PackageRepository, UserRepository};
use crate::domain::{DailyResetJob, ResetTrigger};

/// The next instant at or after `now` with the given UTC hour.
pub fn next_fire(now: DateTime<Utc>, reset_hour: u32) -> DateTime<Utc> {
    match now
        .date_naive()
        .and_hms_opt(reset_hour, 0, 0)
        .map(|at| at.and_utc())
    {
        Some(at) if at > now => at,
        Some(at) => at + TimeDelta::days(1),
        // Unreachable for a validated hour; still fire daily rather than never.
        None => now + TimeDelta::days(1),
    }
}

/// Run the sweep once per day at `reset_hour` until the task is aborted.
pub fn spawn_daily_reset<P, U>(
    job: Arc<DailyResetJob<P, U>>,
    reset_hour: u32,
) -> tokio::task::JoinHandle<()>
where
    P: PackageRepository + 'static,
    U: UserRepository + 'static,
{
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let at = next_fire(now, reset_hour);
            info!(fire_at = %at, "daily reset scheduled");
            let wait = (at - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            job.run(ResetTrigger::Scheduled).await;
        }
    })
}
