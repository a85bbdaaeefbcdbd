//! Periodic job scheduling.
//!
//! The scheduler owns three background tasks: the daily due-covenant
//! sweep, the weekday intraday urgent sweep, and the hourly maintenance
//! sweep that purges expired sessions. Firing times are computed by the
//! pure [`next_fire`] function so the clock arithmetic is testable
//! without spinning up a runtime.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::MonitorConfig;
use crate::engine::driver::{BatchEvaluationDriver, SweepMode};
use crate::store::PortfolioStore;
use crate::NavMonitorResult;

// ---------------------------------------------------------------------------
// Schedules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSchedule {
    /// Every day at the given UTC wall-clock time.
    DailyAt { hour: u32, minute: u32 },
    /// Monday through Friday, on the hour, at each listed UTC hour.
    WeekdaysAt { hours: Vec<u32> },
    /// A fixed period, anchored to the previous fire.
    EveryMinutes(u64),
}

/// A named job and when it runs. Exposed for introspection; the scheduler
/// builds its own specs from config.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub name: &'static str,
    pub schedule: JobSchedule,
}

/// Next firing instant strictly after `now`.
pub fn next_fire(schedule: &JobSchedule, now: DateTime<Utc>) -> DateTime<Utc> {
    match schedule {
        JobSchedule::DailyAt { hour, minute } => {
            let mut date = now.date_naive();
            for _ in 0..2 {
                if let Some(candidate) = at(date, *hour, *minute) {
                    if candidate > now {
                        return candidate;
                    }
                }
                date = date.succ_opt().unwrap_or(date);
            }
            now + Duration::days(1)
        }
        JobSchedule::WeekdaysAt { hours } => {
            let mut sorted = hours.clone();
            sorted.sort_unstable();
            for offset in 0..=7 {
                let date = now.date_naive() + Duration::days(offset);
                if date.weekday().num_days_from_monday() >= 5 {
                    continue;
                }
                for hour in &sorted {
                    if let Some(candidate) = at(date, *hour, 0) {
                        if candidate > now {
                            return candidate;
                        }
                    }
                }
            }
            now + Duration::days(1)
        }
        JobSchedule::EveryMinutes(minutes) => now + Duration::minutes((*minutes).max(1) as i64),
    }
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    date.and_hms_opt(hour, minute, 0)
        .map(|dt| Utc.from_utc_datetime(&dt))
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Spawns and supervises the periodic monitoring jobs. `start` is
/// idempotent while running; `stop` signals every job and waits for the
/// tasks to wind down.
pub struct MonitorScheduler<S: PortfolioStore + 'static> {
    store: Arc<S>,
    driver: Arc<BatchEvaluationDriver<S>>,
    config: MonitorConfig,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl<S: PortfolioStore + 'static> MonitorScheduler<S> {
    pub fn new(store: Arc<S>, config: MonitorConfig) -> Self {
        let driver = Arc::new(BatchEvaluationDriver::new(
            Arc::clone(&store),
            config.clone(),
        ));
        let (shutdown, _) = watch::channel(false);
        MonitorScheduler {
            store,
            driver,
            config,
            shutdown,
            handles: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    /// The jobs this scheduler runs, as configured.
    pub fn jobs(&self) -> Vec<JobSpec> {
        vec![
            JobSpec {
                name: "daily_sweep",
                schedule: JobSchedule::DailyAt {
                    hour: self.config.schedule.daily_sweep_hour,
                    minute: 0,
                },
            },
            JobSpec {
                name: "urgent_sweep",
                schedule: JobSchedule::WeekdaysAt {
                    hours: self.config.schedule.urgent_sweep_hours.clone(),
                },
            },
            JobSpec {
                name: "maintenance",
                schedule: JobSchedule::EveryMinutes(self.config.schedule.maintenance_minutes),
            },
        ]
    }

    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let _ = self.shutdown.send(false);

        let daily = JobSchedule::DailyAt {
            hour: self.config.schedule.daily_sweep_hour,
            minute: 0,
        };
        let driver = Arc::clone(&self.driver);
        self.handles.push(tokio::spawn(run_job(
            "daily_sweep",
            daily,
            self.shutdown.subscribe(),
            move || {
                let driver = Arc::clone(&driver);
                // Scheduled sweeps respect each covenant's check
                // frequency; the check-everything mode stays manual.
                async move { driver.run(Utc::now(), SweepMode::Due).await.map(|_| ()) }
            },
        )));

        let urgent = JobSchedule::WeekdaysAt {
            hours: self.config.schedule.urgent_sweep_hours.clone(),
        };
        let driver = Arc::clone(&self.driver);
        self.handles.push(tokio::spawn(run_job(
            "urgent_sweep",
            urgent,
            self.shutdown.subscribe(),
            move || {
                let driver = Arc::clone(&driver);
                async move { driver.run(Utc::now(), SweepMode::Urgent).await.map(|_| ()) }
            },
        )));

        let maintenance = JobSchedule::EveryMinutes(self.config.schedule.maintenance_minutes);
        let store = Arc::clone(&self.store);
        self.handles.push(tokio::spawn(run_job(
            "maintenance",
            maintenance,
            self.shutdown.subscribe(),
            move || {
                let store = Arc::clone(&store);
                async move {
                    let purged = store.purge_expired_sessions(Utc::now()).await?;
                    if purged > 0 {
                        info!(purged, "purged expired sessions");
                    }
                    Ok(())
                }
            },
        )));

        info!(jobs = self.handles.len(), "monitor scheduler started");
    }

    pub async fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        let _ = self.shutdown.send(true);
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
        info!("monitor scheduler stopped");
    }
}

async fn run_job<F, Fut>(
    name: &'static str,
    schedule: JobSchedule,
    mut shutdown: watch::Receiver<bool>,
    job: F,
) where
    F: Fn() -> Fut,
    Fut: Future<Output = NavMonitorResult<()>>,
{
    loop {
        let now = Utc::now();
        let fire = next_fire(&schedule, now);
        let wait = (fire - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        debug!(job = name, fire = %fire, "job sleeping until next fire");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                // A failing run is logged and the job keeps its cadence.
                if let Err(err) = job().await {
                    error!(job = name, error = %err, "scheduled job failed");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    debug!(job = name, "job stopping");
                    return;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    // -----------------------------------------------------------------------
    // 1. next_fire
    // -----------------------------------------------------------------------

    #[test]
    fn test_daily_fires_later_today_or_tomorrow() {
        let schedule = JobSchedule::DailyAt { hour: 6, minute: 0 };
        // 2025-06-02 is a Monday.
        assert_eq!(
            next_fire(&schedule, utc(2025, 6, 2, 4, 30)),
            utc(2025, 6, 2, 6, 0)
        );
        assert_eq!(
            next_fire(&schedule, utc(2025, 6, 2, 6, 0)),
            utc(2025, 6, 3, 6, 0),
            "exact fire time must roll to the next day"
        );
        assert_eq!(
            next_fire(&schedule, utc(2025, 6, 2, 18, 0)),
            utc(2025, 6, 3, 6, 0)
        );
    }

    #[test]
    fn test_weekdays_skips_weekend() {
        let schedule = JobSchedule::WeekdaysAt {
            hours: vec![9, 12, 15, 18],
        };
        // Friday after the last slot rolls to Monday morning.
        assert_eq!(
            next_fire(&schedule, utc(2025, 6, 6, 18, 30)),
            utc(2025, 6, 9, 9, 0)
        );
        // Saturday anywhere rolls to Monday.
        assert_eq!(
            next_fire(&schedule, utc(2025, 6, 7, 10, 0)),
            utc(2025, 6, 9, 9, 0)
        );
        // Mid-weekday picks the next slot the same day.
        assert_eq!(
            next_fire(&schedule, utc(2025, 6, 4, 13, 15)),
            utc(2025, 6, 4, 15, 0)
        );
    }

    #[test]
    fn test_weekdays_unsorted_hours_still_pick_earliest() {
        let schedule = JobSchedule::WeekdaysAt {
            hours: vec![18, 9, 15, 12],
        };
        assert_eq!(
            next_fire(&schedule, utc(2025, 6, 4, 8, 0)),
            utc(2025, 6, 4, 9, 0)
        );
    }

    #[test]
    fn test_every_minutes_is_period_from_now() {
        let now = utc(2025, 6, 2, 4, 30);
        assert_eq!(
            next_fire(&JobSchedule::EveryMinutes(60), now),
            now + Duration::minutes(60)
        );
        assert_eq!(
            next_fire(&JobSchedule::EveryMinutes(0), now),
            now + Duration::minutes(1),
            "zero period must not busy-loop"
        );
    }

    // -----------------------------------------------------------------------
    // 2. Lifecycle
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let store = Arc::new(crate::store::MemoryStore::new());
        let mut scheduler = MonitorScheduler::new(store, MonitorConfig::default());
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.jobs().len(), 3);

        scheduler.start();
        assert!(scheduler.is_running());
        scheduler.start(); // no double-spawn
        assert_eq!(scheduler.handles.len(), 3);

        scheduler.stop().await;
        assert!(!scheduler.is_running());
        scheduler.stop().await; // idempotent
    }
}
