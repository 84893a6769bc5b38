// src/pipeline/scheduler.rs

//! Periodic driver for pipeline runs.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use tokio::time::{MissedTickBehavior, interval, sleep};

use crate::error::Result;
use crate::models::ScheduleConfig;
use crate::pipeline::crawl::{CrawlPipeline, RunStats};

/// The runs a [`Scheduler`] can trigger.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    async fn run_detailed(&self) -> Result<RunStats>;
    async fn run_summary(&self) -> Result<RunStats>;
}

#[async_trait]
impl ScheduledJob for CrawlPipeline {
    async fn run_detailed(&self) -> Result<RunStats> {
        self.run().await
    }

    async fn run_summary(&self) -> Result<RunStats> {
        CrawlPipeline::run_summary(self).await
    }
}

/// What a tick should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    Skip,
    Detailed,
    Summary,
}

/// Decide the action for a tick at local time `now`.
///
/// Ticks inside the quiet window are skipped. The first other tick at or
/// after `summary_hour` on a day whose summary has not run yet runs it.
/// After a failed summary one detailed crawl runs before the next attempt.
pub fn tick_action(
    schedule: &ScheduleConfig,
    now: NaiveDateTime,
    last_summary: Option<NaiveDate>,
    summary_failed: bool,
) -> TickAction {
    let hour = now.hour();
    if schedule.quiet_hours.contains(hour) {
        return TickAction::Skip;
    }
    if hour >= schedule.summary_hour && last_summary != Some(now.date()) && !summary_failed {
        return TickAction::Summary;
    }
    TickAction::Detailed
}

/// Drives a [`ScheduledJob`] on a fixed interval.
///
/// Runs are awaited inside the loop, so they never overlap; a run longer
/// than the interval delays the next tick.
pub struct Scheduler {
    schedule: ScheduleConfig,
    last_summary: Option<NaiveDate>,
    /// The previous non-quiet tick was a failed summary
    summary_failed: bool,
}

impl Scheduler {
    pub fn new(schedule: ScheduleConfig) -> Self {
        Self {
            schedule,
            last_summary: None,
            summary_failed: false,
        }
    }

    /// Run until Ctrl-C, or return at once when scheduling is disabled.
    pub async fn run(&mut self, job: &dyn ScheduledJob) {
        if !self.schedule.enabled {
            log::warn!("Scheduling is disabled, not starting");
            return;
        }

        tokio::select! {
            _ = self.run_forever(job) => {}
            _ = tokio::signal::ctrl_c() => log::info!("Interrupted, stopping scheduler"),
        }
    }

    async fn run_forever(&mut self, job: &dyn ScheduledJob) {
        let startup = Duration::from_secs(self.schedule.startup_delay_secs);
        log::info!(
            "Scheduler starting in {}s, running every {} minutes",
            startup.as_secs(),
            self.schedule.interval_minutes
        );
        sleep(startup).await;

        let mut ticker = interval(Duration::from_secs(self.schedule.interval_minutes * 60));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.tick(job, Local::now().naive_local()).await;
        }
    }

    /// Perform one tick at local time `now`.
    ///
    /// Failures are logged; the summary is marked done only when it succeeds,
    /// and a failed one is retried after the next detailed crawl.
    pub async fn tick(&mut self, job: &dyn ScheduledJob, now: NaiveDateTime) -> TickAction {
        let action = tick_action(&self.schedule, now, self.last_summary, self.summary_failed);
        match action {
            TickAction::Skip => log::debug!("Quiet hours, skipping tick at {now}"),
            TickAction::Detailed => {
                self.summary_failed = false;
                if let Err(e) = job.run_detailed().await {
                    log::error!("Crawl run failed: {e}");
                }
            }
            TickAction::Summary => match job.run_summary().await {
                Ok(_) => {
                    self.last_summary = Some(now.date());
                    self.summary_failed = false;
                }
                Err(e) => {
                    log::error!("Summary run failed, retrying after the next crawl: {e}");
                    self.summary_failed = true;
                }
            },
        }
        action
    }
}
