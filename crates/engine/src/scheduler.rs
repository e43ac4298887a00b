//! Tick scheduler wrapping `tokio-cron-scheduler`.
//!
//! Schedules are either `@every <duration>` (fixed interval, humantime
//! syntax such as `@every 120s`) or a cron expression. Five-field cron gets
//! a leading `0` seconds field. The scheduler does not prevent overlapping
//! runs; the engine skips a tick that starts while another is in flight.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler};

use hub_notifier::DeliveryClient;

use crate::cache::ResultCache;
use crate::dispatcher::DispatchEngine;
use crate::store::MessageStore;

/// Errors that can occur while building or running the tick schedule.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("scheduler error: {0}")]
    JobError(String),
}

/// When the dispatch tick fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickSchedule {
    Every(Duration),
    Cron(String),
}

impl FromStr for TickSchedule {
    type Err = SchedulerError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();

        if let Some(interval) = trimmed.strip_prefix("@every") {
            let interval = humantime::parse_duration(interval.trim())
                .map_err(|e| SchedulerError::InvalidSchedule(format!("{trimmed}: {e}")))?;
            if interval.is_zero() {
                return Err(SchedulerError::InvalidSchedule(format!(
                    "{trimmed}: interval must be positive"
                )));
            }
            return Ok(TickSchedule::Every(interval));
        }

        match trimmed.split_whitespace().count() {
            5 => Ok(TickSchedule::Cron(format!("0 {trimmed}"))),
            6 | 7 => Ok(TickSchedule::Cron(trimmed.to_string())),
            _ => Err(SchedulerError::InvalidSchedule(format!(
                "{trimmed}: expected `@every <duration>` or a cron expression"
            ))),
        }
    }
}

impl std::fmt::Display for TickSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TickSchedule::Every(interval) => {
                write!(f, "@every {}", humantime::format_duration(*interval))
            }
            TickSchedule::Cron(expr) => write!(f, "{expr}"),
        }
    }
}

/// Running schedule that drives [`DispatchEngine::run_tick`].
pub struct TickScheduler {
    inner: JobScheduler,
}

impl TickScheduler {
    /// Register the tick job and start the scheduler.
    pub async fn start<S, C, D>(
        engine: Arc<DispatchEngine<S, C, D>>,
        schedule: &TickSchedule,
    ) -> Result<Self, SchedulerError>
    where
        S: MessageStore + 'static,
        C: ResultCache + 'static,
        D: DeliveryClient + 'static,
    {
        let inner = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::JobError(e.to_string()))?;

        let job = match schedule {
            TickSchedule::Every(interval) => Job::new_repeated_async(*interval, move |_id, _lock| {
                let engine = Arc::clone(&engine);
                Box::pin(async move { run_scheduled_tick(&engine).await })
            }),
            TickSchedule::Cron(expr) => Job::new_async(expr.as_str(), move |_id, _lock| {
                let engine = Arc::clone(&engine);
                Box::pin(async move { run_scheduled_tick(&engine).await })
            }),
        }
        .map_err(|e| SchedulerError::InvalidSchedule(e.to_string()))?;

        inner
            .add(job)
            .await
            .map_err(|e| SchedulerError::JobError(e.to_string()))?;
        inner
            .start()
            .await
            .map_err(|e| SchedulerError::JobError(e.to_string()))?;

        tracing::info!(%schedule, "Dispatch scheduler started");
        Ok(Self { inner })
    }

    /// Stop firing ticks.
    ///
    /// A tick already in flight is not cancelled and not waited for; follow
    /// with [`DispatchEngine::wait_idle`] before the runtime goes away.
    pub async fn shutdown(mut self) -> Result<(), SchedulerError> {
        self.inner
            .shutdown()
            .await
            .map_err(|e| SchedulerError::JobError(e.to_string()))?;

        tracing::info!("Dispatch scheduler stopped");
        Ok(())
    }
}

async fn run_scheduled_tick<S, C, D>(engine: &DispatchEngine<S, C, D>)
where
    S: MessageStore + 'static,
    C: ResultCache + 'static,
    D: DeliveryClient + 'static,
{
    if let Err(e) = engine.run_tick().await {
        tracing::error!(action = "CronSendMessage", error = %e, "Dispatch tick failed");
    }
}
