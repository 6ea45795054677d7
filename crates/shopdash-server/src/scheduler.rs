//! Background sync scheduler.
//!
//! Registers the recurring catalog reconciliation at server startup. Each
//! tick goes through the engine's single-flight trigger, so a tick that
//! fires while a pass is still running observes the in-flight job and
//! skips - overlap prevention is the engine's guarantee, not the cron's.

use chrono::{DateTime, Utc};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

use shopdash_sync::{SyncService, TriggerOutcome};

/// Handle to the running scheduler plus the recurring job's id, kept in app
/// state so the status endpoint can report the next tick. Dropping the last
/// clone shuts down all jobs - the server holds one for its lifetime.
#[derive(Clone)]
pub struct SchedulerHandle {
    scheduler: JobScheduler,
    sync_job_id: Uuid,
}

impl SchedulerHandle {
    /// Next scheduled tick of the recurring sync, if the scheduler knows one.
    pub async fn next_run(&self) -> Option<DateTime<Utc>> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .next_tick_for_job(self.sync_job_id)
            .await
            .ok()
            .flatten()
    }
}

/// Builds and starts the background scheduler with the recurring sync job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    sync: SyncService,
    cron_expr: &str,
) -> Result<SchedulerHandle, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(cron_expr, move |_uuid, _lock| {
        let sync = sync.clone();
        Box::pin(async move {
            run_scheduled_sync(&sync).await;
        })
    })?;

    let sync_job_id = job.guid();
    scheduler.add(job).await?;
    scheduler.start().await?;

    tracing::info!(cron = cron_expr, "recurring catalog sync registered");
    Ok(SchedulerHandle {
        scheduler,
        sync_job_id,
    })
}

/// One scheduler tick: trigger the engine and log what happened.
async fn run_scheduled_sync(sync: &SyncService) {
    match sync.trigger("scheduler").await {
        Ok(TriggerOutcome::Started(job)) => {
            tracing::info!(job_id = %job.public_id, "scheduler: sync started");
        }
        Ok(TriggerOutcome::AlreadyRunning(job)) => {
            tracing::info!(
                job_id = %job.public_id,
                "scheduler: sync already in flight, skipping tick"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to trigger sync");
        }
    }
}
