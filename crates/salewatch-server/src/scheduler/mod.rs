//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring catalog refresh.

use std::sync::Arc;

use salewatch_pipeline::{DatasetSwap, RefreshOutcome};
use salewatch_scraper::HttpFetcher;
use salewatch_store::FsBlobStore;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

pub type LiveSwap = DatasetSwap<HttpFetcher, FsBlobStore>;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// `cron` is not a valid schedule, or the scheduler fails to start.
pub async fn build_scheduler(
    swap: Arc<LiveSwap>,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_refresh_job(&scheduler, swap, cron).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the periodic catalog refresh.
///
/// A failed cycle is logged and the previous dataset keeps being served;
/// the next tick is the only retry.
async fn register_refresh_job(
    scheduler: &JobScheduler,
    swap: Arc<LiveSwap>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let swap = Arc::clone(&swap);

        Box::pin(async move {
            tracing::info!("scheduler: starting catalog refresh");
            run_refresh_job(&swap).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered catalog refresh job");
    Ok(())
}

async fn run_refresh_job(swap: &LiveSwap) {
    match swap.refresh().await {
        Ok(RefreshOutcome::Published(dataset)) => tracing::info!(
            cycle = dataset.cycle,
            unlisted_sales = dataset.unlisted_sales.len(),
            "scheduler: catalog refresh complete"
        ),
        Ok(RefreshOutcome::Superseded { cycle, live_cycle }) => tracing::info!(
            cycle,
            live_cycle,
            "scheduler: catalog refresh superseded"
        ),
        Err(e) => tracing::warn!(
            error = %e,
            "scheduler: catalog refresh failed, keeping previous dataset"
        ),
    }
}
