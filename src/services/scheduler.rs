use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler};

use crate::services::broadcast::{BroadcastError, BroadcastOutcome, BroadcastService, TriggeredBy};

/// Re-sends one configured message to every target on a fixed interval.
///
/// The first tick fires one interval after `start`. Ticks missed while the
/// process was down are not made up.
pub struct BroadcastScheduler {
    service: Arc<BroadcastService>,
    message_id: i64,
    interval: Duration,
    scheduler: JobScheduler,
}

impl BroadcastScheduler {
    pub async fn new(
        service: Arc<BroadcastService>,
        message_id: i64,
        interval: Duration,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            service,
            message_id,
            interval,
            scheduler,
        })
    }

    pub async fn start(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let service = self.service.clone();
        let message_id = self.message_id;

        let broadcast_job = Job::new_repeated_async(self.interval, move |_uuid, _l| {
            let service = service.clone();
            Box::pin(async move {
                if let Err(e) = run_scheduled_broadcast(&service, message_id).await {
                    tracing::error!("Scheduled broadcast of message {} failed: {}", message_id, e);
                }
            })
        })?;

        self.scheduler.add(broadcast_job).await?;
        self.scheduler.start().await?;

        tracing::info!(
            "Broadcast scheduler started - message {} every {} minutes",
            self.message_id,
            self.interval.as_secs() / 60
        );
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.scheduler.shutdown().await?;
        Ok(())
    }

    /// Runs one tick immediately, outside the timer.
    pub async fn run_tick(&self) -> Result<BroadcastOutcome, BroadcastError> {
        run_scheduled_broadcast(&self.service, self.message_id).await
    }
}

async fn run_scheduled_broadcast(
    service: &BroadcastService,
    message_id: i64,
) -> Result<BroadcastOutcome, BroadcastError> {
    let outcome = service
        .broadcast_message(message_id, &TriggeredBy::Scheduled)
        .await?;

    tracing::info!(
        "Scheduled broadcast of message {} finished: {}/{} delivered",
        message_id,
        outcome.succeeded,
        outcome.total
    );
    Ok(outcome)
}
