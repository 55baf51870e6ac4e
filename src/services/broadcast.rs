//! Broadcast dispatch and bookkeeping.
//!
//! A run sends one message to every target, one at a time with a fixed pause
//! between sends, then appends a single summary row to the ledger. Failed
//! deliveries are counted and logged; they never abort the run and are never
//! retried within it.
//!
//! Manual commands and the scheduler share one [`BroadcastService`]. Runs are
//! serialized by a process-wide lock, so a scheduled tick that fires during a
//! manual run waits for it instead of interleaving sends.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::database::connection::DatabaseManager;
use crate::database::models::{BroadcastRecord, MessageTemplate, Target};
use crate::services::transport::{BroadcastContent, ContentError, DeliveryFailure, MessageTransport};
use crate::utils::logging::{log_broadcast_done, log_broadcast_start, log_delivery_failure};

/// Who started a run. Stored in the ledger's `executed_by` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggeredBy {
    Admin(String),
    Scheduled,
}

impl TriggeredBy {
    pub const SCHEDULED: &'static str = "scheduled";

    pub fn actor(&self) -> &str {
        match self {
            TriggeredBy::Admin(actor) => actor.as_str(),
            TriggeredBy::Scheduled => Self::SCHEDULED,
        }
    }
}

impl fmt::Display for TriggeredBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.actor())
    }
}

/// A target that could not be reached during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFailure {
    pub chat_id: i64,
    pub name: String,
    pub reason: DeliveryFailure,
}

#[derive(Debug, Clone)]
pub struct BroadcastOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<TargetFailure>,
    /// Ledger row written for this run.
    pub record_id: i64,
}

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("message {0} not found")]
    MessageNotFound(i64),

    #[error("message {message_id} cannot be sent: {source}")]
    InvalidMessage {
        message_id: i64,
        #[source]
        source: ContentError,
    },

    #[error("preview could not be delivered: {0}")]
    PreviewFailed(#[source] DeliveryFailure),

    /// Registry read or ledger write failed. Deliveries made before the
    /// failure are not undone.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

pub struct BroadcastService {
    db: Arc<DatabaseManager>,
    transport: Arc<dyn MessageTransport>,
    send_delay: Duration,
    run_lock: Mutex<()>,
}

impl BroadcastService {
    pub fn new(
        db: Arc<DatabaseManager>,
        transport: Arc<dyn MessageTransport>,
        send_delay: Duration,
    ) -> Self {
        Self {
            db,
            transport,
            send_delay,
            run_lock: Mutex::new(()),
        }
    }

    pub fn db(&self) -> &DatabaseManager {
        &self.db
    }

    /// Sends `message` to every target in order and records the run.
    ///
    /// An empty target list is not an error: the run completes with all
    /// counts at zero and still gets a ledger row.
    pub async fn run_broadcast(
        &self,
        message: &MessageTemplate,
        targets: &[Target],
        triggered_by: &TriggeredBy,
    ) -> Result<BroadcastOutcome, BroadcastError> {
        let content = BroadcastContent::from_template(message).map_err(|source| {
            BroadcastError::InvalidMessage {
                message_id: message.id,
                source,
            }
        })?;

        let _run = self.run_lock.lock().await;
        log_broadcast_start(message.id, targets.len(), triggered_by.actor());

        let mut succeeded = 0usize;
        let mut failures = Vec::new();

        for (index, target) in targets.iter().enumerate() {
            if index > 0 && !self.send_delay.is_zero() {
                tokio::time::sleep(self.send_delay).await;
            }

            match self.transport.send(target.chat_id, &content).await {
                Ok(()) => succeeded += 1,
                Err(reason) => {
                    log_delivery_failure(message.id, target.chat_id, &reason.to_string());
                    failures.push(TargetFailure {
                        chat_id: target.chat_id,
                        name: target.name.clone(),
                        reason,
                    });
                }
            }
        }

        let total = targets.len();
        let failed = failures.len();

        let record = BroadcastRecord::create(
            &self.db.pool,
            message.id,
            &message.title,
            total as i64,
            succeeded as i64,
            failed as i64,
            triggered_by.actor(),
        )
        .await?;

        log_broadcast_done(message.id, total, succeeded, failed);

        Ok(BroadcastOutcome {
            total,
            succeeded,
            failed,
            failures,
            record_id: record.id,
        })
    }

    /// Resolves the message and the full current target list, then runs.
    pub async fn broadcast_message(
        &self,
        message_id: i64,
        triggered_by: &TriggeredBy,
    ) -> Result<BroadcastOutcome, BroadcastError> {
        let message = MessageTemplate::find_by_id(&self.db.pool, message_id)
            .await?
            .ok_or(BroadcastError::MessageNotFound(message_id))?;
        let targets = Target::list_for_delivery(&self.db.pool).await?;

        self.run_broadcast(&message, &targets, triggered_by).await
    }

    /// Sends a message to a single chat without touching the ledger.
    pub async fn send_preview(&self, message_id: i64, chat_id: i64) -> Result<(), BroadcastError> {
        let message = MessageTemplate::find_by_id(&self.db.pool, message_id)
            .await?
            .ok_or(BroadcastError::MessageNotFound(message_id))?;
        let content = BroadcastContent::from_template(&message)
            .map_err(|source| BroadcastError::InvalidMessage { message_id, source })?;

        self.transport
            .send(chat_id, &content)
            .await
            .map_err(BroadcastError::PreviewFailed)
    }
}
