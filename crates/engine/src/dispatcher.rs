//! Dispatch engine: one scheduled tick of the delivery pipeline.
//!
//! A tick:
//! 1. Returns immediately when auto-send is off or another tick is running
//! 2. Claims up to `fetch_limit` unsent messages, oldest first
//! 3. Spawns one task per message; each task splits the body and delivers
//!    its chunks in order, stopping at the first failed chunk
//! 4. For fully delivered messages, caches the receipts and marks the row sent
//! 5. Waits for every task; a failing task never cancels its siblings
//!
//! Delivery is at-least-once. A message that fails part-way is released and
//! re-sent from its first chunk on a later tick, with no backoff and no cap.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::Instrument;
use uuid::Uuid;

use hub_common::error::{DispatchError, RecordingStage};
use hub_common::types::{CachedDelivery, DeliveredChunk, Message, OutboundMessage};
use hub_notifier::DeliveryClient;

use crate::cache::ResultCache;
use crate::chunker;
use crate::state::DispatchState;
use crate::store::MessageStore;

/// Action name attached to every dispatch error log.
const LOG_ACTION: &str = "CronSendMessage";

/// Default number of messages claimed per tick.
pub const DEFAULT_FETCH_LIMIT: usize = 2;

/// Default gateway size limit, in characters.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 100;

/// Tunables for a [`DispatchEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Messages claimed per tick; also the number of concurrent workers.
    pub fetch_limit: usize,
    /// Maximum characters per delivered chunk.
    pub max_chunk_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            fetch_limit: DEFAULT_FETCH_LIMIT,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }
}

/// What happened to one message during a tick.
#[derive(Debug)]
pub enum MessageOutcome {
    /// Every chunk delivered and recorded; the message is now sent.
    Delivered { chunks: usize },
    /// Delivery failed; the message stays unsent.
    Failed(DispatchError),
    /// Every chunk delivered, but the receipts or the sent flag were not
    /// saved. Holds one `Recording` error per failed step, in order.
    DeliveredUnrecorded(Vec<DispatchError>),
}

/// Summary of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// True when the tick did no work because auto-send was off or a
    /// previous tick was still running.
    pub skipped: bool,
    pub fetched: usize,
    pub sent: usize,
    pub failed: usize,
    pub unrecorded: usize,
}

impl TickReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: &MessageOutcome) {
        match outcome {
            MessageOutcome::Delivered { .. } => self.sent += 1,
            MessageOutcome::Failed(_) => self.failed += 1,
            MessageOutcome::DeliveredUnrecorded(_) => self.unrecorded += 1,
        }
    }
}

/// Orchestrates fetch, chunking, concurrent delivery and recording.
pub struct DispatchEngine<S, C, D> {
    store: Arc<S>,
    cache: Arc<C>,
    client: Arc<D>,
    state: DispatchState,
    config: DispatchConfig,
    /// Held for the duration of a tick so overlapping ticks are skipped.
    running: Mutex<()>,
}

impl<S, C, D> DispatchEngine<S, C, D>
where
    S: MessageStore + 'static,
    C: ResultCache + 'static,
    D: DeliveryClient + 'static,
{
    pub fn new(
        store: Arc<S>,
        cache: Arc<C>,
        client: Arc<D>,
        state: DispatchState,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            cache,
            client,
            state,
            config,
            running: Mutex::new(()),
        }
    }

    pub fn state(&self) -> &DispatchState {
        &self.state
    }

    pub fn config(&self) -> DispatchConfig {
        self.config
    }

    /// Wait until no tick is running.
    ///
    /// Ticks started after this returns are not waited for, so stop the
    /// scheduler first.
    pub async fn wait_idle(&self) {
        let _guard = self.running.lock().await;
    }

    /// Run one tick. Only a failed fetch is returned as an error; per-message
    /// failures are logged and counted in the report.
    pub async fn run_tick(&self) -> Result<TickReport, DispatchError> {
        let span = tracing::info_span!("tick", tick_id = %Uuid::new_v4());
        self.run_tick_inner().instrument(span).await
    }

    async fn run_tick_inner(&self) -> Result<TickReport, DispatchError> {
        if !self.state.is_enabled() {
            tracing::debug!("Auto-send disabled, skipping tick");
            return Ok(TickReport::skipped());
        }

        let Ok(_guard) = self.running.try_lock() else {
            tracing::warn!("Previous tick still running, skipping tick");
            return Ok(TickReport::skipped());
        };

        let messages = self
            .store
            .fetch_unsent(self.config.fetch_limit)
            .await
            .inspect_err(|e| log_failure("FetchUnsentMessages", e))?;

        let mut report = TickReport {
            fetched: messages.len(),
            ..TickReport::default()
        };

        if messages.is_empty() {
            tracing::debug!("No unsent messages");
            return Ok(report);
        }

        let mut workers = JoinSet::new();
        for message in messages {
            let store = Arc::clone(&self.store);
            let cache = Arc::clone(&self.cache);
            let client = Arc::clone(&self.client);
            let max_chunk_size = self.config.max_chunk_size;

            workers.spawn(
                async move {
                    process_message(&*store, &*cache, &*client, message, max_chunk_size).await
                }
                .in_current_span(),
            );
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    tracing::error!(
                        action = LOG_ACTION,
                        method = "JoinWorker",
                        error = %e,
                        "Dispatch worker aborted"
                    );
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            fetched = report.fetched,
            sent = report.sent,
            failed = report.failed,
            unrecorded = report.unrecorded,
            "Tick complete"
        );

        Ok(report)
    }
}

/// Deliver every chunk of `message`, then record the result.
pub async fn process_message<S, C, D>(
    store: &S,
    cache: &C,
    client: &D,
    message: Message,
    max_chunk_size: usize,
) -> MessageOutcome
where
    S: MessageStore,
    C: ResultCache,
    D: DeliveryClient,
{
    let chunks = chunker::split(&message.content, max_chunk_size);
    let total = chunks.len();
    let mut contents = Vec::with_capacity(total);

    for (index, chunk) in chunks.into_iter().enumerate() {
        let outbound = OutboundMessage {
            to: message.recipient.clone(),
            content: chunk,
        };

        match client.send(&outbound).await {
            Ok(response) => contents.push(DeliveredChunk {
                message_id: response.message_id,
                sending_time: Utc::now(),
                content: outbound.content,
            }),
            Err(source) => {
                let err = if index == 0 {
                    DispatchError::Delivery(source)
                } else {
                    DispatchError::PartialDelivery {
                        delivered: index,
                        total,
                        source,
                    }
                };
                log_failure("SendMessage", &err);

                if let Err(release_err) = store.release(message.id).await {
                    // The claim lease still frees the row eventually.
                    log_failure("ReleaseMessage", &release_err);
                }

                return MessageOutcome::Failed(err);
            }
        }
    }

    let delivered = contents.len();
    let mut recording_errors = Vec::new();

    if let Err(e) = cache
        .set(&message.cache_key(), &CachedDelivery { contents })
        .await
    {
        log_failure("Redis Set", &e);
        recording_errors.push(DispatchError::Recording {
            stage: RecordingStage::CacheWrite,
            source: Box::new(e),
        });
    }

    if let Err(e) = store.mark_sent(message.id).await {
        log_failure("UpdateMessageStatusToSent", &e);
        recording_errors.push(DispatchError::Recording {
            stage: RecordingStage::StatusUpdate,
            source: Box::new(e),
        });
    }

    if !recording_errors.is_empty() {
        return MessageOutcome::DeliveredUnrecorded(recording_errors);
    }

    tracing::info!(
        message_id = message.id,
        chunks = delivered,
        "Message delivered"
    );
    MessageOutcome::Delivered { chunks: delivered }
}

fn log_failure(method: &str, error: &DispatchError) {
    tracing::error!(action = LOG_ACTION, method, error = %error, "Dispatch step failed");
}
