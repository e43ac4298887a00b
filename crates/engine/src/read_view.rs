//! Read view: sent messages joined with their cached delivery receipts.

use std::sync::Arc;

use hub_common::error::DispatchError;
use hub_common::types::SentMessageView;

use crate::cache::ResultCache;
use crate::store::MessageStore;

/// Default number of sent messages returned by the HTTP read view.
pub const DEFAULT_VIEW_LIMIT: usize = 1000;

pub struct ReadView<S, C> {
    store: Arc<S>,
    cache: Arc<C>,
}

impl<S, C> ReadView<S, C>
where
    S: MessageStore,
    C: ResultCache,
{
    pub fn new(store: Arc<S>, cache: Arc<C>) -> Self {
        Self { store, cache }
    }

    /// Up to `limit` sent messages, oldest first, each with its receipts.
    ///
    /// A store failure fails the whole view. A cache miss or cache failure
    /// only empties that message's `contents`.
    pub async fn fetch_sent_view(&self, limit: usize) -> Result<Vec<SentMessageView>, DispatchError> {
        let messages = self.store.fetch_sent(limit).await.inspect_err(|e| {
            tracing::error!(
                action = "FetchSentMessages",
                method = "FetchSentMessages",
                error = %e,
                "Failed to fetch sent messages"
            );
        })?;

        let mut views = Vec::with_capacity(messages.len());
        for message in messages {
            let contents = match self.cache.get(&message.cache_key()).await {
                Ok(Some(delivery)) => delivery.contents,
                Ok(None) => Vec::new(),
                Err(e) => {
                    tracing::error!(
                        action = "FetchSentMessages",
                        method = "Redis Get",
                        message_id = message.id,
                        error = %e,
                        "Failed to read delivery receipts"
                    );
                    Vec::new()
                }
            };

            views.push(SentMessageView {
                recipient: message.recipient,
                contents,
            });
        }

        Ok(views)
    }
}
