//! In-memory collaborators for unit tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::{Barrier, Notify, Semaphore};

use hub_common::error::{DeliveryError, DispatchError};
use hub_common::types::{CachedDelivery, GatewayResponse, Message, OutboundMessage};
use hub_notifier::DeliveryClient;

use crate::cache::ResultCache;
use crate::store::MessageStore;

fn store_down() -> DispatchError {
    DispatchError::Store(sqlx::Error::PoolTimedOut)
}

fn cache_down() -> DispatchError {
    DispatchError::Cache(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "connection refused",
    )))
}

#[derive(Default)]
pub struct FakeStore {
    rows: Mutex<BTreeMap<i64, (Message, bool)>>,
    next_id: AtomicUsize,
    pub calls: AtomicUsize,
    pub fail_fetch: AtomicBool,
    pub fail_mark_sent: AtomicBool,
}

impl FakeStore {
    pub fn insert(&self, recipient: &str, content: &str) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
        let message = Message {
            id,
            recipient: recipient.to_string(),
            content: content.to_string(),
            sent: false,
        };
        self.rows.lock().unwrap().insert(id, (message, false));
        id
    }

    /// Insert a row that is already flagged sent.
    pub fn insert_sent(&self, recipient: &str, content: &str) -> i64 {
        let id = self.insert(recipient, content);
        self.rows.lock().unwrap().get_mut(&id).unwrap().0.sent = true;
        id
    }

    pub fn is_sent(&self, id: i64) -> bool {
        self.rows.lock().unwrap()[&id].0.sent
    }

    pub fn is_claimed(&self, id: i64) -> bool {
        self.rows.lock().unwrap()[&id].1
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MessageStore for FakeStore {
    async fn fetch_unsent(&self, limit: usize) -> Result<Vec<Message>, DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(store_down());
        }

        let mut rows = self.rows.lock().unwrap();
        let mut claimed = Vec::new();
        for (message, is_claimed) in rows.values_mut() {
            if claimed.len() == limit {
                break;
            }
            if !message.sent && !*is_claimed {
                *is_claimed = true;
                claimed.push(message.clone());
            }
        }
        Ok(claimed)
    }

    async fn fetch_sent(&self, limit: usize) -> Result<Vec<Message>, DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(store_down());
        }

        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|(message, _)| message.sent)
            .take(limit)
            .map(|(message, _)| message.clone())
            .collect())
    }

    async fn mark_sent(&self, id: i64) -> Result<(), DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_mark_sent.load(Ordering::SeqCst) {
            return Err(store_down());
        }

        if let Some((message, claimed)) = self.rows.lock().unwrap().get_mut(&id) {
            message.sent = true;
            *claimed = false;
        }
        Ok(())
    }

    async fn release(&self, id: i64) -> Result<(), DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((message, claimed)) = self.rows.lock().unwrap().get_mut(&id) {
            if !message.sent {
                *claimed = false;
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeCache {
    entries: Mutex<HashMap<String, CachedDelivery>>,
    pub fail_set: AtomicBool,
    pub fail_get: AtomicBool,
}

impl FakeCache {
    pub fn entry(&self, key: &str) -> Option<CachedDelivery> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Drop an entry as if its TTL had elapsed.
    pub fn expire(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}

impl ResultCache for FakeCache {
    async fn set(&self, key: &str, value: &CachedDelivery) -> Result<(), DispatchError> {
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(cache_down());
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<CachedDelivery>, DispatchError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(cache_down());
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }
}

/// Gateway double that records every chunk it accepts.
#[derive(Default)]
pub struct FakeClient {
    sent: Mutex<Vec<OutboundMessage>>,
    attempts: AtomicUsize,
    /// Reject any chunk whose content contains this marker.
    pub fail_marker: Mutex<Option<String>>,
    /// When set, every send waits here until all expected senders arrive.
    pub barrier: Option<Barrier>,
    /// When set, every send consumes one permit before returning.
    pub gate: Option<Semaphore>,
    /// Signalled whenever a send starts.
    pub entered: Notify,
}

impl FakeClient {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Mutex::new(Some(marker.to_string())),
            ..Self::default()
        }
    }

    /// Every send waits until `senders` sends are in flight together.
    pub fn with_barrier(senders: usize) -> Self {
        Self {
            barrier: Some(Barrier::new(senders)),
            ..Self::default()
        }
    }

    /// Every send blocks until a permit is added to `gate`.
    pub fn with_gate() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    /// Let `n` blocked sends through.
    pub fn open_gate(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn stop_failing(&self) {
        *self.fail_marker.lock().unwrap() = None;
    }
}

impl DeliveryClient for FakeClient {
    async fn send(&self, message: &OutboundMessage) -> Result<GatewayResponse, DeliveryError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let rejected = self
            .fail_marker
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|marker| message.content.contains(marker));
        if rejected {
            return Err(DeliveryError::Status {
                status: 503,
                body: "gateway unavailable".to_string(),
            });
        }

        self.sent.lock().unwrap().push(message.clone());
        Ok(GatewayResponse {
            message: "Accepted".to_string(),
            message_id: format!("gw-{}", attempt + 1),
        })
    }
}
