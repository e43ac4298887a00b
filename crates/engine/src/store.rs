//! Message store: durable queue of messages with a `sent` flag.
//!
//! Fetching unsent messages is a claim: selected rows get `claimed_at`
//! stamped in the same statement (`FOR UPDATE SKIP LOCKED`), so two ticks,
//! or two processes, never pick up the same row while the claim lease is
//! live. A claim is cleared when the message is marked sent or released
//! after a failed delivery. Claims left behind by a crashed process expire
//! after the lease.

use std::future::Future;
use std::time::Duration;

use sqlx::PgPool;

use hub_common::error::DispatchError;
use hub_common::types::Message;

/// Number of rows written by [`PgMessageStore::seed_sample_messages`].
pub const SAMPLE_MESSAGE_COUNT: usize = 10;

/// Persistence contract consumed by the dispatcher and the read view.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait MessageStore: Send + Sync {
    /// Claim up to `limit` unsent messages, oldest id first.
    fn fetch_unsent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Message>, DispatchError>> + Send;

    /// Up to `limit` sent messages, oldest id first.
    fn fetch_sent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Message>, DispatchError>> + Send;

    /// Flag a message as sent. Terminal; also drops its claim.
    fn mark_sent(&self, id: i64) -> impl Future<Output = Result<(), DispatchError>> + Send;

    /// Drop the claim on an unsent message so the next tick retries it.
    fn release(&self, id: i64) -> impl Future<Output = Result<(), DispatchError>> + Send;
}

/// PostgreSQL-backed [`MessageStore`].
#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
    claim_lease: Duration,
}

impl PgMessageStore {
    pub fn new(pool: PgPool, claim_lease: Duration) -> Self {
        Self { pool, claim_lease }
    }

    /// Create the `messages` table and its unsent-row index if missing.
    pub async fn ensure_schema(&self) -> Result<(), DispatchError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id          BIGSERIAL PRIMARY KEY,
                recipient   TEXT NOT NULL,
                content     TEXT NOT NULL,
                sent        BOOLEAN NOT NULL DEFAULT FALSE,
                claimed_at  TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS messages_unsent_idx ON messages (id) WHERE NOT sent")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a new unsent message and return it.
    pub async fn insert(&self, recipient: &str, content: &str) -> Result<Message, DispatchError> {
        let message: Message = sqlx::query_as(
            r#"
            INSERT INTO messages (recipient, content)
            VALUES ($1, $2)
            RETURNING id, recipient, content, sent
            "#,
        )
        .bind(recipient)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    /// Replace every row with ten deterministic sample messages.
    pub async fn seed_sample_messages(&self) -> Result<(), DispatchError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM messages").execute(&mut *tx).await?;

        for number in 1..=SAMPLE_MESSAGE_COUNT {
            sqlx::query("INSERT INTO messages (recipient, content) VALUES ($1, $2)")
                .bind(sample_recipient(number))
                .bind(sample_content(number))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(count = SAMPLE_MESSAGE_COUNT, "Seeded sample messages");
        Ok(())
    }
}

impl MessageStore for PgMessageStore {
    async fn fetch_unsent(&self, limit: usize) -> Result<Vec<Message>, DispatchError> {
        let messages: Vec<Message> = sqlx::query_as(
            r#"
            WITH claimed AS (
                UPDATE messages SET claimed_at = NOW()
                WHERE id IN (
                    SELECT id FROM messages
                    WHERE NOT sent
                      AND (claimed_at IS NULL OR claimed_at < NOW() - make_interval(secs => $2))
                    ORDER BY id ASC
                    LIMIT $1
                    FOR UPDATE SKIP LOCKED
                )
                RETURNING id, recipient, content, sent
            )
            SELECT id, recipient, content, sent FROM claimed ORDER BY id ASC
            "#,
        )
        .bind(sql_limit(limit))
        .bind(self.claim_lease.as_secs_f64())
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn fetch_sent(&self, limit: usize) -> Result<Vec<Message>, DispatchError> {
        let messages: Vec<Message> = sqlx::query_as(
            "SELECT id, recipient, content, sent FROM messages WHERE sent ORDER BY id ASC LIMIT $1",
        )
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn mark_sent(&self, id: i64) -> Result<(), DispatchError> {
        sqlx::query("UPDATE messages SET sent = TRUE, claimed_at = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn release(&self, id: i64) -> Result<(), DispatchError> {
        sqlx::query("UPDATE messages SET claimed_at = NULL WHERE id = $1 AND NOT sent")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Recipient of the `number`th sample message.
pub fn sample_recipient(number: usize) -> String {
    format!("532500808{}", number)
}

/// Body of the `number`th sample message.
pub fn sample_content(number: usize) -> String {
    format!(
        "Lorem ipsum dolor sit amet, consectetur adipiscing elit. Pellentesque sit amet sem nec nisl \
         facilisis pretium. Nunc aliquet justo euismod urna, in fermentum eros accumsan. \
         This is message number {}",
        number
    )
}
