use redis::{Client, IntoConnectionInfo};
use redis::aio::ConnectionManager;

/// Open a reconnecting Redis connection for the result cache.
///
/// The initial `PING` makes an unreachable cache fail at boot instead of on
/// the first tick.
pub async fn create_redis_pool(info: impl IntoConnectionInfo) -> anyhow::Result<ConnectionManager> {
    let client = Client::open(info)?;
    let mut manager = ConnectionManager::new(client).await?;
    let _: String = redis::cmd("PING").query_async(&mut manager).await?;

    tracing::info!("Connected to Redis");
    Ok(manager)
}
