use std::time::Duration;

use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use secrecy::SecretString;

const DEFAULT_REDIS_PORT: u16 = 6379;

/// Global application configuration loaded from environment variables.
#[derive(Debug)]
pub struct AppConfig {
    /// Service environment tag (e.g. "local", "staging", "production")
    pub service_environment: String,

    /// Dispatch tick schedule: `@every <duration>` or a cron expression (default: `@every 120s`)
    pub sending_message_ticker: String,

    /// Maximum number of unsent messages claimed per tick (default: 2)
    pub fetch_limit: usize,

    /// Maximum characters per delivered chunk (default: 100)
    pub max_chunk_size: usize,

    /// How long a claimed message is held before another tick may reclaim it (default: 10m)
    pub claim_lease: Duration,

    /// Replace the message table contents with ten sample rows on boot (default: true)
    pub seed_sample_messages: bool,

    /// Redis address as `host:port`
    pub redis_address: String,

    /// Redis password
    pub redis_password: Option<String>,

    /// Redis logical database index
    pub redis_db: i64,

    /// Expiry of cached delivery receipts (default: 24h)
    pub redis_expiry: Duration,

    /// PostgreSQL connection string
    pub postgres_dsn: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Notification gateway endpoint
    pub hook_client_url: String,

    /// Shared secret sent to the gateway on every request
    pub hook_client_secret: SecretString,

    /// Per-request timeout for gateway calls (default: 30s)
    pub hook_client_timeout: Duration,

    /// HTTP listen port
    pub http_port: u16,

    /// Upper bound on handling a single HTTP request (default: 30s)
    pub http_request_timeout: Duration,

    /// Upper bound on draining connections at shutdown (default: 30s)
    pub http_shutdown_timeout: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            service_environment: required("SERVICE_ENVIRONMENT")?,
            sending_message_ticker: std::env::var("SERVICE_SENDING_MESSAGE_TICKER")
                .unwrap_or_else(|_| "@every 120s".to_string()),
            fetch_limit: std::env::var("DISPATCH_FETCH_LIMIT")
                .unwrap_or_else(|_| "2".to_string())
                .parse::<usize>()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or_else(|| anyhow::anyhow!("DISPATCH_FETCH_LIMIT must be a positive integer"))?,
            max_chunk_size: std::env::var("DISPATCH_MAX_CHUNK_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| {
                    anyhow::anyhow!("DISPATCH_MAX_CHUNK_SIZE must be a positive integer")
                })?,
            claim_lease: duration("DISPATCH_CLAIM_LEASE", "10m")?,
            seed_sample_messages: std::env::var("SEED_SAMPLE_MESSAGES")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SEED_SAMPLE_MESSAGES must be true or false"))?,
            redis_address: required("REDIS_ADDRESS")?,
            redis_password: std::env::var("REDIS_PASSWORD")
                .ok()
                .filter(|password| !password.is_empty()),
            redis_db: required("REDIS_DB")?
                .parse()
                .map_err(|_| anyhow::anyhow!("REDIS_DB must be a valid i64"))?,
            redis_expiry: duration("REDIS_EXPIRY", "24h")?,
            postgres_dsn: required("POSTGRES_DSN")?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            hook_client_url: required("HOOK_CLIENT_URL")?,
            hook_client_secret: SecretString::from(required("HOOK_CLIENT_SECRET")?),
            hook_client_timeout: duration("HOOK_CLIENT_TIMEOUT", "30s")?,
            http_port: parse_port(&required("HTTP_SERVER_PORT")?)?,
            http_request_timeout: duration("HTTP_SERVER_REQUEST_TIMEOUT", "30s")?,
            http_shutdown_timeout: duration("HTTP_SERVER_SHUTDOWN_TIMEOUT", "30s")?,
        })
    }

    /// Redis connection settings. The password is passed through as-is, so
    /// it may contain characters that are reserved in a URL.
    pub fn redis_connection_info(&self) -> anyhow::Result<ConnectionInfo> {
        let (host, port) = match self.redis_address.rsplit_once(':') {
            Some((host, port)) => (
                host,
                port.parse().map_err(|_| {
                    anyhow::anyhow!("REDIS_ADDRESS must be host:port, got {:?}", self.redis_address)
                })?,
            ),
            None => (self.redis_address.as_str(), DEFAULT_REDIS_PORT),
        };

        Ok(ConnectionInfo {
            addr: ConnectionAddr::Tcp(host.to_string(), port),
            redis: RedisConnectionInfo {
                db: self.redis_db,
                password: self.redis_password.clone(),
                ..RedisConnectionInfo::default()
            },
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).map_err(|_| anyhow::anyhow!("{} environment variable is required", key))
}

fn duration(key: &str, default: &str) -> anyhow::Result<Duration> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    humantime::parse_duration(raw.trim())
        .map_err(|e| anyhow::anyhow!("{} must be a duration like \"30s\": {}", key, e))
}

/// Accepts both `8080` and the `:8080` listen-address form.
fn parse_port(raw: &str) -> anyhow::Result<u16> {
    raw.trim()
        .trim_start_matches(':')
        .parse()
        .map_err(|_| anyhow::anyhow!("HTTP_SERVER_PORT must be a port number, got {:?}", raw))
}
