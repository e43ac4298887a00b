pub mod config;
pub mod db;
pub mod envelope;
pub mod error;
pub mod redis_pool;
pub mod types;
