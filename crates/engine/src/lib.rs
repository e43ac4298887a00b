//! Scheduled message dispatch: claim unsent messages, split them into
//! gateway-sized chunks, deliver them concurrently and record the receipts.

pub mod cache;
pub mod chunker;
pub mod dispatcher;
pub mod read_view;
pub mod scheduler;
pub mod state;
pub mod store;

#[cfg(test)]
mod testing;

pub use cache::{RedisResultCache, ResultCache};
pub use dispatcher::{DispatchConfig, DispatchEngine, MessageOutcome, TickReport};
pub use read_view::ReadView;
pub use scheduler::{TickSchedule, TickScheduler};
pub use state::DispatchState;
pub use store::{MessageStore, PgMessageStore};
