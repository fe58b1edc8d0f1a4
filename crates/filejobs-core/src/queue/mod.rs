//! Job store implementations: state machine, retry policy, in-memory and
//! Redis backends.

mod memory;
mod record;
mod redis_store;
mod retry;
mod state;

pub use self::memory::InMemoryJobStore;
pub use self::record::JobRecord;
pub use self::redis_store::RedisJobStore;
pub use self::retry::{Decision, RetryPolicy};
pub use self::state::JobState;
