//! Daily posting cycle for cadence.
//!
//! The scheduler re-reads a JSON content file at the start of every cycle,
//! samples a day's worth of posts uniformly without replacement, and hands
//! them to a [`Publisher`] one per slot, pacing slots evenly across the
//! cycle span. Slot failures are skipped; cycle failures trigger a cooldown
//! and a fresh cycle.

mod content;
mod error;
mod publish;
mod scheduler;
mod types;

pub use content::ContentStore;
pub use error::{PublishError, SchedulerError};
pub use publish::{PostPublisher, Publisher};
pub use scheduler::{DailyScheduler, sample_selection};
pub use types::{
    CycleConfig, CycleOutcome, DEFAULT_CYCLE_SPAN, DEFAULT_ERROR_COOLDOWN, DEFAULT_POSTS_PER_DAY,
    UnderfillPolicy,
};
