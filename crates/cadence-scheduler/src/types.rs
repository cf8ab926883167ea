use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of posts published per cycle.
pub const DEFAULT_POSTS_PER_DAY: usize = 15;

/// Default span a full cycle is paced across.
pub const DEFAULT_CYCLE_SPAN: Duration = Duration::from_secs(86_400);

/// Default pause before restarting after a cycle-level error.
pub const DEFAULT_ERROR_COOLDOWN: Duration = Duration::from_secs(300);

/// What to do when the content file holds fewer posts than a cycle needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnderfillPolicy {
    /// Stop scheduling entirely. The daemon keeps serving its liveness
    /// endpoint, but no further cycles run until restart.
    Halt,
    /// Log, wait out the delay, and re-read the content file.
    Retry { delay: Duration },
}

/// Configuration for the posting cycle.
///
/// Constructed once at startup and passed by reference into the scheduler.
/// All knobs have defaults matching a 15-post day; tests shrink them to
/// keep virtual time small.
#[derive(Debug, Clone)]
pub struct CycleConfig {
    content_path: PathBuf,
    posts_per_day: usize,
    cycle_span: Duration,
    error_cooldown: Duration,
    underfill_policy: UnderfillPolicy,
}

impl CycleConfig {
    pub fn new(content_path: impl Into<PathBuf>) -> Self {
        Self {
            content_path: content_path.into(),
            posts_per_day: DEFAULT_POSTS_PER_DAY,
            cycle_span: DEFAULT_CYCLE_SPAN,
            error_cooldown: DEFAULT_ERROR_COOLDOWN,
            underfill_policy: UnderfillPolicy::Halt,
        }
    }

    /// Posts published per cycle. Clamped to at least 1 so the slot
    /// interval stays well-defined.
    pub fn with_posts_per_day(mut self, posts_per_day: usize) -> Self {
        self.posts_per_day = posts_per_day.max(1);
        self
    }

    pub fn with_cycle_span(mut self, cycle_span: Duration) -> Self {
        self.cycle_span = cycle_span;
        self
    }

    pub fn with_error_cooldown(mut self, error_cooldown: Duration) -> Self {
        self.error_cooldown = error_cooldown;
        self
    }

    pub fn with_underfill_policy(mut self, policy: UnderfillPolicy) -> Self {
        self.underfill_policy = policy;
        self
    }

    pub fn content_path(&self) -> &Path {
        &self.content_path
    }

    pub fn posts_per_day(&self) -> usize {
        self.posts_per_day
    }

    pub fn cycle_span(&self) -> Duration {
        self.cycle_span
    }

    pub fn error_cooldown(&self) -> Duration {
        self.error_cooldown
    }

    pub fn underfill_policy(&self) -> UnderfillPolicy {
        self.underfill_policy
    }

    /// Pause between consecutive slots, the cycle span divided evenly
    /// across the day's posts and truncated to whole seconds.
    pub fn slot_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_span.as_secs() / self.posts_per_day as u64)
    }
}

/// How a single cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every slot ran. `failed` counts slots whose publish errored and
    /// was skipped.
    Completed { published: usize, failed: usize },
    /// The content file held fewer posts than the cycle needed.
    Underfilled { available: usize },
    /// Shutdown was requested mid-cycle.
    Interrupted,
}
