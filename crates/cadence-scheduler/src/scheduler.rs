use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::content::ContentStore;
use crate::error::SchedulerError;
use crate::publish::Publisher;
use crate::types::{CycleConfig, CycleOutcome, UnderfillPolicy};

/// Samples `count` posts from the pool without replacement, in randomized
/// order.
///
/// Asking for more posts than the pool holds returns the whole pool,
/// shuffled. The scheduler checks pool size before sampling, so that case
/// only arises when calling this directly.
pub fn sample_selection<R: Rng + ?Sized>(
    pool: &[String],
    count: usize,
    rng: &mut R,
) -> Vec<String> {
    let mut selection: Vec<String> = pool.choose_multiple(rng, count).cloned().collect();
    selection.shuffle(rng);
    selection
}

/// Runs the daily posting cycle until shutdown.
///
/// Each cycle re-reads the content file, samples a day's worth of posts,
/// and publishes them one per slot with an even pause between slots. A
/// failed slot is logged and skipped; a failed cycle waits out the error
/// cooldown and restarts from the top.
pub struct DailyScheduler {
    config: CycleConfig,
    store: ContentStore,
    publisher: Arc<dyn Publisher>,
}

impl DailyScheduler {
    pub fn new(config: CycleConfig, publisher: Arc<dyn Publisher>) -> Self {
        let store = ContentStore::new(config.content_path());
        Self {
            config,
            store,
            publisher,
        }
    }

    /// Loops over cycles until shutdown is requested or the underfill
    /// policy halts scheduling.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            posts_per_day = self.config.posts_per_day(),
            slot_interval_secs = self.config.slot_interval().as_secs(),
            "scheduler starting"
        );

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            match self.run_cycle(&mut shutdown_rx).await {
                Ok(CycleOutcome::Completed { published, failed }) => {
                    info!(published, failed, "cycle complete");
                }
                Ok(CycleOutcome::Underfilled { available }) => {
                    match self.config.underfill_policy() {
                        UnderfillPolicy::Halt => {
                            error!(
                                available,
                                needed = self.config.posts_per_day(),
                                "content pool underfilled, halting scheduler"
                            );
                            break;
                        }
                        UnderfillPolicy::Retry { delay } => {
                            warn!(
                                available,
                                needed = self.config.posts_per_day(),
                                retry_secs = delay.as_secs(),
                                "content pool underfilled, retrying after delay"
                            );
                            if self.pause(delay, &mut shutdown_rx).await {
                                break;
                            }
                        }
                    }
                }
                Ok(CycleOutcome::Interrupted) => {
                    break;
                }
                Err(e) => {
                    error!(
                        error = %e,
                        cooldown_secs = self.config.error_cooldown().as_secs(),
                        "cycle failed, cooling down before restart"
                    );
                    if self.pause(self.config.error_cooldown(), &mut shutdown_rx).await {
                        break;
                    }
                }
            }
        }

        info!("scheduler stopped");
    }

    /// Runs one full cycle: load, sample, publish slot by slot.
    ///
    /// There is no pause after the final slot; the next cycle's read
    /// follows it immediately.
    pub async fn run_cycle(
        &self,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<CycleOutcome, SchedulerError> {
        let pool = self.store.load().await?;
        let needed = self.config.posts_per_day();

        if pool.len() < needed {
            return Ok(CycleOutcome::Underfilled {
                available: pool.len(),
            });
        }

        let mut rng = StdRng::from_entropy();
        let selection = sample_selection(&pool, needed, &mut rng);

        info!(
            pool = pool.len(),
            selected = selection.len(),
            "starting publish cycle"
        );

        let interval = self.config.slot_interval();
        let mut published = 0;
        let mut failed = 0;

        for (slot, text) in selection.iter().enumerate() {
            match self.publisher.publish(text).await {
                Ok(post) => {
                    published += 1;
                    info!(slot, uri = %post.uri, "published post");
                }
                Err(e) => {
                    failed += 1;
                    warn!(slot, error = %e, "publish failed, skipping slot");
                }
            }

            if slot + 1 < selection.len() && self.pause(interval, shutdown_rx).await {
                return Ok(CycleOutcome::Interrupted);
            }
        }

        Ok(CycleOutcome::Completed { published, failed })
    }

    /// Sleeps for `duration` unless shutdown arrives first.
    ///
    /// Returns true when shutdown was requested. A dropped sender counts
    /// as shutdown.
    async fn pause(&self, duration: Duration, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
        if *shutdown_rx.borrow() {
            return true;
        }

        tokio::select! {
            biased;
            changed = shutdown_rx.changed() => changed.is_err() || *shutdown_rx.borrow(),
            _ = tokio::time::sleep(duration) => false,
        }
    }
}
