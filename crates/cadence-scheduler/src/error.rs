use std::path::PathBuf;

use thiserror::Error;

/// Errors from the scheduling cycle itself.
///
/// Every variant here is treated as transient by the scheduler: the cycle
/// that hit it is abandoned, the error cooldown elapses, and a fresh cycle
/// starts from the top.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("failed to read content file {path}: {source}")]
    ContentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse content file {path}: {source}")]
    ContentParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from publishing a single post.
///
/// These are scoped to one slot: the scheduler logs them and moves on to
/// the next selected post rather than abandoning the cycle.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("platform error: {0}")]
    Platform(#[from] cadence_atproto::AtprotoError),
}
