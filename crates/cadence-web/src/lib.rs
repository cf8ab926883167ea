//! Liveness endpoints for the cadence daemon.
//!
//! The daemon serves this tiny router alongside the scheduler so operators
//! and orchestrators can probe that the process is up, independent of
//! whether the current cycle is publishing.

mod routes;

pub use routes::liveness_router;
