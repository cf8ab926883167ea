//! Daemon command wiring the scheduler to the liveness server.
//!
//! The daemon runs two tasks: the posting scheduler and a small axum
//! server for liveness probes. Both stop on ctrl-c; the process waits for
//! the scheduler to wind down before exiting. A scheduler halted by the
//! underfill policy leaves the liveness server running so the process
//! stays observable.

use std::sync::Arc;

use miette::Result;
use tokio::sync::watch;
use tracing::{info, warn};

use cadence_atproto::AtprotoClient;
use cadence_openai::ImageClient;
use cadence_scheduler::{CycleConfig, DailyScheduler, PostPublisher};
use cadence_web::liveness_router;

/// Everything the daemon needs to come up.
pub struct DaemonConfig {
    /// Base URL of the PDS to publish through.
    pub pds_url: String,
    /// Handle of the posting account.
    pub handle: String,
    /// App password for the posting account.
    pub app_password: String,
    /// OpenAI API key. Absent means posts go out text-only.
    pub openai_api_key: Option<String>,
    /// Image model used for illustrations.
    pub image_model: String,
    /// Image dimensions requested from the generator.
    pub image_size: String,
    /// Bind address for the liveness endpoints.
    pub bind: String,
    pub cycle: CycleConfig,
}

pub async fn run(config: DaemonConfig) -> Result<()> {
    info!("starting cadence daemon");

    let atproto = AtprotoClient::new(&config.pds_url);
    atproto
        .login(&config.handle, &config.app_password)
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    info!(handle = %config.handle, "logged in");

    let mut publisher = PostPublisher::new(atproto);
    match config.openai_api_key {
        Some(key) => {
            let imagegen = ImageClient::new(key)
                .with_model(&config.image_model)
                .with_size(&config.image_size);
            publisher = publisher.with_imagegen(imagegen);
            info!(
                model = %config.image_model,
                size = %config.image_size,
                "post illustrations enabled"
            );
        }
        None => {
            info!("no OpenAI API key configured, posts will be text-only");
        }
    }

    // Ctrl-c flips the flag every task watches
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        let _ = signal_tx.send(true);
    });

    let scheduler = DailyScheduler::new(config.cycle, Arc::new(publisher));
    let scheduler_shutdown = shutdown_rx.clone();
    let scheduler_handle = tokio::spawn(async move { scheduler.run(scheduler_shutdown).await });

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    info!("liveness server listening on http://{}", config.bind);

    let mut web_shutdown_rx = shutdown_rx.clone();
    axum::serve(listener, liveness_router())
        .with_graceful_shutdown(async move {
            if *web_shutdown_rx.borrow() {
                return;
            }
            let _ = web_shutdown_rx.changed().await;
        })
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    // Let the scheduler finish the slot it is in
    if scheduler_handle.await.is_err() {
        warn!("scheduler task panicked");
    }

    info!("daemon shut down gracefully");
    Ok(())
}
