//! Cadence: a daily posting daemon for Bluesky.
//!
//! Main binary with subcommands:
//! - `daemon`: Posting scheduler plus liveness endpoints
//! - `post`: Publish a single post immediately and exit

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cadence_scheduler::{CycleConfig, UnderfillPolicy};

mod daemon;

#[derive(Parser)]
#[command(name = "cadence", version, about = "Daily posting daemon for Bluesky")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Behavior when the content file holds fewer posts than a day needs.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum UnderfillArg {
    /// Stop scheduling, but keep serving the liveness endpoints
    Halt,
    /// Wait out a delay, then re-read the content file
    Retry,
}

fn underfill_policy_from(arg: UnderfillArg, retry_secs: u64) -> UnderfillPolicy {
    match arg {
        UnderfillArg::Halt => UnderfillPolicy::Halt,
        UnderfillArg::Retry => UnderfillPolicy::Retry {
            delay: Duration::from_secs(retry_secs),
        },
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the posting daemon (scheduler plus liveness endpoints)
    Daemon {
        /// Base URL of the PDS to publish through
        #[arg(long, env = "CADENCE_PDS_URL", default_value = "https://bsky.social")]
        pds_url: String,

        /// Handle of the posting account
        #[arg(long, env = "CADENCE_HANDLE")]
        handle: String,

        /// App password for the posting account
        #[arg(long, env = "CADENCE_APP_PASSWORD")]
        app_password: String,

        /// OpenAI API key for post illustrations (omit to post text-only)
        #[arg(long, env = "OPENAI_API_KEY")]
        openai_api_key: Option<String>,

        /// Image model used for illustrations
        #[arg(long, env = "CADENCE_IMAGE_MODEL", default_value = "dall-e-3")]
        image_model: String,

        /// Image dimensions requested from the generator
        #[arg(long, env = "CADENCE_IMAGE_SIZE", default_value = "1024x1024")]
        image_size: String,

        /// Path to the JSON content file
        #[arg(long, env = "CADENCE_CONTENT_PATH", default_value = "posts.json")]
        content_path: PathBuf,

        /// Posts published per day
        #[arg(long, env = "CADENCE_POSTS_PER_DAY", default_value = "15")]
        posts_per_day: usize,

        /// Cooldown in seconds before restarting a failed cycle
        #[arg(long, env = "CADENCE_COOLDOWN_SECS", default_value = "300")]
        cooldown_secs: u64,

        /// What to do when the content file has too few posts
        #[arg(
            long,
            env = "CADENCE_UNDERFILL_POLICY",
            value_enum,
            default_value = "halt"
        )]
        underfill_policy: UnderfillArg,

        /// Delay in seconds before re-reading an underfilled pool (retry policy only)
        #[arg(long, env = "CADENCE_UNDERFILL_RETRY_SECS", default_value = "300")]
        underfill_retry_secs: u64,

        /// Bind address for the liveness endpoints
        #[arg(long, env = "CADENCE_BIND", default_value = "0.0.0.0:8080")]
        bind: String,
    },

    /// Publish a single post immediately and exit
    Post {
        /// Base URL of the PDS to publish through
        #[arg(long, env = "CADENCE_PDS_URL", default_value = "https://bsky.social")]
        pds_url: String,

        /// Handle of the posting account
        #[arg(long, env = "CADENCE_HANDLE")]
        handle: String,

        /// App password for the posting account
        #[arg(long, env = "CADENCE_APP_PASSWORD")]
        app_password: String,

        /// OpenAI API key for post illustrations (omit to post text-only)
        #[arg(long, env = "OPENAI_API_KEY")]
        openai_api_key: Option<String>,

        /// Post text
        #[arg(value_name = "TEXT")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cadence=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon {
            pds_url,
            handle,
            app_password,
            openai_api_key,
            image_model,
            image_size,
            content_path,
            posts_per_day,
            cooldown_secs,
            underfill_policy,
            underfill_retry_secs,
            bind,
        } => {
            let cycle = CycleConfig::new(content_path)
                .with_posts_per_day(posts_per_day)
                .with_error_cooldown(Duration::from_secs(cooldown_secs))
                .with_underfill_policy(underfill_policy_from(
                    underfill_policy,
                    underfill_retry_secs,
                ));

            daemon::run(daemon::DaemonConfig {
                pds_url,
                handle,
                app_password,
                openai_api_key,
                image_model,
                image_size,
                bind,
                cycle,
            })
            .await
        }

        Commands::Post {
            pds_url,
            handle,
            app_password,
            openai_api_key,
            text,
        } => run_post(&pds_url, &handle, &app_password, openai_api_key, &text).await,
    }
}

async fn run_post(
    pds_url: &str,
    handle: &str,
    app_password: &str,
    openai_api_key: Option<String>,
    text: &str,
) -> Result<()> {
    use cadence_atproto::AtprotoClient;
    use cadence_openai::ImageClient;
    use cadence_scheduler::{PostPublisher, Publisher};

    let atproto = AtprotoClient::new(pds_url);
    atproto
        .login(handle, app_password)
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    let mut publisher = PostPublisher::new(atproto);
    if let Some(key) = openai_api_key {
        publisher = publisher.with_imagegen(ImageClient::new(key));
    }

    let post = publisher
        .publish(text)
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    println!("{}", post.uri);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn halt_arg_maps_to_halt_policy() {
        let policy = underfill_policy_from(UnderfillArg::Halt, 60);

        assert_eq!(policy, UnderfillPolicy::Halt);
    }

    #[test]
    fn retry_arg_carries_the_delay() {
        let policy = underfill_policy_from(UnderfillArg::Retry, 60);

        assert_eq!(
            policy,
            UnderfillPolicy::Retry {
                delay: Duration::from_secs(60)
            }
        );
    }
}
