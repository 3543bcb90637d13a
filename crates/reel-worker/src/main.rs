//! Media pipeline worker binary.
//!
//! ```text
//! reel-worker generate <video_id>
//! reel-worker render <video_id>
//! reel-worker status <video_id>
//! reel-worker purge <video_id>
//! ```

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_models::{RenderOutcome, VideoId};
use reel_storage::keys;
use reel_worker::{WorkerConfig, WorkerContext};

const USAGE: &str = "usage: reel-worker <generate|render|status|purge> <video_id>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider was already installed");
    }

    dotenvy::dotenv().ok();
    init_tracing();

    let mut args = std::env::args().skip(1);
    let (command, video_id) = match (args.next(), args.next()) {
        (Some(command), Some(id)) => (command, VideoId::from_string(id)),
        _ => bail!(USAGE),
    };

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let ctx = WorkerContext::from_env(config)
        .await
        .context("failed to initialize worker")?;

    match command.as_str() {
        "generate" => {
            ctx.orchestrator
                .spawn_generate_all_assets(video_id.clone())
                .await
                .context("asset generation task panicked")?;

            match ctx.store.load_asset_outcome(&video_id).await? {
                Some(outcome) => print_json(&outcome)?,
                None => bail!("no asset outcome recorded for {}", video_id),
            }
        }
        "render" => {
            let result = ctx.renderer.render_video(&video_id).await?;
            println!("video: {}", result.video_url);
            println!("thumbnail: {}", result.thumbnail_url);
            println!("duration: {}s", result.duration_seconds);
        }
        "status" => {
            if let Some(progress) = ctx.store.load_asset_progress(&video_id).await? {
                print_json(&progress)?;
            }
            if let Some(outcome) = ctx.store.load_asset_outcome(&video_id).await? {
                print_json(&outcome)?;
            }
            if let Some(progress) = ctx.store.load_render_progress(&video_id).await? {
                print_json(&progress)?;
            }
            if let Some(outcome) = ctx.store.load_render_outcome(&video_id).await? {
                print_json(&outcome)?;
                if let RenderOutcome::Completed { video_key, .. } = &outcome {
                    let url = ctx
                        .objects
                        .download_url(video_key, ctx.config.download_url_ttl)
                        .await?;
                    println!("download_url: {}", url);
                }
            }
        }
        "purge" => {
            let deleted = ctx.orchestrator.purge_assets(&video_id).await?;
            println!(
                "deleted {} objects under {}",
                deleted,
                keys::video_prefix(&video_id)
            );
        }
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    }

    Ok(())
}

/// Colored output for dev, JSON for production.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reel=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
