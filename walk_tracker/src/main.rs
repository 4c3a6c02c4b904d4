use std::{fs::OpenOptions, io::Write, path::PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walk_tracker::{
    configuration::{Configuration, DEFAULT_CONFIG_FILE},
    core::gpx_util::read_gpx,
    location::{Permission, ReplayFeed},
    tracker::{Notice, RouteTracker},
};
use walk_tracker_data_management::{resolve_data_path, DataManager, FileStore};
use walk_tracker_lib::progress::{format_duration, WALK_GOALS_KM, XP_PER_LEVEL};

/// Track dog walks and keep score.
#[derive(Parser)]
#[command(version)]
struct Cli {
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a GPX track as a live walk and save it
    Walk {
        gpx_file: PathBuf,
        /// Milliseconds between replayed positions
        #[arg(long)]
        pace_ms: Option<u64>,
    },
    /// List saved routes, newest first
    Routes,
    /// Delete all saved routes. XP is kept
    Clear,
    /// Show XP level and walk goal progress
    Profile,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Configuration::load(&cli.config)?;

    let log_file = resolve_data_path(&config.log_file);
    if let Some(dir) = log_file.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .with_context(|| format!("failed to open {}", log_file.display()))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{}=info,walk_tracker_data_management=info", env!("CARGO_CRATE_NAME")).into())
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
        .init();

    let data_manager = DataManager::start(resolve_data_path(&config.data_dir)).await?;

    match cli.command {
        Command::Walk { gpx_file, pace_ms } => {
            let pace = pace_ms.map(Duration::from_millis).unwrap_or(config.replay_pace);
            walk(data_manager, gpx_file, pace).await
        }
        Command::Routes => list_routes(&data_manager).await,
        Command::Clear => {
            data_manager.clear_routes().await?;
            println!("Route history cleared");
            Ok(())
        }
        Command::Profile => profile(&data_manager).await,
    }
}

async fn walk(data_manager: DataManager<FileStore>, gpx_file: PathBuf, pace: Duration) -> anyhow::Result<()> {
    let track = read_gpx(&gpx_file)?;
    println!("Walking \"{}\" ({} positions)", track.name, track.points.len());

    let feed = ReplayFeed::new(track.points).with_pace(pace);
    let mut tracker = RouteTracker::new(feed.clone(), data_manager);

    if tracker.request_access().await == Permission::Denied {
        println!("{}", Notice::PermissionDenied);
        return Ok(());
    }

    match tracker.locate().await {
        Ok(position) => println!("Starting at {:.5}, {:.5}", position.latitude, position.longitude),
        Err(err) => println!("{}", err.notice()),
    }

    if let Err(err) = tracker.start().await {
        println!("{}", err.notice());
        return Ok(());
    }

    let mut updates = tracker.watch();
    let exhausted = feed.exhausted();
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(exhausted, interrupted);

    loop {
        tokio::select! {
            _ = &mut exhausted => break,
            _ = &mut interrupted => {
                tracing::info!("Interrupted, stopping walk");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let (elapsed_seconds, distance_km, xp) = {
                    let snapshot = updates.borrow_and_update();
                    (snapshot.elapsed_seconds, snapshot.distance_km, snapshot.xp)
                };
                print!("\r{}  {:.2} km  {} XP  ", format_duration(elapsed_seconds), distance_km, xp);
                std::io::stdout().flush()?;
            }
        }
    }
    println!();

    match tracker.stop().await {
        Ok(saved) => {
            println!("{}", Notice::from(&saved));
            println!("{} km in {}, {} XP in total", saved.record.distance_km, format_duration(saved.record.duration_seconds), saved.total_xp);
        }
        Err(err) => println!("{}", err.notice()),
    }

    Ok(())
}

async fn list_routes(data_manager: &DataManager<FileStore>) -> anyhow::Result<()> {
    let routes = data_manager.get_routes().await?;
    if routes.is_empty() {
        println!("No routes yet");
        return Ok(());
    }

    for route in routes {
        println!(
            "{:>14}  {}  {:>6} km  {}  {} points",
            route.id,
            route.date.format("%Y-%m-%d %H:%M"),
            route.distance_km,
            format_duration(route.duration_seconds),
            route.path.len()
        );
    }

    Ok(())
}

async fn profile(data_manager: &DataManager<FileStore>) -> anyhow::Result<()> {
    let summary = data_manager.profile_summary().await?;

    println!("Level {} ({} XP total)", summary.xp.level, summary.total_xp);
    println!("  {}/{} XP to the next level ({:.0}%)", summary.xp.xp_into_level, XP_PER_LEVEL, summary.xp.fraction * 100.);
    println!("{:.2} km over {} walks", summary.walks.total_km, summary.route_count);

    let goals: Vec<String> = WALK_GOALS_KM.iter().map(|km| format!("{km} km")).collect();
    println!("  Walk goals {}: {:.0}%", goals.join(" / "), summary.walks.fraction * 100.);

    Ok(())
}
