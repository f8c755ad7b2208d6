use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ordo_sync::{
    config::Config,
    pipeline::{MatchReport, Pipeline},
    remote::{PresentationApi, RemoteClient},
};

#[derive(Parser)]
#[command(name = "ordo-sync")]
#[command(version = "0.1.0")]
#[command(about = "Turn an order-of-service document into an assembled playlist")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Presentation controller host
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Presentation controller port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check connectivity to the presentation controller
    Status,
    /// Segment an extracted document and print the sections
    Segment {
        /// Path to the extracted service-order text
        file: String,
    },
    /// Segment and match against the controller's content pools
    Match {
        /// Path to the extracted service-order text
        file: String,
    },
    /// Segment, match and patch the target playlist
    Apply {
        /// Path to the extracted service-order text
        file: String,
        /// Print the reconciled item array instead of writing it
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("ordo_sync={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ordo-sync v{}", env!("CARGO_PKG_VERSION"));

    std::env::set_var("CONFIG_FILE", &cli.config);
    let mut config = Config::load()?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.remote.host = host;
    }
    if let Some(port) = cli.port {
        config.remote.port = port;
    }

    let api: Arc<dyn PresentationApi> =
        Arc::new(RemoteClient::new(&config.remote, config.pools.clone())?);

    match cli.command {
        Command::Status => {
            let label = api.check_connection().await?;
            let playlists = api.list_playlists().await?;
            println!("Connected: {}", label);
            println!("Playlists:");
            for playlist in playlists {
                println!("  {} ({})", playlist.name, playlist.id);
            }
        }
        Command::Segment { file } => {
            let pipeline = Pipeline::new(api, config)?;
            let outcome = pipeline.segment_document(&read_document(&file)?);
            if let Some(tag) = &outcome.special_service_type {
                println!("Special service: {}", tag);
            }
            for section in &outcome.sections {
                println!(
                    "{:>2}. [{:?}] {} (slot: {})",
                    section.position, section.section_type, section.title, section.slot
                );
            }
        }
        Command::Match { file } => {
            let pipeline = Pipeline::new(api, config)?;
            let outcome = pipeline.segment_document(&read_document(&file)?);
            let report = pipeline.run_matching(&outcome).await?;
            print_report(&report);
        }
        Command::Apply { file, dry_run } => {
            let pipeline = Pipeline::new(api, config)?;
            let outcome = pipeline.segment_document(&read_document(&file)?);
            let report = pipeline.run_matching(&outcome).await?;
            print_report(&report);

            if report.review_count() > 0 {
                warn!(
                    "{} section(s) unresolved; their playlist sections will be left untouched",
                    report.review_count()
                );
            }

            let items = pipeline.apply(&report, dry_run).await?;
            if dry_run {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                println!("Playlist updated ({} items)", items.len());
            }
        }
    }

    Ok(())
}

fn read_document(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read document: {}", path))
}

fn print_report(report: &MatchReport) {
    for result in &report.results {
        match (&result.selected, &result.best_match) {
            (Some(selected), Some(best)) => println!(
                "  '{}' -> '{}' ({:.0}%)",
                result.source_title,
                selected.display_name,
                best.confidence * 100.0
            ),
            (None, Some(best)) => println!(
                "  '{}' ~ '{}' ({:.0}%) NEEDS REVIEW",
                result.source_title,
                best.presentation.display_name,
                best.confidence * 100.0
            ),
            _ => println!("  '{}' NOT FOUND", result.source_title),
        }
    }
    for fallback in &report.fallbacks {
        println!("  lookup: {}", fallback.search_url);
    }
}
