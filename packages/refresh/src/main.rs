#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the event map refresh tool.

use std::io::Write as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use event_map_analytics::{sort_buckets, write_csv};
use event_map_analytics_models::{Snapshot, SortKey};
use event_map_event_models::Domain;
use event_map_refresh::config::parse_domains;
use event_map_refresh::{RefreshConfig, Runtime};
use event_map_source::registry::all_sources;

#[derive(Parser)]
#[command(name = "event_map_refresh", about = "Geospatial event refresh tool")]
struct Cli {
    /// Config file replacing the embedded defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Recency window (e.g. "15m", "24h", "7d"); overrides the config and
    /// `EVENT_MAP_WINDOW`
    #[arg(long, global = true)]
    window: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one refresh cycle for every enabled domain and print the results
    Once {
        /// Comma-separated list of domains (overrides `EVENT_MAP_DOMAINS`)
        #[arg(long)]
        domains: Option<String>,
        /// Rows to print per domain
        #[arg(long, default_value = "10")]
        limit: usize,
        /// Print the snapshots as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Refresh on the configured interval and print each new snapshot
    /// until interrupted
    Watch {
        /// Comma-separated list of domains (overrides `EVENT_MAP_DOMAINS`)
        #[arg(long)]
        domains: Option<String>,
    },
    /// Run one cycle for a domain and write its buckets as CSV
    Export {
        /// Domain to export (hazard, sustainability, lightning)
        domain: String,
        /// Sort order: recency, severity, intensity, category, count
        #[arg(long, default_value = "recency")]
        sort: String,
        /// Output file (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List all configured data sources
    Sources,
    /// List gazetteer locations
    Gazetteer {
        /// Only show locations in this region (e.g. "Marmara")
        #[arg(long)]
        region: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let mut config = RefreshConfig::resolve(cli.config.as_deref())?;
    if let Some(window) = cli.window {
        config.window = window;
        config.validate()?;
    }

    match cli.command {
        Commands::Once {
            domains,
            limit,
            json,
        } => {
            if let Some(list) = domains {
                config.domains = parse_domains(&list)?;
            }
            let runtime = Runtime::build(config)?;
            let snapshots = runtime.run_once().await?;

            if json {
                let snapshots: Vec<&Snapshot> = snapshots.iter().map(AsRef::as_ref).collect();
                println!("{}", serde_json::to_string_pretty(&snapshots)?);
            } else {
                for snapshot in &snapshots {
                    print_snapshot(snapshot, limit);
                }
            }
        }
        Commands::Watch { domains } => {
            if let Some(list) = domains {
                config.domains = parse_domains(&list)?;
            }
            let runtime = Runtime::build(config)?;
            let handle = runtime.start();

            let mut watchers = Vec::with_capacity(runtime.config.domains.len());
            for domain in &runtime.config.domains {
                let mut updates = handle.board().store(*domain).subscribe();
                watchers.push(tokio::spawn(async move {
                    while updates.changed().await.is_ok() {
                        let latest = updates.borrow_and_update().clone();
                        if let Some(snapshot) = latest {
                            print_summary(&snapshot);
                        }
                    }
                }));
            }

            tokio::signal::ctrl_c().await?;
            log::info!("Interrupted, shutting down");
            handle.stop();
            for watcher in watchers {
                watcher.abort();
            }
        }
        Commands::Export {
            domain,
            sort,
            output,
        } => {
            let domain: Domain = domain
                .parse()
                .map_err(|_| format!("Unknown domain: {domain}"))?;
            let sort: SortKey = sort.parse().map_err(|_| format!("Unknown sort: {sort}"))?;
            config.domains = vec![domain];

            let runtime = Runtime::build(config)?;
            let snapshots = runtime.run_once().await?;
            let snapshot = snapshots
                .first()
                .ok_or_else(|| format!("No snapshot produced for {domain}"))?;

            let mut items = snapshot.items.clone();
            sort_buckets(&mut items, sort);

            match output {
                Some(path) => {
                    write_csv(std::fs::File::create(&path)?, &items)?;
                    log::info!(
                        "Wrote {} {domain} rows to {}",
                        items.len(),
                        path.display()
                    );
                }
                None => {
                    let stdout = std::io::stdout();
                    write_csv(stdout.lock(), &items)?;
                    stdout.lock().flush()?;
                }
            }
        }
        Commands::Sources => {
            let sources = all_sources();
            println!("{:<20} {:<16} NAME", "ID", "DOMAIN");
            println!("{}", "-".repeat(60));
            for source in &sources {
                println!(
                    "{:<20} {:<16} {}",
                    source.id,
                    source.domain.as_ref(),
                    source.name
                );
                println!("{:<37} {}", "", source.location());
            }
        }
        Commands::Gazetteer { region } => {
            let gazetteer = config.load_gazetteer()?;
            println!(
                "{:<16} {:>9} {:>9} {:<20} IMPORTANCE",
                "NAME", "LAT", "LON", "REGION"
            );
            println!("{}", "-".repeat(70));
            let entries = gazetteer.entries().iter().filter(|entry| {
                region
                    .as_deref()
                    .is_none_or(|region| entry.region.eq_ignore_ascii_case(region))
            });
            for entry in entries {
                println!(
                    "{:<16} {:>9.4} {:>9.4} {:<20} {}",
                    entry.name,
                    entry.lat,
                    entry.lon,
                    entry.region,
                    entry.importance.as_ref()
                );
            }
        }
    }

    Ok(())
}

fn print_summary(snapshot: &Snapshot) {
    println!(
        "{:<16} #{:<6} {:<16} fetched {:>6}  rejected {:>5}  in window {:>6}  buckets {:>5}",
        snapshot.domain.as_ref(),
        snapshot.sequence,
        snapshot.origin.as_ref(),
        snapshot.stats.fetched,
        snapshot.stats.rejected,
        snapshot.stats.in_window,
        snapshot.stats.buckets
    );
}

fn print_snapshot(snapshot: &Snapshot, limit: usize) {
    print_summary(snapshot);
    println!(
        "  {:<24} {:<20} {:>6} {:<10} LAST SEEN",
        "LOCATION", "CATEGORY", "COUNT", "TIER"
    );
    for item in snapshot.items.iter().take(limit) {
        println!(
            "  {:<24} {:<20} {:>6} {:<10} {}",
            item.bucket.location,
            item.bucket.category.as_ref(),
            item.bucket.count,
            item.tier.to_string(),
            item.bucket.last_timestamp.to_rfc3339()
        );
    }
    if snapshot.items.len() > limit {
        println!("  ... {} more", snapshot.items.len() - limit);
    }
    println!();
}
