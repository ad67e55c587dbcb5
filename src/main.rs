use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pg_finder::page::{parse_listings, FilterConfig, ListingElement};
use pg_finder::pins::{source_for, Criteria, WILDCARD};
use pg_finder::storage::JsonFileStore;
use pg_finder::{Config, Scheduling, Site};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Pin and rotate the listings of a PG finder page
#[derive(Parser)]
#[command(name = "pg-finder", version)]
struct Cli {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listing page (HTML)
    #[arg(long)]
    page: Option<PathBuf>,

    /// Pin resource: file path or http(s) URL
    #[arg(long)]
    pins: Option<String>,

    /// Directory used for pin backups and rotation history
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Default)]
struct CriteriaArgs {
    #[arg(long)]
    room_type: Option<String>,
    #[arg(long)]
    price_range: Option<String>,
    #[arg(long)]
    area: Option<String>,
    /// Required feature, repeatable
    #[arg(long = "feature")]
    features: Vec<String>,
    #[arg(long)]
    badge: Option<String>,
}

impl From<CriteriaArgs> for Criteria {
    fn from(args: CriteriaArgs) -> Self {
        Criteria {
            room_type: args.room_type,
            price_range: args.price_range,
            area: args.area,
            features: args.features,
            badge: args.badge,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Show the display order after pins and rotation
    Order,
    /// Pin one listing by identity
    Pin {
        identity: String,
        #[arg(long)]
        priority: Option<i64>,
        /// Write the pin set back to the pin resource
        #[arg(long)]
        write: bool,
    },
    /// Unpin one listing by identity
    Unpin {
        identity: String,
        #[arg(long)]
        write: bool,
    },
    /// Pin every listing matching the criteria
    PinBy {
        #[command(flatten)]
        criteria: CriteriaArgs,
        #[arg(long)]
        write: bool,
    },
    /// Unpin criteria-created pins matching the criteria
    UnpinBy {
        #[command(flatten)]
        criteria: CriteriaArgs,
        #[arg(long)]
        write: bool,
    },
    /// Remove every pin
    Clear {
        #[arg(long)]
        write: bool,
    },
    /// Pin counts by room type and area
    Stats,
    /// Force a rotation pass
    Rotate,
    /// Rotation status
    Status,
    /// List every listing identity
    Ids,
    /// Apply the area / room type / price filters
    Filter {
        #[arg(long, default_value = WILDCARD)]
        area: String,
        #[arg(long, default_value = WILDCARD)]
        room_type: String,
        #[arg(long, default_value = WILDCARD)]
        price_range: String,
    },
    /// Keep rotating in the background until Ctrl-C
    Watch,
}

fn print_order(elements: &[ListingElement]) {
    for (i, element) in elements.iter().enumerate() {
        let mut markers = Vec::new();
        if element.pin_indicator {
            markers.push("📌 Pinned".to_string());
        }
        if let Some(badge) = &element.rotation_badge {
            markers.push(format!("#{} {}", badge.rank, badge.label));
        }
        if !element.visible {
            markers.push("hidden".to_string());
        }

        println!("{:>3}. {}", i + 1, element.listing.title);
        println!("     ID: {}", element.listing.identity());
        if !markers.is_empty() {
            println!("     {}", markers.join(" · "));
        }
    }
}

async fn write_pins(site: &Site, location: &str) -> Result<()> {
    if location.starts_with("http://") || location.starts_with("https://") {
        warn!("Pin resource {} is remote, not writing", location);
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&site.pin_document())?;
    tokio::fs::write(location, json)
        .await
        .with_context(|| format!("Failed to write pin resource {location}"))?;
    info!("💾 Saved pin set to {}", location);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = Config::load(cli.config.as_deref()).await?;
    if let Some(page) = cli.page {
        config.page = page;
    }
    if let Some(pins) = cli.pins {
        config.pins_resource = pins;
    }
    if let Some(dir) = cli.storage_dir {
        config.storage_dir = dir;
    }

    info!("🏠 PG Finder - listing ordering");

    let html = tokio::fs::read_to_string(&config.page)
        .await
        .with_context(|| format!("Failed to read page {}", config.page.display()))?;
    let listings = parse_listings(&html).context("Failed to parse listing page")?;

    let source = source_for(&config.pins_resource)?;
    let storage = Arc::new(JsonFileStore::new(&config.storage_dir));

    let scheduling = match cli.command {
        Command::Watch => Scheduling::Background,
        _ => Scheduling::Manual,
    };
    let site = Site::start(&config, listings, source, storage, scheduling).await;

    let mut write = false;
    match cli.command {
        Command::Order => {}
        Command::Pin {
            identity,
            priority,
            write: w,
        } => {
            let pinned = site.pin(&identity, priority);
            println!("Pinned {}: {}", identity, pinned);
            write = w && pinned;
        }
        Command::Unpin { identity, write: w } => {
            let unpinned = site.unpin(&identity);
            println!("Unpinned {}: {}", identity, unpinned);
            write = w && unpinned;
        }
        Command::PinBy { criteria, write: w } => {
            let count = site.pin_by_criteria(&criteria.into());
            println!("Pinned {} listings", count);
            write = w;
        }
        Command::UnpinBy { criteria, write: w } => {
            let count = site.unpin_by_criteria(&criteria.into());
            println!("Unpinned {} listings", count);
            write = w;
        }
        Command::Clear { write: w } => {
            site.clear_all();
            write = w;
        }
        Command::Stats => {
            println!("{}", serde_json::to_string_pretty(&site.stats())?);
            return Ok(());
        }
        Command::Rotate => match site.force_rotation() {
            Some(outcome) => println!("Featured {} of {} eligible listings", outcome.picks.len(), outcome.eligible),
            None => println!("Not enough listings to rotate"),
        },
        Command::Status => {
            let status = site.rotation_status();
            println!("{}", serde_json::to_string_pretty(&status)?);
            if let Some(at) = status.last_rotation_at() {
                println!("Last rotation: {}", at.to_rfc3339());
            }
            return Ok(());
        }
        Command::Ids => {
            for (identity, room_type) in site.debug_identities() {
                println!("- {} ({})", identity, room_type);
            }
            return Ok(());
        }
        Command::Filter {
            area,
            room_type,
            price_range,
        } => {
            let filter = FilterConfig {
                area,
                room_type,
                price_range,
            };
            site.apply_filters(&filter);
        }
        Command::Watch => {
            watch(&site).await?;
            site.shutdown().await;
            return Ok(());
        }
    }

    if write {
        write_pins(&site, &config.pins_resource).await?;
    }

    print_order(&site.snapshot());
    Ok(())
}

/// Print the order every time a rotation pass lands, until Ctrl-C
async fn watch(site: &Site) -> Result<()> {
    let mut last_count = None;
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Stopping");
                return Ok(());
            }
            _ = ticker.tick() => {
                let count = site.rotation_status().rotation_count;
                if last_count != Some(count) {
                    last_count = Some(count);
                    println!("\n🔄 Rotation #{}", count);
                    print_order(&site.snapshot());
                }
            }
        }
    }
}
