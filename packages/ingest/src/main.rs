#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the district seed tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use district_seed_cli_utils::IndicatifProgress;
use district_seed_database::{boundaries_db, db, neighborhoods_db, paths};
use district_seed_ingest::{SeedConfig, SeedSummary, seed_file};
use district_seed_neighborhood::aliases::resolve_alias_table;
use district_seed_neighborhood::normalize::AliasTable;
use district_seed_neighborhood::persist::NeighborhoodStore;
use duckdb::Connection;

#[derive(Parser)]
#[command(
    name = "district_seed_ingest",
    about = "Seed neighborhood coordinates inside district boundaries"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, place, and upsert neighborhoods from a tuple dump
    Seed {
        /// Text file containing the neighborhood tuples
        #[arg(long)]
        input: PathBuf,
        /// `DuckDB` file (overrides `DISTRICT_SEED_DB`)
        #[arg(long)]
        db: Option<PathBuf>,
        /// TOML run configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load district boundaries from a CSV export
    ImportBoundaries {
        /// CSV with `region,district,center_lat,center_lng,northeast_lat,
        /// northeast_lng,southwest_lat,southwest_lng` columns
        #[arg(long)]
        csv: PathBuf,
        /// `DuckDB` file (overrides `DISTRICT_SEED_DB`)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// List regions, or the districts of one region, in the boundary lookup
    Districts {
        /// Region to list districts for (e.g., "İstanbul")
        #[arg(long)]
        region: Option<String>,
        /// `DuckDB` file (overrides `DISTRICT_SEED_DB`)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Show an alias table after upper-casing
    Aliases {
        /// Embedded table id or path to a TOML alias file
        #[arg(long, default_value = "istanbul")]
        table: String,
    },
    /// Print stored neighborhood counts per district
    Stats {
        /// Number of districts to show
        #[arg(long, default_value = "10")]
        limit: usize,
        /// `DuckDB` file (overrides `DISTRICT_SEED_DB`)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn open_db(path: Option<PathBuf>) -> Result<Connection, district_seed_database::DbError> {
    if let Some(path) = path {
        log::info!("Using database {}", path.display());
        return db::open(&path);
    }

    log::info!("Using database {}", paths::db_path().display());
    db::open_default()
}

fn print_summary(summary: &SeedSummary) {
    let report = &summary.report;

    println!("Region:             {}", summary.region);
    println!("Records extracted:  {}", summary.records);
    println!("Other regions:      {}", summary.foreign_region);
    println!("Malformed:          {}", summary.malformed);
    println!(
        "Districts:          {} ({} with boundaries)",
        summary.districts, summary.boundaries
    );
    println!();
    println!("Requested:          {}", report.requested);
    println!("Inserted:           {}", report.inserted);
    println!("Already present:    {}", report.already_present);
    println!("Skipped (district): {}", report.skipped_unmatched);
    println!("Skipped (row):      {}", report.skipped_failed);
    println!("Rows in table:      {}", report.table_rows);

    if !report.unmatched.is_empty() {
        println!();
        println!("Unmatched districts:");
        for district in &report.unmatched {
            println!("  {:<24} {}", district.district, district.count);
        }
    }

    if !report.leaderboard.is_empty() {
        println!();
        println!("{:<24} NEIGHBORHOODS", "DISTRICT");
        println!("{}", "-".repeat(40));
        for district in &report.leaderboard {
            println!("{:<24} {}", district.district, district.count);
        }
    }
}

#[allow(clippy::too_many_lines)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = district_seed_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Seed {
            input,
            db,
            config,
            json,
        } => {
            let config = SeedConfig::load(config.as_deref())?;
            let conn = open_db(db)?;
            let progress = IndicatifProgress::rows_bar(&multi, "Upserting neighborhoods");

            let summary = seed_file(&conn, &input, &config, Some(progress))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Commands::ImportBoundaries { csv, db } => {
            let conn = open_db(db)?;
            let written = boundaries_db::import_csv(&conn, &csv)?;
            log::info!("Imported {written} district boundaries");
        }
        Commands::Districts { region, db } => {
            let conn = open_db(db)?;

            if let Some(region) = region {
                let lookup = boundaries_db::load_lookup(&conn, &region)?;
                println!("{:<24} {:>10} {:>10}  BBOX", "DISTRICT", "LAT", "LNG");
                println!("{}", "-".repeat(56));
                for (name, boundary) in &lookup {
                    println!(
                        "{:<24} {:>10.5} {:>10.5}  {}",
                        name,
                        boundary.center_lat,
                        boundary.center_lng,
                        if boundary.bbox().is_some() { "yes" } else { "no" }
                    );
                }
            } else {
                println!("{:<24} DISTRICTS", "REGION");
                println!("{}", "-".repeat(40));
                for (region, count) in boundaries_db::list_regions(&conn)? {
                    println!("{region:<24} {count}");
                }
            }
        }
        Commands::Aliases { table } => {
            let def = resolve_alias_table(&table)?;
            let aliases = AliasTable::from_def(&def)?;

            println!("{} ({}): {} aliases", def.id, def.region, aliases.len());
            println!("{}", "-".repeat(50));
            for entry in aliases.entries() {
                println!("{:<24} -> {}", entry.alias, entry.canonical);
            }
        }
        Commands::Stats { limit, db } => {
            let conn = open_db(db)?;
            let total = neighborhoods_db::DuckDbStore::new(&conn).row_count()?;

            println!("{total} neighborhoods stored");
            println!();
            println!("{:<24} NEIGHBORHOODS", "DISTRICT");
            println!("{}", "-".repeat(40));
            for district in neighborhoods_db::district_counts(&conn, limit)? {
                println!("{:<24} {}", district.district, district.count);
            }
        }
    }

    Ok(())
}
