use crate::analyzers::{TripAnalyzer, TripStatistics};
use crate::cli::args::{Cli, Commands, ZoneArgs};
use crate::config::{PipelineConfig, ZoneJoin};
use crate::error::{PipelineError, Result};
use crate::models::{EnrichedTrip, StatisticDocument, ZoneTable};
use crate::processors::{EnrichmentReport, TripEnricher, ZoneResolver};
use crate::readers::TripReader;
use crate::store::{DocumentStore, ElasticsearchStore, InMemoryStore};
use crate::utils::constants::{
    DEFAULT_FIRST_MONTH, DEFAULT_LAST_MONTH, ZONE_GEOMETRY_FILE, ZONE_LOOKUP_FILE,
};
use crate::utils::filename::{default_enriched_output, discover_trip_files, TripMonth};
use crate::utils::progress::ProgressReporter;
use crate::writers::{BulkLoadOutcome, BulkLoader, ParquetWriter};
use chrono::Utc;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;
    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest {
            input,
            zones,
            index,
            chunk_size,
            export,
            with_analytics,
            dry_run,
        } => {
            apply_zone_args(&mut config, &zones);
            apply_load_args(&mut config, index, chunk_size);

            println!("Ingesting trip file: {}", input.display());
            println!("Destination index: {}", config.store.trips_index);

            let zone_table = resolve_zones(&config)?;
            let store = open_store(&config, dry_run)?;

            let (trips, report, outcome) =
                ingest_file(&input, &zone_table, &config, store.as_ref()).await?;

            println!("\n{}", report.generate_summary());
            println!("{}", outcome.summary());

            if let Some(path) = export {
                write_enriched(&trips, &path, "snappy")?;
            }

            if with_analytics {
                let stats = TripAnalyzer::new().calculate_statistics(&trips);
                let stats_outcome = load_statistics(&stats, &config, store.as_ref()).await?;
                println!("Analytics: {}", stats_outcome.summary());
            }

            if dry_run {
                let count = store.count(&config.store.trips_index).await?;
                println!("Dry run: {} documents held in memory", count);
            }
        }

        Commands::IngestDir {
            input_dir,
            from,
            to,
            zones,
            index,
            chunk_size,
            dry_run,
        } => {
            apply_zone_args(&mut config, &zones);
            apply_load_args(&mut config, index, chunk_size);

            let first: TripMonth = match from {
                Some(month) => month.parse()?,
                None => TripMonth::from_pair(DEFAULT_FIRST_MONTH)?,
            };
            let last: TripMonth = match to {
                Some(month) => month.parse()?,
                None => TripMonth::from_pair(DEFAULT_LAST_MONTH)?,
            };
            let files = discover_trip_files(&input_dir, first, last)?;

            println!(
                "Found {} trip files in {} ({} to {})",
                files.len(),
                input_dir.display(),
                first,
                last
            );
            if files.is_empty() {
                println!("No trip files to load");
                return Ok(());
            }

            let zone_table = resolve_zones(&config)?;
            let store = open_store(&config, dry_run)?;
            let progress = ProgressReporter::new(files.len() as u64, "Loading monthly trip files", false);

            let mut total = BulkLoadOutcome::default();
            let mut total_emitted = 0usize;
            let mut total_input = 0usize;

            for (month, path) in &files {
                progress.set_message(&format!("Loading {}", month));
                let (_, report, outcome) =
                    ingest_file(path, &zone_table, &config, store.as_ref()).await?;

                progress.println(&format!(
                    "{}: {} of {} trips enriched, {}",
                    month,
                    report.emitted_records,
                    report.input_records,
                    outcome.summary()
                ));

                total_input += report.input_records;
                total_emitted += report.emitted_records;
                total.succeeded += outcome.succeeded;
                total.failed += outcome.failed;
                progress.increment(1);
            }

            progress.finish_with_message("All trip files loaded");
            println!(
                "\nLoaded {} files: {} input trips, {} enriched",
                files.len(),
                total_input,
                total_emitted
            );
            println!("{}", total.summary());
        }

        Commands::Enrich {
            input,
            zones,
            output_file,
            compression,
        } => {
            apply_zone_args(&mut config, &zones);
            let output_file = output_file.unwrap_or_else(|| default_enriched_output(&input));

            println!("Enriching trip file: {}", input.display());
            println!("Output file: {}", output_file.display());

            let zone_table = resolve_zones(&config)?;
            let (trips, report) = enrich_file(&input, &zone_table, &config)?;
            println!("\n{}", report.generate_summary());

            if trips.is_empty() {
                println!("No records to write");
                return Ok(());
            }

            write_enriched(&trips, &output_file, &compression)?;
            println!("Processing complete!");
        }

        Commands::Analyze {
            file,
            analysis_limit,
            load,
            index,
            dry_run,
        } => {
            if let Some(index) = index {
                config.store.analytics_index = index;
            }

            println!("Analyzing enriched trips: {}", file.display());
            let writer = ParquetWriter::new();
            println!("\n{}", writer.get_file_info(&file)?.summary());

            let stats = TripAnalyzer::new().analyze_parquet_with_limit(&file, analysis_limit)?;
            println!("\n{}", stats.summary());

            if load {
                let store = open_store(&config, dry_run)?;
                let outcome = load_statistics(&stats, &config, store.as_ref()).await?;
                println!("\nAnalytics: {}", outcome.summary());
            }
        }

        Commands::Zones { zones, sample } => {
            apply_zone_args(&mut config, &zones);
            let zone_table = resolve_zones(&config)?;

            println!("Resolved {} zones", zone_table.len());
            let limit = if sample == 0 { zone_table.len() } else { sample };
            for zone in zone_table.sorted().into_iter().take(limit) {
                println!(
                    "  {:>3}  {:<14} {:<40} ({:.6}, {:.6})",
                    zone.location_id, zone.borough, zone.zone, zone.centroid_lat, zone.centroid_long
                );
            }
        }
    }

    Ok(())
}

/// `--verbose` forces debug; otherwise `RUST_LOG`, defaulting to info
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    // A subscriber may already be installed (tests, embedding); keep it
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            let _ = builder.with_ansi(false).with_writer(Arc::new(file)).try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }

    Ok(())
}

fn apply_zone_args(config: &mut PipelineConfig, args: &ZoneArgs) {
    // Explicit file paths below take precedence over the directory
    if let Some(dir) = &args.zone_dir {
        config.zones.lookup_path = Some(dir.join(ZONE_LOOKUP_FILE));
        config.zones.geometry_path = Some(dir.join(ZONE_GEOMETRY_FILE));
    }
    if let Some(path) = &args.zone_lookup {
        config.zones.lookup_path = Some(path.clone());
    }
    if let Some(path) = &args.zone_geometry {
        config.zones.geometry_path = Some(path.clone());
    }
    if let Some(crs) = &args.source_crs {
        config.zones.source_crs = crs.clone();
    }
    if args.positional_join {
        config.zones.join = ZoneJoin::ByPosition;
    }
}

fn apply_load_args(config: &mut PipelineConfig, index: Option<String>, chunk_size: Option<usize>) {
    if let Some(index) = index {
        config.store.trips_index = index;
    }
    if let Some(size) = chunk_size {
        config.loader.chunk_size = size.max(1);
    }
}

fn resolve_zones(config: &PipelineConfig) -> Result<ZoneTable> {
    let lookup = config.zones.lookup_path.as_deref().ok_or_else(|| {
        PipelineError::Config("Zone lookup file not set (--zone-dir, --zone-lookup or zones.lookup_path)".to_string())
    })?;
    let geometry = config.zones.geometry_path.as_deref().ok_or_else(|| {
        PipelineError::Config("Zone geometry file not set (--zone-dir, --zone-geometry or zones.geometry_path)".to_string())
    })?;

    let progress = ProgressReporter::new_spinner("Resolving zone centroids...", false);
    let table = ZoneResolver::from_config(&config.zones)?.resolve_files(lookup, geometry)?;
    progress.finish_with_message(&format!("Resolved {} zones", table.len()));

    Ok(table)
}

fn open_store(config: &PipelineConfig, dry_run: bool) -> Result<Box<dyn DocumentStore>> {
    if dry_run {
        info!("Dry run: documents go to an in-memory store");
        return Ok(Box::new(InMemoryStore::new()));
    }
    Ok(Box::new(ElasticsearchStore::new(&config.store)?))
}

fn enrich_file(path: &Path, zones: &ZoneTable, config: &PipelineConfig) -> Result<(Vec<EnrichedTrip>, EnrichmentReport)> {
    let progress = ProgressReporter::new_spinner("Reading trips...", false);
    let raw_trips = TripReader::new().read_trips(path)?;

    progress.set_message(&format!("Enriching {} trips...", raw_trips.len()));
    let (trips, report) = TripEnricher::new(&config.enrichment).enrich(&raw_trips, zones, Some(&progress));
    progress.finish_with_message(&format!("Enriched {} trips", trips.len()));

    Ok((trips, report))
}

async fn ingest_file(
    path: &Path,
    zones: &ZoneTable,
    config: &PipelineConfig,
    store: &dyn DocumentStore,
) -> Result<(Vec<EnrichedTrip>, EnrichmentReport, BulkLoadOutcome)> {
    let (trips, report) = enrich_file(path, zones, config)?;

    // The index is still ensured for an empty batch
    if trips.is_empty() {
        warn!(path = %path.display(), "No trips survived enrichment, nothing to load");
    }

    let progress = ProgressReporter::new(trips.len() as u64, "Bulk loading trips", false);
    let outcome = BulkLoader::new(store)
        .with_chunk_size(config.loader.chunk_size)
        .with_max_reported_failures(config.loader.max_reported_failures)
        .load(
            &config.store.trips_index,
            &EnrichedTrip::mapping(),
            &trips,
            Some(&progress),
        )
        .await?;
    progress.finish_with_message(&outcome.summary());

    Ok((trips, report, outcome))
}

async fn load_statistics(
    stats: &TripStatistics,
    config: &PipelineConfig,
    store: &dyn DocumentStore,
) -> Result<BulkLoadOutcome> {
    let documents = stats.to_documents(Utc::now());

    BulkLoader::new(store)
        .with_chunk_size(config.loader.chunk_size)
        .load(
            &config.store.analytics_index,
            &StatisticDocument::mapping(),
            &documents,
            None,
        )
        .await
}

fn write_enriched(trips: &[EnrichedTrip], path: &Path, compression: &str) -> Result<()> {
    println!("Writing {} enriched trips to {}", trips.len(), path.display());
    let writer = ParquetWriter::new().with_compression(compression)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    writer.write_trips(trips, path)?;
    println!("\n{}", writer.get_file_info(path)?.summary());
    Ok(())
}
