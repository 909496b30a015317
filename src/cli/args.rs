use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nyc-taxi-pipeline")]
#[command(about = "Enrich NYC yellow taxi trips with zone centroids and bulk-load them into Elasticsearch")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Configuration file (TOML)")]
    pub config: Option<PathBuf>,
}

/// Zone sources, overriding the `[zones]` configuration section.
#[derive(Args, Debug, Clone, Default)]
pub struct ZoneArgs {
    #[arg(long, help = "Directory holding taxi_zone_lookup.csv and taxi_zones.geojson")]
    pub zone_dir: Option<PathBuf>,

    #[arg(long, help = "Zone lookup CSV (taxi_zone_lookup.csv)")]
    pub zone_lookup: Option<PathBuf>,

    #[arg(long, help = "Zone geometry GeoJSON")]
    pub zone_geometry: Option<PathBuf>,

    #[arg(long, help = "CRS of the geometry when the file declares none (e.g. EPSG:2263)")]
    pub source_crs: Option<String>,

    #[arg(long, help = "Join lookup rows to geometry features by position instead of location id")]
    pub positional_join: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enrich one trip file and bulk-load it into the trips index
    Ingest {
        #[arg(short, long, help = "Trip file (.parquet or .csv)")]
        input: PathBuf,

        #[command(flatten)]
        zones: ZoneArgs,

        #[arg(long, help = "Destination index [default: from configuration]")]
        index: Option<String>,

        #[arg(long, help = "Documents per bulk request [default: from configuration]")]
        chunk_size: Option<usize>,

        #[arg(long, help = "Also write the enriched batch to this Parquet file")]
        export: Option<PathBuf>,

        #[arg(long, help = "Compute trip statistics and load them into the analytics index")]
        with_analytics: bool,

        #[arg(long, help = "Load into an in-memory store instead of Elasticsearch")]
        dry_run: bool,
    },

    /// Enrich and load every monthly trip file in a directory
    IngestDir {
        #[arg(short, long, help = "Directory containing yellow_tripdata_YYYY-MM files")]
        input_dir: PathBuf,

        #[arg(long, help = "First month to load, YYYY-MM [default: 2019-01]")]
        from: Option<String>,

        #[arg(long, help = "Last month to load, YYYY-MM [default: 2024-06]")]
        to: Option<String>,

        #[command(flatten)]
        zones: ZoneArgs,

        #[arg(long, help = "Destination index [default: from configuration]")]
        index: Option<String>,

        #[arg(long, help = "Documents per bulk request [default: from configuration]")]
        chunk_size: Option<usize>,

        #[arg(long, help = "Load into an in-memory store instead of Elasticsearch")]
        dry_run: bool,
    },

    /// Enrich one trip file and write the result to Parquet without loading
    Enrich {
        #[arg(short, long, help = "Trip file (.parquet or .csv)")]
        input: PathBuf,

        #[command(flatten)]
        zones: ZoneArgs,

        #[arg(
            short,
            long,
            help = "Output Parquet file path [default: output/{input}-enriched.parquet]"
        )]
        output_file: Option<PathBuf>,

        #[arg(long, default_value = "snappy")]
        compression: String,
    },

    /// Compute trip statistics from an enriched Parquet file
    Analyze {
        #[arg(short, long, help = "Enriched Parquet file")]
        file: PathBuf,

        #[arg(
            long,
            default_value = "0",
            help = "Maximum records to analyze (0 = all records)"
        )]
        analysis_limit: usize,

        #[arg(long, help = "Load the statistics into the analytics index")]
        load: bool,

        #[arg(long, help = "Analytics index [default: from configuration]")]
        index: Option<String>,

        #[arg(long, help = "Load into an in-memory store instead of Elasticsearch")]
        dry_run: bool,
    },

    /// Resolve zone centroids and print them
    Zones {
        #[command(flatten)]
        zones: ZoneArgs,

        #[arg(short, long, default_value = "10", help = "Number of zones to print (0 = all)")]
        sample: usize,
    },
}
