use aerosol_rs::config::{AnalysisConfig, BoundingBox, DEFAULT_SCAN_DIR, ExportFormat};
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Find, check and export satellite aerosol data over a bounding box
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Bounding box as west,south,east,north (defaults to Seattle)
    #[arg(long, global = true, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: Option<BoundingBox>,

    /// Extra measurement variable to look for, tried before the built-in list
    #[arg(long = "variable", global = true)]
    pub variables: Vec<String>,

    /// Log filter for developer diagnostics (RUST_LOG syntax)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search CMR for aerosol collections on the supported platforms
    Collections {
        /// Describe what each platform measures instead of searching
        #[arg(long)]
        about: bool,
    },

    /// List granules of a collection over the bounding box
    Granules {
        #[command(flatten)]
        search: SearchArgs,

        /// Don't write the raw results to aerosol_granules_<timestamp>.json
        #[arg(long)]
        no_save: bool,

        /// Directory for the saved results
        #[arg(long, default_value = ".")]
        save_dir: PathBuf,
    },

    /// Download granules of a collection and check them for placeholders
    Download {
        #[command(flatten)]
        search: SearchArgs,

        /// Granule numbers from the listing, e.g. 1,3,5 (default: all)
        #[arg(long)]
        select: Option<String>,

        /// Earthdata bearer token
        #[arg(long, env = "EARTHDATA_TOKEN", hide_env_values = true)]
        token: Option<String>,

        #[arg(long, default_value = "./data")]
        output_dir: PathBuf,
    },

    /// Check every NetCDF file in a directory for data inside the box
    Scan {
        #[arg(default_value = DEFAULT_SCAN_DIR)]
        dir: PathBuf,
    },

    /// Print dimensions, coordinates, variables and attributes of a file
    Inspect { file: PathBuf },

    /// Convert a file to another format
    Export {
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = ExportFormat::Geojson)]
        format: ExportFormat,

        /// Output path (derived from the input name when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ClapArgs, Debug)]
pub struct SearchArgs {
    /// Collection short name, as printed by `collections`
    pub short_name: String,

    /// First day, YYYY-MM-DD (default: a week before --end)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day, YYYY-MM-DD (default: today)
    #[arg(long)]
    pub end: Option<NaiveDate>,
}

fn parse_bbox(s: &str) -> Result<BoundingBox, String> {
    s.parse::<BoundingBox>().map_err(|e| e.to_string())
}

impl Args {
    pub fn analysis_config(&self) -> AnalysisConfig {
        let config = AnalysisConfig::seattle().with_preferred_variables(&self.variables);
        match self.bbox {
            Some(bbox) => config.with_bbox(bbox),
            None => config,
        }
    }
}

pub fn get_args() -> Args {
    Args::parse()
}
