use aerosol_rs::cmr::{self, TemporalRange};
use aerosol_rs::config::{AnalysisConfig, TimeDecoding};
use aerosol_rs::download;
use aerosol_rs::export::{run_export, ExportOutcome, ExportRequest};
use aerosol_rs::inspect;
use aerosol_rs::io::netcdf::open_dataset;
use aerosol_rs::scan::{print_summary, scan_directory};
use anyhow::{bail, Context, Result};
use chrono::Local;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{get_args, Command, SearchArgs};

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = get_args();
    init_logging(&args.log_level);
    let config = args.analysis_config();

    match args.command {
        Command::Collections { about: true } => {
            println!("{}", cmr::platform_overview());
            Ok(())
        }
        Command::Collections { about: false } => run_collections(),
        Command::Granules {
            search,
            no_save,
            save_dir,
        } => {
            let granules = find_granules(&search, &config)?;
            if !no_save && !granules.is_empty() {
                let path = cmr::save_granules(&granules, &save_dir)?;
                println!("\nFull results saved to: {}", path.display());
            }
            Ok(())
        }
        Command::Download {
            search,
            select,
            token,
            output_dir,
        } => {
            let Some(token) = token else {
                bail!("downloading needs an Earthdata token: pass --token or set EARTHDATA_TOKEN");
            };
            let granules = find_granules(&search, &config)?;
            let summaries = cmr::summarize(&granules);
            let selected = download::select_granules(&summaries, select.as_deref())?;
            if selected.is_empty() {
                println!("No granules selected.");
                return Ok(());
            }
            let client = cmr::http_client()?;
            let summary = download::download_granules(&client, &selected, &token, &output_dir)?;
            summary.print();
            Ok(())
        }
        Command::Scan { dir } => {
            println!("Scanning directory: {}", dir.display());
            println!("Target area: {}", config.bbox);
            match scan_directory(&dir, &config) {
                Some(summary) => print_summary(&summary),
                None => println!("Error: Directory not found at {}", dir.display()),
            }
            Ok(())
        }
        Command::Inspect { file } => {
            if !file.exists() {
                bail!("file not found at {}", file.display());
            }
            let dataset = open_dataset(&file, TimeDecoding::Raw)
                .with_context(|| format!("Error reading file {}", file.display()))?;
            print!("{}", inspect::report(&dataset, &file));
            Ok(())
        }
        Command::Export {
            file,
            format,
            output,
        } => {
            let request = ExportRequest {
                input: file,
                format,
                output,
                variable: args.variables.first().cloned(),
            };
            run_export_command(&request, &config)
        }
    }
}

fn run_collections() -> Result<()> {
    let client = cmr::http_client()?;
    let collections = cmr::search_collections(&client);
    if collections.is_empty() {
        println!("\nNo collections found. Try searching manually at:");
        println!("https://search.earthdata.nasa.gov/search?q=NOAA-21%20VIIRS%20aerosol");
        return Ok(());
    }
    cmr::print_collections(&collections);
    Ok(())
}

fn find_granules(search: &SearchArgs, config: &AnalysisConfig) -> Result<Vec<cmr::Granule>> {
    let temporal = TemporalRange::resolve(search.start, search.end, Local::now().date_naive());
    if temporal.start > temporal.end {
        bail!("start date {} is after end date {}", temporal.start, temporal.end);
    }
    let client = cmr::http_client()?;
    let granules = cmr::search_granules(&client, &search.short_name, &config.bbox, &temporal)?;
    cmr::print_granules(&cmr::summarize(&granules));
    Ok(granules)
}

fn run_export_command(request: &ExportRequest, config: &AnalysisConfig) -> Result<()> {
    println!("Exporting {} as {:?}...", request.input.display(), request.format);
    let outcome = run_export(request, config)
        .with_context(|| format!("export of {} failed", request.input.display()))?;
    match outcome {
        ExportOutcome::Written { path, records } => {
            println!("{}", "-".repeat(60));
            println!("Success! Output saved to: {}", path.display());
            println!("   Records written: {}", records);
            println!("{}", "-".repeat(60));
        }
        ExportOutcome::NoData { status } => {
            println!("No file written: {}", status.reason());
        }
    }
    Ok(())
}
