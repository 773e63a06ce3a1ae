//! Authenticated granule download followed by a placeholder check.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use tracing::{info, warn};

use crate::cmr::GranuleSummary;
use crate::config::TimeDecoding;
use crate::io::netcdf::open_dataset;

/// Picks granules by 1-based index from a `1,3,5` list. Numbers outside the
/// listing are ignored; `None` selects everything.
pub fn select_granules<'a>(
    granules: &'a [GranuleSummary],
    selection: Option<&str>,
) -> Result<Vec<&'a GranuleSummary>> {
    let Some(selection) = selection else {
        return Ok(granules.iter().collect());
    };
    let mut picked = Vec::new();
    for part in selection.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let n: usize = part
            .parse()
            .with_context(|| format!("invalid granule number '{}'", part))?;
        match granules.iter().find(|g| g.index == n) {
            Some(g) => picked.push(g),
            None => warn!(index = n, "no granule with this number, skipped"),
        }
    }
    Ok(picked)
}

/// Last path segment of a URL, without query string.
pub fn filename_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    path.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Streams one file into `output_dir` with a bearer token.
pub fn download_file(client: &Client, url: &str, token: &str, output_dir: &Path) -> Result<PathBuf> {
    let name = filename_from_url(url).with_context(|| format!("no file name in {}", url))?;
    let path = output_dir.join(&name);

    let response = client
        .get(url)
        .bearer_auth(token)
        .send()
        .with_context(|| format!("request to {} failed", url))?
        .error_for_status()?;

    let pb = match response.content_length() {
        Some(len) => ProgressBar::new(len),
        None => ProgressBar::new_spinner(),
    };
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(name.clone());

    let mut reader = pb.wrap_read(response);
    let bytes = stream_to_file(&mut reader, &path);
    pb.finish_and_clear();
    let bytes = bytes.with_context(|| format!("download of {} failed", url))?;

    info!(path = %path.display(), bytes, "downloaded");
    Ok(path)
}

/// Copies `reader` into a new file at `path`. A partial file is removed when
/// the copy fails, so it never shows up in a later scan.
fn stream_to_file<R: Read>(reader: &mut R, path: &Path) -> Result<u64> {
    let file = File::create(path).with_context(|| format!("could not create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let copied = std::io::copy(reader, &mut writer).and_then(|bytes| {
        writer.flush()?;
        Ok(bytes)
    });
    drop(writer);
    match copied {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            if let Err(rm) = fs::remove_file(path) {
                warn!(path = %path.display(), error = %rm, "could not remove partial download");
            }
            Err(e).with_context(|| format!("could not write {}", path.display()))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadCheck {
    /// Data variable names with their shapes.
    Valid(Vec<(String, Vec<usize>)>),
    /// Opened fine but has no data variables.
    Placeholder,
    Unreadable(String),
}

/// Opens a downloaded file and checks it has at least one data variable.
pub fn check_file_contents(path: &Path) -> DownloadCheck {
    match open_dataset(path, TimeDecoding::Raw) {
        Ok(ds) if ds.variables.is_empty() => DownloadCheck::Placeholder,
        Ok(ds) => DownloadCheck::Valid(
            ds.variables
                .iter()
                .map(|(n, v)| (n.clone(), v.shape.clone()))
                .collect(),
        ),
        Err(e) => DownloadCheck::Unreadable(e.to_string()),
    }
}

#[derive(Debug, Default)]
pub struct DownloadSummary {
    pub valid: Vec<PathBuf>,
    pub empty: Vec<PathBuf>,
    pub failed: Vec<(String, String)>,
}

impl DownloadSummary {
    pub fn print(&self) {
        println!("\n{}", "=".repeat(80));
        println!("DOWNLOAD SUMMARY:");
        println!("{}", "=".repeat(80));
        println!("Valid files with data: {}", self.valid.len());
        println!("Empty/placeholder files: {}", self.empty.len());
        if !self.failed.is_empty() {
            println!("Failed downloads: {}", self.failed.len());
        }
        if !self.valid.is_empty() {
            println!("\nValid files:");
            for f in &self.valid {
                println!("  - {}", f.display());
            }
        }
        if !self.empty.is_empty() {
            println!("\nEmpty files (you may want to delete these):");
            for f in &self.empty {
                println!("  - {}", f.display());
            }
        }
        for (title, err) in &self.failed {
            println!("  x {}: {}", title, err);
        }
    }
}

/// Downloads every selected granule that has a data link, then checks each file.
pub fn download_granules(
    client: &Client,
    granules: &[&GranuleSummary],
    token: &str,
    output_dir: &Path,
) -> Result<DownloadSummary> {
    if token.trim().is_empty() {
        bail!("an Earthdata token is required to download (use --token or EARTHDATA_TOKEN)");
    }
    fs::create_dir_all(output_dir)
        .with_context(|| format!("could not create {}", output_dir.display()))?;

    println!(
        "\nDownloading {} granule(s) to {}...",
        granules.len(),
        output_dir.display()
    );
    let mut summary = DownloadSummary::default();

    for g in granules {
        let Some(url) = &g.download_url else {
            println!("  - {}: no download link, skipped", g.title);
            continue;
        };
        match download_file(client, url, token, output_dir) {
            Ok(path) => {
                println!("\nChecking file contents: {}", g.title);
                match check_file_contents(&path) {
                    DownloadCheck::Valid(vars) => {
                        println!("  Variables found: {}", vars.len());
                        for (name, shape) in vars.iter().take(5) {
                            println!("    - {}: {:?}", name, shape);
                        }
                        summary.valid.push(path);
                    }
                    DownloadCheck::Placeholder => {
                        println!("  WARNING: File has no data variables (likely placeholder/empty)");
                        summary.empty.push(path);
                    }
                    DownloadCheck::Unreadable(e) => {
                        println!("  Error reading file: {}", e);
                        summary.empty.push(path);
                    }
                }
            }
            Err(e) => {
                warn!(url = %url, error = %e, "download failed");
                summary.failed.push((g.title.clone(), format!("{:#}", e)));
            }
        }
    }

    Ok(summary)
}
