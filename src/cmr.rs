//! NASA CMR search for aerosol collections and granules over the box.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::{BoundingBox, CMR_COLLECTIONS_URL, CMR_GRANULES_URL, CMR_PLATFORM_QUERIES};

pub const DATA_LINK_REL: &str = "http://esipfed.org/ns/fedsearch/1.1/data#";
const COLLECTION_PAGE_SIZE: u32 = 50;
const GRANULE_PAGE_SIZE: u32 = 100;
const DEFAULT_WINDOW_DAYS: i64 = 7;

/// CMR JSON response envelope: `{"feed": {"entry": [...]}}`.
// Path defaults keep serde from requiring `T: Default`.
#[derive(Debug, Deserialize)]
pub struct FeedResponse<T> {
    #[serde(default = "empty_feed")]
    pub feed: Feed<T>,
}

#[derive(Debug, Deserialize)]
pub struct Feed<T> {
    #[serde(default = "Vec::new")]
    pub entry: Vec<T>,
}

fn empty_feed<T>() -> Feed<T> {
    Feed { entry: Vec::new() }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Collection {
    pub short_name: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    /// Platform label of the query that found this entry.
    #[serde(default, skip_deserializing)]
    pub platform: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    pub rel: Option<String>,
    pub href: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One granule entry. Unknown fields are kept so saved results match what
/// CMR returned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Granule {
    pub id: Option<String>,
    pub title: Option<String>,
    pub time_start: Option<String>,
    pub granule_size: Option<Value>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Granule {
    /// `granule_size` in MB; CMR sends it as a string.
    pub fn size_mb(&self) -> Option<f64> {
        match self.granule_size.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn data_link(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel.as_deref() == Some(DATA_LINK_REL))
            .and_then(|l| l.href.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GranuleSummary {
    /// 1-based position in the listing.
    pub index: usize,
    pub title: String,
    pub id: String,
    pub time: String,
    pub size_mb: Option<f64>,
    pub download_url: Option<String>,
}

pub fn summarize(granules: &[Granule]) -> Vec<GranuleSummary> {
    granules
        .iter()
        .enumerate()
        .map(|(i, g)| GranuleSummary {
            index: i + 1,
            title: g.title.clone().unwrap_or_else(|| "No title".to_string()),
            id: g.id.clone().unwrap_or_else(|| "N/A".to_string()),
            time: g.time_start.clone().unwrap_or_else(|| "N/A".to_string()),
            size_mb: g.size_mb(),
            download_url: g.data_link().map(str::to_string),
        })
        .collect()
}

/// Inclusive day range for the granule search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TemporalRange {
    /// Missing end defaults to `today`, missing start to a week before end.
    pub fn resolve(start: Option<NaiveDate>, end: Option<NaiveDate>, today: NaiveDate) -> Self {
        let end = end.unwrap_or(today);
        let start = start.unwrap_or(end - chrono::Duration::days(DEFAULT_WINDOW_DAYS));
        TemporalRange { start, end }
    }

    pub fn to_cmr_param(&self) -> String {
        format!(
            "{},{}",
            self.start.format("%Y-%m-%dT00:00:00Z"),
            self.end.format("%Y-%m-%dT23:59:59Z")
        )
    }
}

pub fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(600))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")
}

fn fetch_feed<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    params: &[(&str, String)],
) -> Result<Vec<T>> {
    let response = client
        .get(url)
        .query(params)
        .send()
        .with_context(|| format!("request to {} failed", url))?
        .error_for_status()?;
    let body: FeedResponse<T> = response.json().context("invalid CMR response")?;
    Ok(body.feed.entry)
}

/// Keeps the first entry for every `short_name`; entries without one are dropped.
pub fn dedupe_by_short_name(collections: Vec<Collection>) -> Vec<Collection> {
    let mut seen = std::collections::HashSet::new();
    collections
        .into_iter()
        .filter(|c| match &c.short_name {
            Some(name) => seen.insert(name.clone()),
            None => false,
        })
        .collect()
}

/// Runs one keyword query per platform. A failing platform is reported and
/// skipped.
pub fn search_collections(client: &Client) -> Vec<Collection> {
    println!("Searching multiple satellite platforms...");
    let mut all = Vec::new();

    for (keyword, platform) in CMR_PLATFORM_QUERIES {
        let params = [
            ("keyword", keyword.to_string()),
            ("page_size", COLLECTION_PAGE_SIZE.to_string()),
        ];
        match fetch_feed::<Collection>(client, CMR_COLLECTIONS_URL, &params) {
            Ok(found) if found.is_empty() => println!("  - No collections for {}", platform),
            Ok(mut found) => {
                println!("  Found {} collection(s) for {}", found.len(), platform);
                for c in found.iter_mut() {
                    c.platform = platform.to_string();
                }
                all.extend(found);
            }
            Err(e) => println!("  Error searching {}: {:#}", platform, e),
        }
    }

    let unique = dedupe_by_short_name(all);
    println!("\n{}", "=".repeat(80));
    println!("Found {} unique aerosol collections", unique.len());
    println!("{}", "=".repeat(80));
    unique
}

/// What each searched platform is good for, shown by `collections --about`.
pub struct PlatformInfo {
    pub name: &'static str,
    pub years: &'static str,
    pub measures: &'static [&'static str],
    pub best_for: &'static str,
}

pub const PLATFORMS: &[PlatformInfo] = &[
    PlatformInfo {
        name: "PACE / OCI",
        years: "2024-present",
        measures: &[
            "Particulate matter (PM2.5, PM10)",
            "Aerosol types, pointing at traffic, industry or fire sources",
            "Smoke and haze detection",
        ],
        best_for: "detailed pollution source identification",
    },
    PlatformInfo {
        name: "NOAA-21 VIIRS",
        years: "2022-present",
        measures: &[
            "Aerosol optical depth (AOD)",
            "Fine particulate matter estimates",
            "Wildfire smoke detection",
        ],
        best_for: "current operational air quality data",
    },
    PlatformInfo {
        name: "NOAA-20 and Suomi NPP VIIRS",
        years: "2017 and 2011-present",
        measures: &["Same products as NOAA-21 with a longer record"],
        best_for: "long-term pollution trends",
    },
];

pub fn platform_overview() -> String {
    let rule = "=".repeat(80);
    let mut lines = vec![
        rule.clone(),
        "AEROSOL PLATFORMS SEARCHED BY `collections`".to_string(),
        rule.clone(),
    ];
    for p in PLATFORMS {
        lines.push(format!("\n{} ({})", p.name, p.years));
        lines.extend(p.measures.iter().map(|m| format!("  - {}", m)));
        lines.push(format!("  Best for: {}", p.best_for));
    }
    lines.push(
        "\nUrban heat maps need thermal infrared data (Landsat 8/9 TIRS, ECOSTRESS, MODIS, ASTER),"
            .to_string(),
    );
    lines.push("which these aerosol searches do not cover.".to_string());
    lines.push(rule);
    lines.join("\n")
}

pub fn print_collections(collections: &[Collection]) {
    for (i, c) in collections.iter().enumerate() {
        let summary: String = c
            .summary
            .as_deref()
            .unwrap_or("No description")
            .chars()
            .take(100)
            .collect();
        println!(
            "\n{}. [{}] {}",
            i + 1,
            c.platform,
            c.title.as_deref().unwrap_or("No title")
        );
        println!("   Short Name: {}", c.short_name.as_deref().unwrap_or("N/A"));
        println!("   Description: {}...", summary);
    }
}

pub fn search_granules(
    client: &Client,
    short_name: &str,
    bbox: &BoundingBox,
    temporal: &TemporalRange,
) -> Result<Vec<Granule>> {
    println!("\nSearching for granules over {}...", bbox);
    println!("Date range: {} to {}", temporal.start, temporal.end);
    println!("Bounding box: {}", bbox.to_cmr_param());

    let params = [
        ("short_name", short_name.to_string()),
        ("bounding_box", bbox.to_cmr_param()),
        ("temporal", temporal.to_cmr_param()),
        ("page_size", GRANULE_PAGE_SIZE.to_string()),
    ];
    debug!(?params, "granule search");
    let granules = fetch_feed::<Granule>(client, CMR_GRANULES_URL, &params)
        .with_context(|| format!("granule search for {} failed", short_name))?;
    println!("\nFound {} granules", granules.len());
    Ok(granules)
}

pub fn print_granules(summaries: &[GranuleSummary]) {
    if summaries.is_empty() {
        println!("\nNo granules found for this search.");
        return;
    }
    println!("\n{}", "=".repeat(80));
    println!("AVAILABLE DATA GRANULES:");
    println!("{}", "=".repeat(80));
    for g in summaries {
        println!("\n{}. {}", g.index, g.title);
        println!("   Time: {}", g.time);
        println!("   Granule ID: {}", g.id);
        if let Some(mb) = g.size_mb {
            println!("   Size: {:.2} MB", mb);
        }
        if let Some(url) = &g.download_url {
            println!("   Download URL: {}", url);
        }
    }
}

/// Writes the raw entries to `aerosol_granules_<timestamp>.json` in `dir`.
pub fn save_granules(granules: &[Granule], dir: &Path) -> Result<PathBuf> {
    let name = format!(
        "aerosol_granules_{}.json",
        Local::now().format("%Y%m%d_%H%M%S")
    );
    let path = dir.join(name);
    let file = File::create(&path)
        .with_context(|| format!("could not create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), granules)?;
    info!(path = %path.display(), count = granules.len(), "saved granule results");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_platform_overview_lists_every_platform() {
        let text = platform_overview();
        for p in PLATFORMS {
            assert!(text.contains(p.name));
            assert!(text.contains(p.best_for));
        }
        assert!(text.contains("thermal infrared"));
    }

    fn granule_feed() -> Value {
        json!({
            "feed": {
                "entry": [
                    {
                        "id": "G123-OB_CLOUD",
                        "title": "PACE_OCI.20250702.L3m.DAY.AER_UAA.V3_0.0p1deg.nc",
                        "time_start": "2025-07-02T00:00:00.000Z",
                        "granule_size": "12.5",
                        "producer_granule_id": "PACE_OCI.20250702",
                        "links": [
                            {"rel": "http://esipfed.org/ns/fedsearch/1.1/browse#", "href": "https://x/browse.png"},
                            {"rel": "http://esipfed.org/ns/fedsearch/1.1/data#", "href": "https://x/data.nc", "title": "Download"}
                        ]
                    },
                    { "id": "G456" }
                ]
            }
        })
    }

    #[test]
    fn test_parse_granule_feed() {
        let feed: FeedResponse<Granule> = serde_json::from_value(granule_feed()).unwrap();
        let summaries = summarize(&feed.feed.entry);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].index, 1);
        assert_eq!(summaries[0].size_mb, Some(12.5));
        assert_eq!(summaries[0].download_url.as_deref(), Some("https://x/data.nc"));
        assert_eq!(summaries[1].title, "No title");
        assert_eq!(summaries[1].download_url, None);
    }

    #[test]
    fn test_unknown_fields_survive_save() {
        let feed: FeedResponse<Granule> = serde_json::from_value(granule_feed()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = save_granules(&feed.feed.entry, dir.path()).unwrap();
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("aerosol_granules_")
        );
        let saved: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved[0]["producer_granule_id"], "PACE_OCI.20250702");
        assert_eq!(saved[0]["links"][1]["title"], "Download");
    }

    #[test]
    fn test_missing_feed_is_empty() {
        let feed: FeedResponse<Collection> = serde_json::from_value(json!({})).unwrap();
        assert!(feed.feed.entry.is_empty());
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let c = |name: Option<&str>, platform: &str| Collection {
            short_name: name.map(str::to_string),
            title: None,
            summary: None,
            platform: platform.to_string(),
        };
        let unique = dedupe_by_short_name(vec![
            c(Some("AER_UAA"), "PACE / OCI"),
            c(Some("AERDB_L2"), "NOAA-21 VIIRS"),
            c(Some("AER_UAA"), "NOAA-20 VIIRS"),
            c(None, "Suomi NPP VIIRS"),
        ]);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].platform, "PACE / OCI");
    }

    #[test]
    fn test_temporal_defaults() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 9).unwrap();
        let range = TemporalRange::resolve(None, None, today);
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2025, 7, 2).unwrap());
        assert_eq!(
            range.to_cmr_param(),
            "2025-07-02T00:00:00Z,2025-07-09T23:59:59Z"
        );

        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let range = TemporalRange::resolve(Some(start), None, today);
        assert_eq!(range.start, start);
        assert_eq!(range.end, today);
    }
}
