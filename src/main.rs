use anyhow::{Context, Result};
use civic_triage::config::{self, EngineConfig};
use civic_triage::core::category::category_scores;
use civic_triage::core::{Category, CategoryScores, Severity};
use civic_triage::core::fingerprint::{ImageFingerprint, compute_fingerprint, hamming_distance_hex};
use civic_triage::core::geo::{Coordinate, distance_meters};
use civic_triage::services::labels::parse_labels;
use civic_triage::services::scanner::discover_images;
use civic_triage::services::triage::triage_labels;
use civic_triage::services::{
    DuplicateService, FileLabelSource, JsonlReportStore, PerceptualService, ReportSink,
    Submission, SubmissionService,
};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "civic-triage", version, about = "Duplicate detection and triage for issue reports")]
struct Cli {
    /// Engine config file (default: ~/.civic-triage/config.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Report store (default: ~/.civic-triage/reports.jsonl)
    #[arg(long, global = true, value_name = "FILE")]
    store: Option<PathBuf>,

    /// Override the co-location radius in meters
    #[arg(long, global = true, value_name = "METERS")]
    radius: Option<f64>,

    /// Override the maximum Hamming distance for similar images
    #[arg(long, global = true, value_name = "BITS")]
    hamming_threshold: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the average-hash fingerprint of an image or every image in a directory
    Fingerprint {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Hamming distance between two fingerprints
    Compare { a: String, b: String },

    /// Great-circle distance in meters between two LAT,LON points
    Distance {
        #[arg(value_parser = parse_coordinate, allow_hyphen_values = true)]
        from: Coordinate,
        #[arg(value_parser = parse_coordinate, allow_hyphen_values = true)]
        to: Coordinate,
    },

    /// Category and severity for a label file
    Classify {
        /// JSON array of labels or a vision labelAnnotations response
        #[arg(short, long, value_name = "FILE")]
        labels: PathBuf,
    },

    /// Check an image against the stored reports without saving it
    Check {
        #[arg(short, long, value_name = "FILE")]
        image: PathBuf,
        /// Report location as LAT,LON
        #[arg(long, value_name = "LAT,LON", value_parser = parse_coordinate, allow_hyphen_values = true)]
        at: Option<Coordinate>,
    },

    /// Triage a new report and save it to the store
    Submit {
        #[arg(short, long, value_name = "FILE")]
        image: PathBuf,
        /// Label file (default: `<image>.labels.json`)
        #[arg(short, long, value_name = "FILE")]
        labels: Option<PathBuf>,
        /// Report location as LAT,LON
        #[arg(long, value_name = "LAT,LON", value_parser = parse_coordinate, allow_hyphen_values = true)]
        at: Option<Coordinate>,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        phone: String,
        /// Stored image reference (default: the image path)
        #[arg(long, value_name = "REF")]
        image_ref: Option<String>,
    },

    /// Work with stored reports
    Reports {
        #[command(subcommand)]
        command: ReportsCmd,
    },
}

#[derive(Subcommand, Debug)]
enum ReportsCmd {
    /// List stored reports, newest first
    List,
}

fn parse_coordinate(value: &str) -> Result<Coordinate, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{}'", value))?;
    let latitude = lat
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad latitude '{}': {}", lat, e))?;
    let longitude = lon
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad longitude '{}': {}", lon, e))?;
    Ok(Coordinate::new(latitude, longitude))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = EngineConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(radius) = cli.radius {
        config.duplicate.location_radius_meters = radius;
    }
    if let Some(threshold) = cli.hamming_threshold {
        config.duplicate.hamming_threshold = threshold;
    }

    match cli.command {
        Commands::Fingerprint { path } => {
            if path.is_dir() {
                fingerprint_directory(&path)?;
            } else {
                let fp = PerceptualService::new()
                    .fingerprint_file(&path)
                    .await
                    .with_context(|| format!("Failed to fingerprint {}", path.display()))?;
                println!("{}", fp);
            }
        }

        Commands::Compare { a, b } => match hamming_distance_hex(&a, &b) {
            Some(distance) => println!("{}", distance),
            None => println!("incomparable"),
        },

        Commands::Distance { from, to } => {
            println!("{:.2}", distance_meters(&from, &to));
        }

        Commands::Classify { labels } => {
            let contents = fs::read_to_string(&labels)
                .with_context(|| format!("Could not open label file {:?}", labels))?;
            let annotations = parse_labels(&contents)
                .with_context(|| format!("Could not parse label file {:?}", labels))?;
            let descriptions: Vec<&str> =
                annotations.iter().map(|l| l.description.as_str()).collect();
            let scores = category_scores(&descriptions, &config.categories);
            let triage = triage_labels(annotations, &config.categories);

            #[derive(Serialize)]
            struct Classified {
                category: Category,
                severity: Severity,
                scores: CategoryScores,
            }
            print_json(&Classified {
                category: triage.category,
                severity: triage.severity,
                scores,
            })?;
        }

        Commands::Check { image, at } => {
            let store = Arc::new(JsonlReportStore::new(store_path(cli.store)?));
            let fingerprint = fingerprint_or_warn(&image)?;
            let service = DuplicateService::new(store.clone(), config.duplicate.clone());
            let verdict = service
                .check(at.as_ref(), fingerprint.as_ref())
                .await
                .with_context(|| format!("Duplicate check against {:?} failed", store.path()))?;
            print_json(&verdict)?;
        }

        Commands::Submit {
            image,
            labels,
            at,
            description,
            name,
            phone,
            image_ref,
        } => {
            let store = Arc::new(JsonlReportStore::new(store_path(cli.store)?));
            let labels = labels.unwrap_or_else(|| sidecar_labels(&image));
            let bytes =
                fs::read(&image).with_context(|| format!("Failed to read image {:?}", image))?;

            let service =
                SubmissionService::new(store, Arc::new(FileLabelSource::new(labels)), &config);
            let outcome = service
                .submit(Submission {
                    image: bytes,
                    image_ref: image_ref.unwrap_or_else(|| image.display().to_string()),
                    description,
                    location: at,
                    user_name: name,
                    phone,
                })
                .await
                .context("Submission failed")?;

            for warning in &outcome.warnings {
                eprintln!("⚠️  {}", warning);
            }
            print_json(&outcome)?;
        }

        Commands::Reports { command } => match command {
            ReportsCmd::List => {
                let store = JsonlReportStore::new(store_path(cli.store)?);
                let reports = store
                    .list_reports()
                    .await
                    .with_context(|| format!("Could not read report store {:?}", store.path()))?;

                println!("🗂️  {} report(s):", reports.len());
                for report in reports {
                    let location = report
                        .location
                        .map(|c| format!("{:.5},{:.5}", c.latitude, c.longitude))
                        .unwrap_or_else(|| "-".to_string());
                    let duplicate_of = report
                        .duplicate_of
                        .as_deref()
                        .map(|id| format!(" of {}", id))
                        .unwrap_or_default();
                    println!(
                        "[{}] {}\n     category: {} ({})\n     status: {:?}{}\n     at: {}\n",
                        report.created_at.to_rfc3339(),
                        report.id,
                        report.category,
                        report.severity,
                        report.status,
                        duplicate_of,
                        location
                    );
                }
            }
        },
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn store_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => config::default_store_path().context("No report store location"),
    }
}

fn sidecar_labels(image: &Path) -> PathBuf {
    let mut name = image.as_os_str().to_owned();
    name.push(".labels.json");
    PathBuf::from(name)
}

/// Fingerprint an image file; undecodable images only warn.
fn fingerprint_or_warn(image: &Path) -> Result<Option<ImageFingerprint>> {
    let bytes = fs::read(image).with_context(|| format!("Failed to read image {:?}", image))?;
    match compute_fingerprint(&bytes) {
        Ok(fp) => Ok(Some(fp)),
        Err(e) => {
            eprintln!("⚠️  {} has no fingerprint: {}", image.display(), e);
            Ok(None)
        }
    }
}

fn fingerprint_directory(dir: &Path) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message("Scanning for images…");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let images = discover_images(dir)?;
    spinner.finish_with_message(format!("Found {} image(s)", images.len()));

    let service = PerceptualService::new();
    let results = benchmark("fingerprinting all images", || service.fingerprint_batch(&images));

    for (path, result) in results {
        match result {
            Ok(fp) => println!("{}  {}", fp, path.display()),
            Err(e) => eprintln!("⚠️  {}: {}", path.display(), e),
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run `f()`, print how long it took (with `label`), and return its result.
fn benchmark<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    eprintln!("⏱ {} took {:.2?}", label, start.elapsed());
    result
}
