mod db;
mod http;
mod inference;
mod output;
mod parser;
mod settings;
mod upload;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use output::Detection;
use settings::Settings;

#[derive(Parser)]
#[command(name = "detect", about = "Describe electronic objects with a vision model and extract structured data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an image, describe it with the vision model and save the extracted data
    Describe {
        /// Image file to upload (omit when --image-url is given)
        image: Option<PathBuf>,
        /// Already-hosted image URL; skips the upload
        #[arg(long, conflicts_with = "image")]
        image_url: Option<String>,
        /// Output JSON file
        #[arg(short, long, default_value = "output.json")]
        output: PathBuf,
    },
    /// Extract structured data from a saved model response ("-" reads stdin)
    Extract {
        input: PathBuf,
        /// Image URL recorded alongside the description
        #[arg(long, default_value = "")]
        image_url: String,
        /// Output JSON file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Re-extract stored descriptions that have no extraction yet
    Process {
        /// Max descriptions to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Write the stored extraction of one detection as JSON
    Export {
        id: i64,
        /// Output JSON file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show history statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Describe {
            image,
            image_url,
            output,
        } => describe(&settings, image.as_deref(), image_url, &output).await,
        Commands::Extract {
            input,
            image_url,
            output,
        } => {
            let raw = read_input(&input)?;
            let detection = Detection::new(image_url, parser::process_description(&raw));
            if detection.description.is_empty() {
                warn!("No recognized sections in {}", input.display());
            }
            write_detection(&detection, output.as_deref())
        }
        Commands::Process { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let pending = db::fetch_unprocessed(&conn, limit)?;
            if pending.is_empty() {
                println!("No unprocessed descriptions.");
                return Ok(());
            }
            println!("Processing {} descriptions...", pending.len());
            let counts = process_descriptions(&conn, &pending)?;
            counts.print();
            Ok(())
        }
        Commands::Export { id, output } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let Some(json) = db::fetch_extraction(&conn, id)? else {
                bail!("No extraction stored for detection {}. Run 'process' first.", id);
            };
            let detection: Detection =
                serde_json::from_str(&json).context("Stored extraction is not valid JSON")?;
            write_detection(&detection, output.as_deref())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Detections: {}", s.detections);
            println!("Failed:     {}", s.failed);
            println!("Extracted:  {}", s.extracted);
            println!("Empty:      {}", s.empty);
            println!("Pending:    {}", s.pending);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Upload → describe → record → extract → save.
async fn describe(
    settings: &Settings,
    image: Option<&Path>,
    image_url: Option<String>,
    output: &Path,
) -> anyhow::Result<()> {
    if image.is_none() && image_url.is_none() {
        bail!("Either an image file or --image-url is required");
    }

    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;
    let client = reqwest::Client::new();

    let mut row = db::DetectionRow {
        image_path: image.map(|p| p.display().to_string()),
        image_url,
        model: settings.model.clone(),
        raw_description: None,
        error: None,
        latency_ms: None,
    };

    let outcome = fetch_description(&client, settings, image, &mut row).await;
    let (detection_id, raw) = record_detection(&conn, &row, outcome)?;

    let image_url = row.image_url.unwrap_or_default();
    let detection = Detection::new(image_url, parser::process_description(&raw));
    save_extraction(&conn, detection_id, &detection)?;
    detection.save(output)?;

    let d = &detection.description;
    if d.is_empty() {
        warn!("The description contained no recognized sections");
    }
    println!(
        "Detection {}: '{}' ({} of 8 fields, {} components) saved to {}",
        detection_id,
        d.item_name,
        d.populated_fields(),
        d.components.len(),
        output.display()
    );
    Ok(())
}

/// Fill in the upload and inference parts of `row`, returning the raw description.
async fn fetch_description(
    client: &reqwest::Client,
    settings: &Settings,
    image: Option<&Path>,
    row: &mut db::DetectionRow,
) -> anyhow::Result<String> {
    let result = async {
        if row.image_url.is_none() {
            if let Some(path) = image {
                let client_id = settings.imgur_client_id()?;
                row.image_url = Some(upload::upload_image(client, client_id, path).await?);
            }
        }
        let url = row.image_url.clone().unwrap_or_default();
        let description = inference::describe_image(client, settings, &url).await?;
        row.latency_ms = Some(description.latency_ms);
        Ok::<_, anyhow::Error>(description.text)
    }
    .await;

    match result {
        Ok(text) => {
            row.raw_description = Some(text.clone());
            Ok(text)
        }
        Err(e) => {
            row.error = Some(format!("{:#}", e));
            Err(e)
        }
    }
}

/// Store the detection row, then hand back the description or the upstream failure.
/// When the row can't be stored either, both errors are kept in the chain.
fn record_detection(
    conn: &rusqlite::Connection,
    row: &db::DetectionRow,
    outcome: anyhow::Result<String>,
) -> anyhow::Result<(i64, String)> {
    let detection_id = match db::insert_detection(conn, row) {
        Ok(id) => id,
        Err(db_err) => {
            return Err(match outcome {
                Ok(_) => db_err,
                Err(upstream) => {
                    warn!("Detection failed: {:#}", upstream);
                    db_err.context(format!("Failed to record failed detection ({:#})", upstream))
                }
            });
        }
    };

    match outcome {
        Ok(raw) => Ok((detection_id, raw)),
        Err(e) => {
            warn!(detection_id, "Detection failed: {:#}", e);
            Err(e)
        }
    }
}

fn save_extraction(
    conn: &rusqlite::Connection,
    detection_id: i64,
    detection: &Detection,
) -> anyhow::Result<()> {
    let row = extraction_row(detection_id, detection)?;
    db::save_extractions(conn, &[row])
}

fn extraction_row(detection_id: i64, detection: &Detection) -> anyhow::Result<db::ExtractionRow> {
    Ok(db::ExtractionRow {
        detection_id,
        item_name: detection.description.item_name.clone(),
        populated_fields: detection.description.populated_fields(),
        json: serde_json::to_string(detection)?,
    })
}

struct ProcessCounts {
    descriptions: usize,
    empty: usize,
    components: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Saved {} extractions ({} empty), {} components.",
            self.descriptions, self.empty, self.components,
        );
    }
}

fn process_descriptions(
    conn: &rusqlite::Connection,
    pending: &[db::StoredDescription],
) -> anyhow::Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(pending.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut counts = ProcessCounts {
        descriptions: 0,
        empty: 0,
        components: 0,
    };

    for chunk in pending.chunks(500) {
        let detections: Vec<(i64, Detection)> = chunk
            .par_iter()
            .map(|p| {
                let description = parser::process_description(&p.raw_description);
                (p.detection_id, Detection::new(p.image_url.clone(), description))
            })
            .collect();

        let mut rows = Vec::with_capacity(detections.len());
        for (id, detection) in &detections {
            if detection.description.is_empty() {
                counts.empty += 1;
            }
            counts.components += detection.description.components.len();
            rows.push(extraction_row(*id, detection)?);
        }

        counts.descriptions += rows.len();
        db::save_extractions(conn, &rows)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    info!("Processed {} descriptions", counts.descriptions);
    Ok(counts)
}

fn read_input(input: &Path) -> anyhow::Result<String> {
    if input == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read description from stdin")?;
        Ok(raw)
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))
    }
}

fn write_detection(detection: &Detection, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => detection.save(path),
        None => {
            println!("{}", detection.to_pretty_string()?);
            Ok(())
        }
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
