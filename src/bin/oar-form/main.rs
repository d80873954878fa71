//! oar-form command line tool
//!
//! Segments scanned form pages into field crops, detects checked boxes and
//! calibrates the segmentation and cleaning parameters.
//!
//! # Usage
//!
//! ```bash
//! oar-form segment --image page.png --output-dir crops/
//! oar-form checkboxes --image page.png --output-dir boxes/ --marker right
//! oar-form calibrate-fields --image page.png --ground-truth page.csv --progress
//! oar-form calibrate-cleaner --samples fields/ --references transcripts/
//! oar-form extract --image page.png --work-dir work/
//! ```
//!
//! Every command reads an optional JSON configuration (`--config` or
//! `OAR_FORM_CONFIG`) and prints its result as JSON on stdout.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use oar_form::core::{ConfigValidator, FormConfig};
use oar_form::processors::Direction;
use tracing::info;

#[derive(Parser)]
#[command(name = "oar-form")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Form-field and checkbox segmentation with parameter calibration", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, env = "OAR_FORM_CONFIG")]
    config: Option<PathBuf>,

    /// Show a progress bar during calibration
    #[arg(long, global = true)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment a page into field crops
    Segment {
        /// Page image
        #[arg(long)]
        image: PathBuf,

        /// Directory the crops are written to
        #[arg(long = "output-dir", env = "OAR_FORM_OUTPUT_DIR")]
        output_dir: PathBuf,

        /// Page number used in crop names
        #[arg(long, default_value = "1")]
        page: usize,
    },
    /// Detect checkboxes and report which are checked
    Checkboxes {
        /// Page image
        #[arg(long)]
        image: PathBuf,

        /// Write box crops and an annotated page to this directory
        #[arg(long = "output-dir", env = "OAR_FORM_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,

        /// Page number used in artifact names
        #[arg(long, default_value = "1")]
        page: usize,

        /// Side of each checked box to mark on the annotated page (left, right, above, below)
        #[arg(long, default_value = "left")]
        marker: Direction,
    },
    /// Calibrate segmentation parameters against ground-truth boxes
    CalibrateFields {
        /// Page image
        #[arg(long)]
        image: PathBuf,

        /// CSV with header X,Y,Width,Height,ContentPath
        #[arg(long = "ground-truth")]
        ground_truth: PathBuf,
    },
    /// Calibrate cleaner parameters against reference transcripts
    CalibrateCleaner {
        /// Directory of field crops (PNG)
        #[arg(long)]
        samples: PathBuf,

        /// Directory of `<sample>.txt` reference transcripts
        #[arg(long)]
        references: PathBuf,

        /// Tesseract languages
        #[arg(long, default_value = "eng", env = "OAR_FORM_LANGUAGES")]
        languages: String,
    },
    /// Segment a page and recognize the text of every field
    Extract {
        /// Page image (or PDF with the `pdf` feature)
        #[arg(long)]
        image: PathBuf,

        /// Directory for intermediate crops
        #[arg(long = "work-dir", env = "OAR_FORM_WORK_DIR")]
        work_dir: PathBuf,

        /// Clean each field before recognition
        #[arg(long)]
        clean: bool,

        /// Keep the field crops after recognition
        #[arg(long = "keep-crops")]
        keep_crops: bool,

        /// Tesseract languages
        #[arg(long, default_value = "eng", env = "OAR_FORM_LANGUAGES")]
        languages: String,
    },
    /// Render the pages of a PDF to PNG files
    #[cfg(feature = "pdf")]
    Render {
        /// PDF document
        #[arg(long)]
        document: PathBuf,

        /// Directory the page images are written to
        #[arg(long = "output-dir", env = "OAR_FORM_OUTPUT_DIR")]
        output_dir: PathBuf,

        /// Target page width in pixels (overrides the configuration)
        #[arg(long, env = "OAR_FORM_RENDER_WIDTH")]
        width: Option<u32>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    oar_form::utils::init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            FormConfig::from_json_file(path)?
        }
        None => FormConfig::default(),
    };
    config.validate()?;

    match cli.command {
        Commands::Segment {
            image,
            output_dir,
            page,
        } => commands::segment(&config, &image, &output_dir, page),
        Commands::Checkboxes {
            image,
            output_dir,
            page,
            marker,
        } => commands::checkboxes(&config, &image, output_dir.as_deref(), page, marker),
        Commands::CalibrateFields {
            image,
            ground_truth,
        } => commands::calibrate_fields(&config, &image, &ground_truth, cli.progress),
        Commands::CalibrateCleaner {
            samples,
            references,
            languages,
        } => commands::calibrate_cleaner(&config, &samples, &references, &languages, cli.progress),
        Commands::Extract {
            image,
            work_dir,
            clean,
            keep_crops,
            languages,
        } => commands::extract(&config, &image, &work_dir, clean, keep_crops, &languages),
        #[cfg(feature = "pdf")]
        Commands::Render {
            document,
            output_dir,
            width,
        } => commands::render(&document, &output_dir, width.unwrap_or(config.render_width)),
    }
}
