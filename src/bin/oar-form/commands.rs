//! Subcommand implementations. Each prints its result as JSON on stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use oar_form::adapters::TesseractRecognizer;
use oar_form::calibration::{
    CleanerCalibrator, CleanerSample, FieldCalibrator, ReferenceTexts, load_ground_truth,
};
use oar_form::core::{FormConfig, TextRecognizer};
use oar_form::pipeline::{FieldSegmenter, FieldText, FieldTextExtractor};
use oar_form::processors::{CheckboxDetector, Direction, Rect};
use oar_form::utils::{OverlayStyle, load_rgb};
use serde::Serialize;
use tracing::{info, warn};

type CliResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn ensure_dir(dir: &Path) -> CliResult {
    std::fs::create_dir_all(dir)?;
    Ok(())
}

pub fn segment(config: &FormConfig, image: &Path, output_dir: &Path, page: usize) -> CliResult {
    ensure_dir(output_dir)?;
    let page_image = load_rgb(image)?;
    let params = config.segmentation_for(page_image.width(), page_image.height());
    info!("segmenting {} with {:?}", image.display(), params);

    let segmenter = FieldSegmenter::new(&params, config.iou_threshold)?;
    let regions = segmenter.segment_file(image, output_dir, page)?;
    print_json(&regions)
}

#[derive(Serialize)]
struct CheckboxOutput {
    checked: Vec<usize>,
    boxes: Vec<oar_form::processors::CheckBox>,
    artifacts: Vec<PathBuf>,
}

pub fn checkboxes(
    config: &FormConfig,
    image: &Path,
    output_dir: Option<&Path>,
    page: usize,
    marker: Direction,
) -> CliResult {
    let start = Instant::now();
    let page_image = load_rgb(image)?;
    let detector = CheckboxDetector::new(config.checkbox.clone())?;
    let boxes = detector.detect(&page_image);
    info!(
        "found {} checkboxes on {} in {:.2?}",
        boxes.len(),
        image.display(),
        start.elapsed()
    );

    let mut artifacts = Vec::new();
    if let Some(dir) = output_dir {
        ensure_dir(dir)?;
        let style = OverlayStyle {
            direction: marker,
            ..OverlayStyle::default()
        };
        let exported = detector.export(&page_image, &boxes, dir, page, &style)?;
        artifacts.extend(exported.crops);
        artifacts.extend(exported.overlay);
    }

    print_json(&CheckboxOutput {
        checked: boxes
            .iter()
            .filter(|b| b.is_checked)
            .map(|b| b.index)
            .collect(),
        boxes,
        artifacts,
    })
}

pub fn calibrate_fields(
    config: &FormConfig,
    image: &Path,
    ground_truth: &Path,
    progress: bool,
) -> CliResult {
    let page_image = load_rgb(image)?;
    let expected: Vec<Rect> = load_ground_truth(ground_truth)?
        .into_iter()
        .map(|gt| gt.rect)
        .collect();
    info!(
        "calibrating against {} ground-truth boxes from {}",
        expected.len(),
        ground_truth.display()
    );

    let calibrator = FieldCalibrator::new(config.field_search.clone(), config.parallel.clone())?
        .with_iou_threshold(config.iou_threshold)
        .with_progress(progress);
    let report = calibrator.calibrate(&page_image, &expected)?;
    print_json(&report)
}

/// PNG files directly inside `dir`, sorted by name.
fn png_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_png = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("png"))
            .unwrap_or(false);
        if is_png {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn calibrate_cleaner(
    config: &FormConfig,
    samples: &Path,
    references: &Path,
    languages: &str,
    progress: bool,
) -> CliResult {
    let samples: Vec<CleanerSample> = png_files(samples)?
        .into_iter()
        .map(CleanerSample::from_path)
        .collect();
    let references = ReferenceTexts::from_dir(references)?;
    info!(
        "calibrating cleaner on {} samples with {} references",
        samples.len(),
        references.len()
    );

    let recognizer: Arc<dyn TextRecognizer> =
        Arc::new(TesseractRecognizer::new().with_languages(languages));
    let calibrator = CleanerCalibrator::new(
        recognizer,
        references,
        config.cleaner_search.clone(),
        config.parallel.clone(),
    )?
    .with_confidence_threshold(config.confidence_threshold)
    .with_progress(progress);
    let report = calibrator.calibrate(&samples)?;
    print_json(&report)
}

#[derive(Serialize)]
struct PageText {
    page: usize,
    fields: Vec<FieldText>,
}

pub fn extract(
    config: &FormConfig,
    image: &Path,
    work_dir: &Path,
    clean: bool,
    keep_crops: bool,
    languages: &str,
) -> CliResult {
    ensure_dir(work_dir)?;
    let recognizer: Arc<dyn TextRecognizer> =
        Arc::new(TesseractRecognizer::new().with_languages(languages));
    let mut builder = FieldTextExtractor::builder(recognizer)
        .confidence_threshold(config.confidence_threshold)
        .iou_threshold(config.iou_threshold)
        .keep_crops(keep_crops);
    if clean {
        builder = builder.cleaner(config.cleaner);
    }
    let extractor = builder.build()?;

    let pages = page_images(config, image, work_dir)?;
    let mut output = Vec::with_capacity(pages.len());
    for (page, path) in pages {
        match extractor.extract_page(&path, config.segmentation.as_ref(), work_dir, page) {
            Ok(fields) => output.push(PageText { page, fields }),
            Err(e) => warn!("skipping page {}: {}", page, e),
        }
    }
    print_json(&output)
}

/// Page images to extract from, numbered from 1.
#[cfg(not(feature = "pdf"))]
fn page_images(
    _config: &FormConfig,
    image: &Path,
    _work_dir: &Path,
) -> Result<Vec<(usize, PathBuf)>, Box<dyn std::error::Error + Send + Sync>> {
    Ok(vec![(1, image.to_path_buf())])
}

/// Page images to extract from, numbered from 1.
///
/// PDF pages are rendered into `work_dir`; pages that already carry a text
/// layer are skipped.
#[cfg(feature = "pdf")]
fn page_images(
    config: &FormConfig,
    image: &Path,
    work_dir: &Path,
) -> Result<Vec<(usize, PathBuf)>, Box<dyn std::error::Error + Send + Sync>> {
    use oar_form::adapters::{PdfiumRasterizer, is_pdf_path};
    use oar_form::core::PageRasterizer;

    if !is_pdf_path(image) {
        return Ok(vec![(1, image.to_path_buf())]);
    }
    let rasterizer = PdfiumRasterizer::new()?;
    let mut pages = Vec::new();
    for index in 0..rasterizer.page_count(image)? {
        if rasterizer.has_text_layer(image, index)? {
            info!("page {} already has a text layer, skipping", index + 1);
            continue;
        }
        let rendered = rasterizer.render(image, index, config.render_width)?;
        let path = work_dir.join(format!("page_{}.png", index + 1));
        oar_form::utils::save_rgb(&rendered, &path)?;
        pages.push((index + 1, path));
    }
    Ok(pages)
}

#[cfg(feature = "pdf")]
pub fn render(document: &Path, output_dir: &Path, width: u32) -> CliResult {
    use oar_form::adapters::PdfiumRasterizer;
    use oar_form::core::PageRasterizer;

    ensure_dir(output_dir)?;
    let rasterizer = PdfiumRasterizer::new()?;
    let mut written = Vec::new();
    for index in 0..rasterizer.page_count(document)? {
        let page = rasterizer.render(document, index, width)?;
        let path = output_dir.join(format!("page_{}.png", index + 1));
        oar_form::utils::save_rgb(&page, &path)?;
        written.push(path);
    }
    info!("rendered {} pages of {}", written.len(), document.display());
    print_json(&written)
}
