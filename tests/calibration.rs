//! Calibration against synthetic ground truth and a mock recognizer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{Rgb, RgbImage};
use oar_form::calibration::{
    BestRecord, CleanerCalibrator, CleanerSample, FieldCalibrator, Objective,
    REFERENCE_MISSING_SCORE, ReferenceTexts, SampleId, ScoredParameterSet, match_count,
    read_ground_truth,
};
use oar_form::core::{
    CleanerSearchSpace, Dimensions, FieldSearchSpace, FormError, FormResult, ParallelPolicy,
    RecognizedWord, TextRecognizer,
};
use oar_form::pipeline::FieldSegmenter;
use oar_form::processors::Rect;
use oar_form::utils::load_rgb;

const PRINTED: [Rect; 3] = [
    Rect::new(40, 40, 300, 50),
    Rect::new(40, 150, 220, 45),
    Rect::new(320, 150, 240, 45),
];

fn form_page() -> RgbImage {
    let mut page = RgbImage::from_pixel(600, 400, Rgb([255, 255, 255]));
    for b in &PRINTED {
        for x in b.x..b.right() {
            for t in 0..2 {
                page.put_pixel(x, b.y + t, Rgb([0, 0, 0]));
                page.put_pixel(x, b.bottom() - 1 - t, Rgb([0, 0, 0]));
            }
        }
        for y in b.y..b.bottom() {
            for t in 0..2 {
                page.put_pixel(b.x + t, y, Rgb([0, 0, 0]));
                page.put_pixel(b.right() - 1 - t, y, Rgb([0, 0, 0]));
            }
        }
    }
    page
}

fn field_space() -> FieldSearchSpace {
    FieldSearchSpace {
        block_sizes: vec![5, 11],
        constants: vec![-1, 3],
        min_width_divisors: vec![2.0, 6.0],
        min_height_divisors: vec![20.0],
        max_width_divisors: vec![1.2, 2.0],
        max_height_divisors: vec![3.0],
        match_leniency: 10,
    }
}

/// Scores every combination sequentially with the plain segmenter.
fn brute_force(page: &RgbImage, expected: &[Rect], space: &FieldSearchSpace) -> (f64, usize) {
    let grid = space.parameter_sets(Dimensions::new(page.width(), page.height()));
    let mut best = (f64::MIN, usize::MAX);
    for (index, params) in grid.iter().enumerate() {
        let segmenter = FieldSegmenter::new(params, 0.08).unwrap();
        let score = match_count(&segmenter.detected_rects(page), expected, space.match_leniency) as f64;
        if score > best.0 {
            best = (score, index);
        }
    }
    best
}

#[test]
fn test_field_calibration_finds_true_optimum() {
    let page = form_page();
    // the extra box can never be matched, so the whole grid is searched
    let mut expected = PRINTED.to_vec();
    expected.push(Rect::new(0, 0, 5, 5));

    let space = field_space();
    let (optimum, optimum_index) = brute_force(&page, &expected, &space);

    let report = FieldCalibrator::new(space, ParallelPolicy::new().with_max_threads(Some(4)))
        .unwrap()
        .calibrate(&page, &expected)
        .unwrap();
    let best = report.best.unwrap();

    assert_eq!(best.score, optimum);
    assert_eq!(best.score, 3.0);
    assert_eq!(best.grid_index, optimum_index);
    assert_eq!(report.evaluated, report.total);
    assert!(!report.stopped_early);
}

#[test]
fn test_field_calibration_stops_on_perfect_score() {
    let page = form_page();
    let report = FieldCalibrator::new(field_space(), ParallelPolicy::new().with_max_threads(Some(1)))
        .unwrap()
        .calibrate(&page, &PRINTED)
        .unwrap();

    assert_eq!(report.best.as_ref().unwrap().score, PRINTED.len() as f64);
    assert!(report.stopped_early);
    assert!(report.skipped() > 0);
}

#[test]
fn test_field_calibration_from_csv() {
    let csv = "X,Y,Width,Height,ContentPath\n\
               40,40,300,50,name.png\n\
               40,150,220,45,city.png\n\
               320,150,240,45,\n";
    let expected: Vec<Rect> = read_ground_truth(csv.as_bytes())
        .unwrap()
        .into_iter()
        .map(|gt| gt.rect)
        .collect();
    assert_eq!(expected, PRINTED.to_vec());

    let report = FieldCalibrator::new(field_space(), ParallelPolicy::new())
        .unwrap()
        .calibrate(&form_page(), &expected)
        .unwrap();
    assert_eq!(report.best.unwrap().score, 3.0);
}

#[test]
fn test_best_score_is_monotonic() {
    let record = BestRecord::new(Objective::Maximize);
    let scores = [1.0, 0.0, 3.0, 2.0, 3.0, 5.0, 4.0];
    let mut previous = f64::MIN;
    for (index, score) in scores.iter().enumerate() {
        record.offer(ScoredParameterSet::new(index, *score, index));
        let current = record.best().unwrap().score;
        assert!(current >= previous);
        previous = current;
    }
    assert_eq!(record.best().unwrap().parameters, 5);
}

/// Answers "Jane Doe" while the speck is still on the crop, and refuses to
/// read the crop once it is gone.
struct FailsWhenClean;

impl TextRecognizer for FailsWhenClean {
    fn recognize(&self, image_path: &Path) -> FormResult<Vec<RecognizedWord>> {
        let image = load_rgb(image_path)?;
        if image.get_pixel(151, 81)[0] < 128 {
            Ok(vec![
                RecognizedWord::new("Jane", 0.9),
                RecognizedWord::new("Doe", 0.9),
            ])
        } else {
            Err(FormError::recognition("fails-when-clean", "engine crashed"))
        }
    }

    fn name(&self) -> &str {
        "fails-when-clean"
    }
}

/// Same reading as [`FailsWhenClean`], but crashes instead of returning an error.
struct PanicsWhenClean;

impl TextRecognizer for PanicsWhenClean {
    fn recognize(&self, image_path: &Path) -> FormResult<Vec<RecognizedWord>> {
        let image = load_rgb(image_path)?;
        if image.get_pixel(151, 81)[0] < 128 {
            Ok(vec![
                RecognizedWord::new("Jane", 0.9),
                RecognizedWord::new("Doe", 0.9),
            ])
        } else {
            panic!("engine segfaulted on a clean crop");
        }
    }

    fn name(&self) -> &str {
        "panics-when-clean"
    }
}

fn write_sample(dir: &Path, name: &str) -> PathBuf {
    let mut img = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
    for y in 40..60 {
        for x in 100..160 {
            img.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
    for y in 80..83 {
        for x in 150..153 {
            img.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

fn cleaner_space() -> CleanerSearchSpace {
    CleanerSearchSpace {
        kernel_sizes: vec![1, 3],
        iterations: vec![1, 2],
        area_thresholds: vec![0.0, 100.0],
    }
}

#[test]
fn test_worker_failures_do_not_abort_search() {
    let dir = tempfile::tempdir().unwrap();
    let sample = CleanerSample::from_path(write_sample(dir.path(), "name.png"));
    // never read exactly, so no combination stops the search
    let refs = ReferenceTexts::new().with(SampleId::new("name"), "Jane Doe!");

    let report = CleanerCalibrator::new(
        Arc::new(FailsWhenClean),
        refs,
        cleaner_space(),
        ParallelPolicy::new().with_max_threads(Some(3)),
    )
    .unwrap()
    .calibrate(&[sample])
    .unwrap();

    // every combination that erases the speck fails; the rest are scored
    assert_eq!(report.failed, 4);
    assert_eq!(report.evaluated, 4);
    assert!(!report.stopped_early);
    let best = report.best.unwrap();
    assert!(best.score > 0.0);
    assert_eq!(best.grid_index, 0);
    assert_eq!(best.parameters.area_threshold, 0.0);
}

#[test]
fn test_panicking_recognizer_only_fails_its_combinations() {
    let dir = tempfile::tempdir().unwrap();
    let sample = CleanerSample::from_path(write_sample(dir.path(), "name.png"));
    let refs = ReferenceTexts::new().with(SampleId::new("name"), "Jane Doe!");

    let report = CleanerCalibrator::new(
        Arc::new(PanicsWhenClean),
        refs,
        cleaner_space(),
        ParallelPolicy::new().with_max_threads(Some(3)),
    )
    .unwrap()
    .with_work_dir(dir.path())
    .calibrate(&[sample])
    .unwrap();

    assert_eq!(report.failed, 4);
    assert_eq!(report.evaluated, 4);
    assert_eq!(report.total, 8);
    let best = report.best.unwrap();
    assert_eq!(best.grid_index, 0);
    assert_eq!(best.parameters.area_threshold, 0.0);

    // the temporary copies of the crashed evaluations are still removed
    let leftovers = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("oar-form-clean-"))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn test_any_missing_reference_poisons_the_combination() {
    let dir = tempfile::tempdir().unwrap();
    let known = CleanerSample::from_path(write_sample(dir.path(), "known.png"));
    let unknown = CleanerSample::from_path(write_sample(dir.path(), "unknown.png"));
    let refs = ReferenceTexts::new().with(SampleId::new("known"), "Jane Doe");

    let report = CleanerCalibrator::new(
        Arc::new(FailsWhenClean),
        refs,
        cleaner_space(),
        ParallelPolicy::new().with_max_threads(Some(2)),
    )
    .unwrap()
    .calibrate(&[known, unknown])
    .unwrap();

    let best = report.best.unwrap();
    assert_eq!(best.score, REFERENCE_MISSING_SCORE);
    assert_eq!(best.grid_index, 0);
    assert_eq!(report.evaluated, report.total);
}
