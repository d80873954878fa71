//! End-to-end tests of segmentation, extraction and checkbox detection on
//! synthetic pages.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{Rgb, RgbImage};
use oar_form::core::{
    CheckboxConfig, Dimensions, FormConfig, FormResult, ParameterSet, RecognizedWord,
    TextRecognizer,
};
use oar_form::pipeline::{FieldSegmenter, FieldTextExtractor};
use oar_form::processors::{CheckboxDetector, Rect};

const PRINTED: [Rect; 3] = [
    Rect::new(40, 40, 300, 50),
    Rect::new(40, 150, 220, 45),
    Rect::new(320, 150, 240, 45),
];

fn form_page(boxes: &[Rect]) -> RgbImage {
    let mut page = RgbImage::from_pixel(600, 400, Rgb([255, 255, 255]));
    for b in boxes {
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

fn write_page(dir: &Path, name: &str, page: &RgbImage) -> PathBuf {
    let path = dir.join(name);
    page.save(&path).unwrap();
    path
}

fn params() -> ParameterSet {
    ParameterSet::new(11, 2, Dimensions::new(100, 20), Dimensions::new(400, 100))
}

struct FixedWords;

impl TextRecognizer for FixedWords {
    fn recognize(&self, _image_path: &Path) -> FormResult<Vec<RecognizedWord>> {
        Ok(vec![
            RecognizedWord::new("Jane", 0.97),
            RecognizedWord::new("~", 0.12),
            RecognizedWord::new("Doe", 0.91),
        ])
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[test]
fn test_segment_file_writes_one_crop_per_field() {
    let dir = tempfile::tempdir().unwrap();
    let page_path = write_page(dir.path(), "page.png", &form_page(&PRINTED));
    let out = dir.path().join("crops");
    std::fs::create_dir_all(&out).unwrap();

    let segmenter = FieldSegmenter::new(&params(), 0.08).unwrap();
    let regions = segmenter.segment_file(&page_path, &out, 3).unwrap();

    assert_eq!(regions.len(), PRINTED.len(), "{regions:?}");
    for (region, printed) in regions.iter().zip(PRINTED.iter()) {
        assert!(!region.fallback);
        assert!(region.rect.approx_eq(printed, 4), "{:?}", region.rect);
        let name = region.cropped_image.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("contour_3_"), "{name}");
        let crop = image::open(&region.cropped_image).unwrap();
        assert_eq!((crop.width(), crop.height()), (region.rect.width, region.rect.height));
    }
}

#[test]
fn test_blank_page_falls_back_to_whole_image() {
    let dir = tempfile::tempdir().unwrap();
    let blank = RgbImage::from_pixel(320, 240, Rgb([255, 255, 255]));
    let page_path = write_page(dir.path(), "blank.png", &blank);

    let segmenter = FieldSegmenter::new(&params(), 0.08).unwrap();
    let regions = segmenter.segment_file(&page_path, dir.path(), 1).unwrap();

    assert_eq!(regions.len(), 1);
    assert!(regions[0].fallback);
    assert_eq!(regions[0].rect, Rect::new(0, 0, 320, 240));
    assert_eq!(regions[0].cropped_image, page_path);
}

#[test]
fn test_extractor_reads_fields_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let page_path = write_page(dir.path(), "page.png", &form_page(&PRINTED));
    let work = dir.path().join("work");
    std::fs::create_dir_all(&work).unwrap();

    let extractor = FieldTextExtractor::builder(Arc::new(FixedWords))
        .build()
        .unwrap();
    let texts = extractor
        .extract_page(&page_path, Some(&params()), &work, 1)
        .unwrap();

    assert_eq!(texts.len(), PRINTED.len());
    assert!(texts.iter().all(|t| t.text == "Jane Doe"));
    assert!(texts.iter().all(|t| !t.region.cropped_image.exists()));
    assert!(page_path.exists());
}

#[test]
fn test_extractor_never_deletes_source_on_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let blank = RgbImage::from_pixel(200, 200, Rgb([255, 255, 255]));
    let page_path = write_page(dir.path(), "blank.png", &blank);

    let extractor = FieldTextExtractor::builder(Arc::new(FixedWords))
        .build()
        .unwrap();
    let texts = extractor
        .extract_page(&page_path, Some(&params()), dir.path(), 1)
        .unwrap();

    assert_eq!(texts.len(), 1);
    assert!(texts[0].region.fallback);
    assert!(page_path.exists());
}

#[test]
fn test_config_file_drives_segmentation() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("form.json");
    std::fs::write(
        &config_path,
        r#"{
            "segmentation": {
                "block_size": 11, "constant": 2,
                "min_dimension": { "width": 250, "height": 20 },
                "max_dimension": { "width": 400, "height": 100 }
            }
        }"#,
    )
    .unwrap();

    let config = FormConfig::from_json_file(&config_path).unwrap();
    let params = config.segmentation_for(600, 400);
    let segmenter = FieldSegmenter::new(&params, config.iou_threshold).unwrap();
    let rects = segmenter.detected_rects(&form_page(&PRINTED));

    // only the first printed box is at least 250 pixels wide
    assert_eq!(rects.len(), 1);
    assert!(rects[0].approx_eq(&PRINTED[0], 4));
}

fn checkbox_page(squares: &[(u32, u32, bool)]) -> RgbImage {
    let mut page = RgbImage::from_pixel(500, 400, Rgb([255, 255, 255]));
    for &(x0, y0, filled) in squares {
        for y in y0..y0 + 70 {
            for x in x0..x0 + 70 {
                let border = x < x0 + 3 || x >= x0 + 67 || y < y0 + 3 || y >= y0 + 67;
                if filled || border {
                    page.put_pixel(x, y, Rgb([0, 0, 0]));
                }
            }
        }
    }
    page
}

#[test]
fn test_single_filled_checkbox() {
    let detector = CheckboxDetector::new(CheckboxConfig::default()).unwrap();
    let page = checkbox_page(&[(100, 100, true)]);
    assert_eq!(detector.checked_indices(&page), vec![1]);
}

#[test]
fn test_single_blank_checkbox() {
    let detector = CheckboxDetector::new(CheckboxConfig::default()).unwrap();
    let page = checkbox_page(&[(100, 100, false)]);
    assert!(detector.checked_indices(&page).is_empty());
}

#[test]
fn test_checkbox_grid_reading_order() {
    let detector = CheckboxDetector::new(CheckboxConfig::default()).unwrap();
    // second row is 5 pixels lower on the left; still one row
    let page = checkbox_page(&[
        (300, 50, false),
        (50, 55, true),
        (50, 250, false),
        (300, 248, true),
    ]);
    let boxes = detector.detect(&page);
    let origins: Vec<(u32, u32)> = boxes.iter().map(|b| (b.rect.x, b.rect.y)).collect();
    assert_eq!(origins, vec![(50, 55), (300, 50), (50, 250), (300, 248)]);
    assert_eq!(detector.checked_indices(&page), vec![1, 4]);
}
