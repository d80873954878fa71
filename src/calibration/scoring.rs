//! Scores for calibration: ground-truth box matching and a recognition-error proxy.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::errors::FormResult;
use crate::processors::Rect;

/// Score assigned when a sample has no reference transcript.
pub const REFERENCE_MISSING_SCORE: f64 = f64::MAX;

/// One expected field from a ground-truth file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruthBox {
    /// Expected field bounds.
    pub rect: Rect,
    /// Optional path to the expected crop or its content.
    pub content_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct GroundTruthRow {
    #[serde(rename = "X")]
    x: u32,
    #[serde(rename = "Y")]
    y: u32,
    #[serde(rename = "Width")]
    width: u32,
    #[serde(rename = "Height")]
    height: u32,
    #[serde(rename = "ContentPath", default)]
    content_path: Option<String>,
}

/// Reads ground-truth boxes from CSV with the header
/// `X,Y,Width,Height,ContentPath`.
pub fn read_ground_truth<R: Read>(reader: R) -> FormResult<Vec<GroundTruthBox>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut boxes = Vec::new();
    for row in csv_reader.deserialize::<GroundTruthRow>() {
        let row = row?;
        boxes.push(GroundTruthBox {
            rect: Rect::new(row.x, row.y, row.width, row.height),
            content_path: row
                .content_path
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        });
    }
    debug!("read {} ground-truth boxes", boxes.len());
    Ok(boxes)
}

/// Loads ground-truth boxes from a CSV file.
pub fn load_ground_truth(path: impl AsRef<Path>) -> FormResult<Vec<GroundTruthBox>> {
    let file = std::fs::File::open(path.as_ref())?;
    read_ground_truth(file)
}

/// Number of expected boxes matched by at least one detected box.
///
/// Two boxes match when every coordinate differs by at most `leniency` pixels.
pub fn match_count(detected: &[Rect], expected: &[Rect], leniency: u32) -> usize {
    expected
        .iter()
        .filter(|gt| detected.iter().any(|d| d.approx_eq(gt, leniency)))
        .count()
}

/// Character-level Levenshtein distance.
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Recognition error of `recognized` against `reference`.
///
/// The edit distance is turned into an error percentage of the reference
/// length and then divided by that length again, so a given error costs more
/// on a short reference than on a long one. Lower is better; an exact match
/// scores 0.
pub fn recognition_error(recognized: &str, reference: &str) -> f64 {
    let length = reference.chars().count().max(1) as f64;
    let distance = edit_distance(recognized, reference) as f64;
    let error_percent = distance / length * 100.0;
    error_percent / length
}

/// Logical identifier of a calibration sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleId(String);

impl SampleId {
    /// Creates an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier derived from a file stem (`scan_01.png` gives `scan_01`).
    pub fn from_path(path: &Path) -> Self {
        Self(
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        )
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Known-correct transcripts keyed by sample.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceTexts {
    texts: HashMap<SampleId, String>,
}

impl ReferenceTexts {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the transcript of a sample.
    pub fn insert(&mut self, id: SampleId, text: impl Into<String>) {
        self.texts.insert(id, text.into());
    }

    /// Adds a transcript, builder style.
    pub fn with(mut self, id: SampleId, text: impl Into<String>) -> Self {
        self.insert(id, text);
        self
    }

    /// The transcript of a sample.
    pub fn get(&self, id: &SampleId) -> Option<&str> {
        self.texts.get(id).map(String::as_str)
    }

    /// Number of transcripts.
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Returns true if there are no transcripts.
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Loads every `*.txt` file in `dir`, keyed by file stem.
    pub fn from_dir(dir: impl AsRef<Path>) -> FormResult<Self> {
        let mut references = Self::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let text = std::fs::read_to_string(&path)?;
            references.insert(SampleId::from_path(&path), text.trim().to_string());
        }
        Ok(references)
    }

    /// Recognition error of `recognized` for sample `id`.
    ///
    /// Returns [`REFERENCE_MISSING_SCORE`] when the sample has no reference.
    pub fn score(&self, id: &SampleId, recognized: &str) -> f64 {
        match self.get(id) {
            Some(reference) => recognition_error(recognized, reference),
            None => REFERENCE_MISSING_SCORE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance_cases() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("form", "form"), 0);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", "yabd"), edit_distance("yabd", "abc"));
    }

    #[test]
    fn test_recognition_error_weights_short_references() {
        assert_eq!(recognition_error("Jane", "Jane"), 0.0);
        // one edit on 4 chars: 25% / 4
        assert!((recognition_error("Jane", "Jone") - 6.25).abs() < 1e-9);
        // one edit on 10 chars: 10% / 10
        assert!((recognition_error("0123456789", "0123456780") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_reference_is_worst() {
        let refs = ReferenceTexts::new().with(SampleId::new("a"), "Jane");
        assert_eq!(refs.score(&SampleId::new("b"), "Jane"), REFERENCE_MISSING_SCORE);
        assert_eq!(refs.score(&SampleId::new("a"), "Jane"), 0.0);
    }

    #[test]
    fn test_read_ground_truth() {
        let csv = "X,Y,Width,Height,ContentPath\n10,20,300,40,fields/name.png\n5, 6, 7, 8,\n";
        let boxes = read_ground_truth(csv.as_bytes()).unwrap();
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].rect, Rect::new(10, 20, 300, 40));
        assert_eq!(boxes[0].content_path, Some(PathBuf::from("fields/name.png")));
        assert_eq!(boxes[1].rect, Rect::new(5, 6, 7, 8));
        assert_eq!(boxes[1].content_path, None);
    }

    #[test]
    fn test_read_ground_truth_rejects_bad_numbers() {
        let csv = "X,Y,Width,Height,ContentPath\nten,20,300,40,\n";
        assert!(read_ground_truth(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_match_count_with_leniency() {
        let expected = [Rect::new(100, 100, 200, 40), Rect::new(100, 300, 200, 40)];
        let detected = [Rect::new(105, 95, 198, 44), Rect::new(400, 300, 200, 40)];
        assert_eq!(match_count(&detected, &expected, 10), 1);
        assert_eq!(match_count(&detected, &expected, 4), 0);
        assert_eq!(match_count(&[], &expected, 10), 0);
    }

    #[test]
    fn test_references_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scan_1.txt"), "Jane Doe\n").unwrap();
        std::fs::write(dir.path().join("scan_1.png"), b"not text").unwrap();
        let refs = ReferenceTexts::from_dir(dir.path()).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs.get(&SampleId::new("scan_1")), Some("Jane Doe"));
    }
}
