//! Text recognition through the `tesseract` command line tool.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::core::errors::{FormError, FormResult};
use crate::core::traits::{RecognizedWord, TextRecognizer};

const ENGINE: &str = "tesseract";

/// Runs `tesseract <image> stdout tsv` and reads the word rows.
///
/// Confidences are rescaled from tesseract's 0..100 to 0..1. Rows with a
/// negative confidence (layout rows) or empty text are dropped.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: String,
    languages: String,
    psm: u32,
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self {
            binary: ENGINE.to_string(),
            languages: "eng".to_string(),
            psm: 7,
        }
    }
}

impl TesseractRecognizer {
    /// Recognizer for English single-line fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Path or name of the executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Language list passed with `-l`, e.g. `eng+deu`.
    pub fn with_languages(mut self, languages: impl Into<String>) -> Self {
        self.languages = languages.into();
        self
    }

    /// Page segmentation mode passed with `--psm`.
    pub fn with_psm(mut self, psm: u32) -> Self {
        self.psm = psm;
        self
    }

    fn run_tsv(&self, image_path: &Path) -> FormResult<String> {
        let output = Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("tsv")
            .output()
            .map_err(|e| {
                FormError::recognition(ENGINE, format!("failed to run {}: {e}", self.binary))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FormError::recognition(ENGINE, stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image_path: &Path) -> FormResult<Vec<RecognizedWord>> {
        let tsv = self.run_tsv(image_path)?;
        let words = parse_tsv_words(&tsv);
        debug!("tesseract read {} words from {}", words.len(), image_path.display());
        Ok(words)
    }

    fn name(&self) -> &str {
        ENGINE
    }
}

/// Extracts level-5 (word) rows from tesseract TSV output.
pub fn parse_tsv_words(tsv: &str) -> Vec<RecognizedWord> {
    tsv.lines()
        .skip(1)
        .filter_map(|row| {
            let cols: Vec<&str> = row.split('\t').collect();
            if cols.len() < 12 {
                return None;
            }
            if cols[0].parse::<i32>().unwrap_or(0) != 5 {
                return None;
            }
            let conf: f32 = cols[10].trim().parse().unwrap_or(-1.0);
            let text = cols[11].trim();
            if text.is_empty() || conf < 0.0 {
                return None;
            }
            Some(RecognizedWord::new(text, (conf / 100.0).min(1.0)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn test_parse_tsv_words() {
        let tsv = format!(
            "{HEADER}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t300\t40\t-1\t\n\
             4\t1\t1\t1\t1\t0\t5\t5\t200\t30\t-1\t\n\
             5\t1\t1\t1\t1\t1\t5\t5\t60\t30\t96.5\tJane\n\
             5\t1\t1\t1\t1\t2\t70\t5\t60\t30\t41\tDoe\n\
             5\t1\t1\t1\t1\t3\t140\t5\t10\t30\t88\t \n"
        );
        let words = parse_tsv_words(&tsv);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "Jane");
        assert!((words[0].confidence - 0.965).abs() < 1e-6);
        assert_eq!(words[1].text, "Doe");
        assert!((words[1].confidence - 0.41).abs() < 1e-6);
    }

    #[test]
    fn test_parse_tsv_ignores_short_rows() {
        assert!(parse_tsv_words("level\ttext\n5\tJane\n").is_empty());
        assert!(parse_tsv_words("").is_empty());
    }

    #[test]
    fn test_missing_binary_is_recognition_error() {
        let recognizer = TesseractRecognizer::new().with_binary("/nonexistent/tesseract");
        let err = recognizer.recognize(Path::new("field.png")).unwrap_err();
        assert!(matches!(err, FormError::Recognition { .. }));
    }
}
