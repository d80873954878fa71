//! Implementations of the collaborator traits backed by external tools.

#[cfg(feature = "pdf")]
pub mod pdfium;
pub mod tesseract;

#[cfg(feature = "pdf")]
pub use pdfium::{DEFAULT_RENDER_WIDTH, PdfiumRasterizer, is_pdf_path};
pub use tesseract::{TesseractRecognizer, parse_tsv_words};
