//! PDF page rasterization with PDFium.

use std::path::Path;

use image::RgbImage;
use pdfium_render::prelude::*;
use tracing::debug;

use crate::core::errors::{FormError, FormResult};
use crate::core::traits::PageRasterizer;

/// Page width used when no target width is configured.
pub const DEFAULT_RENDER_WIDTH: u32 = 1500;

/// Renders PDF pages through a dynamically bound PDFium library.
///
/// The library is looked up next to the executable, in the usual system
/// library directories and finally through the platform loader.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl std::fmt::Debug for PdfiumRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumRasterizer").finish_non_exhaustive()
    }
}

impl PdfiumRasterizer {
    /// Binds to PDFium.
    pub fn new() -> FormResult<Self> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("/usr/lib"))
            })
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                    "/usr/local/lib",
                ))
            })
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| {
                FormError::config_error_detailed("PDFium", format!("library not found: {e}"))
            })?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    fn open<'a>(&'a self, document: &Path) -> FormResult<PdfDocument<'a>> {
        self.pdfium
            .load_pdf_from_file(document, None)
            .map_err(|e| FormError::Render {
                page: 0,
                message: format!("cannot open {}: {e}", document.display()),
            })
    }
}

fn page_error(page: usize, e: impl std::fmt::Display) -> FormError {
    FormError::Render {
        page,
        message: e.to_string(),
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn render(
        &self,
        document: &Path,
        page_index: usize,
        target_width: u32,
    ) -> FormResult<RgbImage> {
        let doc = self.open(document)?;
        let index = u16::try_from(page_index).map_err(|e| page_error(page_index, e))?;
        let page = doc.pages().get(index).map_err(|e| page_error(page_index, e))?;

        // Height follows from the page's aspect ratio.
        let config = PdfRenderConfig::new()
            .set_target_width(target_width as i32)
            .render_form_data(true)
            .render_annotations(true);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| page_error(page_index, e))?;
        let image = bitmap.as_image().to_rgb8();
        debug!(
            "rendered page {} of {} at {}x{}",
            page_index,
            document.display(),
            image.width(),
            image.height()
        );
        Ok(image)
    }

    fn page_count(&self, document: &Path) -> FormResult<usize> {
        Ok(self.open(document)?.pages().len() as usize)
    }

    fn has_text_layer(&self, document: &Path, page_index: usize) -> FormResult<bool> {
        let doc = self.open(document)?;
        let index = u16::try_from(page_index).map_err(|e| page_error(page_index, e))?;
        let page = doc.pages().get(index).map_err(|e| page_error(page_index, e))?;
        let text = page.text().map_err(|e| page_error(page_index, e))?;
        Ok(!text.all().trim().is_empty())
    }
}

/// Returns true if the path has a `.pdf` extension.
pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}
