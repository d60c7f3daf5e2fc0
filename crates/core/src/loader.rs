//! Document loader
//!
//! Turns raw upload bytes plus a MIME type into a [`Document`]. Images
//! decode eagerly into a single page at natural resolution; PDFs are
//! opened through the rasterization service, with page 1 rendered
//! immediately and the rest materialized on demand by the navigator.

use crate::document::{Document, DocumentError, DocumentId, DocumentSource, PageImage, SourceKind};
use docstamp_engine::Rasterizer;

/// Scale applied to PDF page rasters. 2x keeps small print legible when
/// stamps are placed over it.
pub const DEFAULT_PDF_SCALE: f32 = 2.0;

/// Loader for uploaded files
///
/// Hands out monotonically increasing document ids so page caches keyed by
/// (document id, page index) never alias across uploads.
#[derive(Debug)]
pub struct DocumentLoader {
    next_id: DocumentId,
    pdf_scale: f32,
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self { next_id: 0, pdf_scale: DEFAULT_PDF_SCALE }
    }

    pub fn with_pdf_scale(mut self, scale: f32) -> Self {
        self.pdf_scale = if scale > 0.0 { scale } else { DEFAULT_PDF_SCALE };
        self
    }

    /// Decode an upload into a document.
    ///
    /// Accepts `image/*` and `application/pdf`; anything else fails with
    /// [`DocumentError::UnsupportedFileType`]. On any failure no document
    /// is produced and no id is consumed, so the caller's previous
    /// document (if any) stays valid.
    pub fn load(
        &mut self,
        rasterizer: &mut dyn Rasterizer,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<Document, DocumentError> {
        if mime.starts_with("image/") {
            self.load_image(&bytes)
        } else if mime == "application/pdf" {
            self.load_pdf(rasterizer, bytes)
        } else {
            Err(DocumentError::UnsupportedFileType { mime: mime.to_owned() })
        }
    }

    fn load_image(&mut self, bytes: &[u8]) -> Result<Document, DocumentError> {
        let decoded = image::load_from_memory(bytes)?.to_rgba8();
        log::debug!("decoded image upload {}x{}", decoded.width(), decoded.height());

        let id = self.allocate_id();
        Ok(Document::new(
            id,
            SourceKind::SingleImage,
            1,
            DocumentSource::Image,
            PageImage::new(1, decoded),
        ))
    }

    fn load_pdf(
        &mut self,
        rasterizer: &mut dyn Rasterizer,
        bytes: Vec<u8>,
    ) -> Result<Document, DocumentError> {
        let handle = rasterizer.open(bytes)?;
        let page_count = rasterizer.page_count(handle)?;
        let first = rasterizer.rasterize(handle, 1, self.pdf_scale)?;
        log::debug!("opened pdf upload with {page_count} pages at scale {}", self.pdf_scale);

        let id = self.allocate_id();
        Ok(Document::new(
            id,
            SourceKind::MultiPagePdf,
            page_count,
            DocumentSource::Pdf { handle, raster_scale: self.pdf_scale },
            PageImage::new(1, first),
        ))
    }

    fn allocate_id(&mut self) -> DocumentId {
        self.next_id += 1;
        self.next_id
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstamp_engine::{blank_pdf, LopdfRasterizer, LETTER};
    use image::Rgba;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = docstamp_engine::RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("png encode");
        bytes
    }

    #[test]
    fn image_upload_becomes_single_page_document() {
        let mut loader = DocumentLoader::new();
        let mut engine = LopdfRasterizer::new();

        let doc = loader
            .load(&mut engine, png_bytes(64, 48), "image/png")
            .expect("image load should succeed");

        assert_eq!(doc.source_kind(), SourceKind::SingleImage);
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.first_page().pixel_width(), 64);
        assert_eq!(doc.first_page().pixel_height(), 48);
    }

    #[test]
    fn pdf_upload_reports_page_count_and_rasterizes_page_one() {
        let mut loader = DocumentLoader::new();
        let mut engine = LopdfRasterizer::new();

        let doc = loader
            .load(&mut engine, blank_pdf(2, LETTER), "application/pdf")
            .expect("pdf load should succeed");

        assert_eq!(doc.source_kind(), SourceKind::MultiPagePdf);
        assert_eq!(doc.page_count(), 2);
        // 612pt x 2.0 scale
        assert_eq!(doc.first_page().pixel_width(), 1224);
        assert_eq!(doc.raster_scale(), DEFAULT_PDF_SCALE);
    }

    #[test]
    fn unknown_mime_type_is_rejected() {
        let mut loader = DocumentLoader::new();
        let mut engine = LopdfRasterizer::new();

        let err = loader
            .load(&mut engine, b"hello".to_vec(), "text/plain")
            .expect_err("text/plain should be rejected");

        assert!(matches!(err, DocumentError::UnsupportedFileType { mime } if mime == "text/plain"));
    }

    #[test]
    fn document_ids_are_monotonic() {
        let mut loader = DocumentLoader::new();
        let mut engine = LopdfRasterizer::new();

        let first = loader.load(&mut engine, png_bytes(4, 4), "image/png").expect("load");
        let second = loader.load(&mut engine, png_bytes(4, 4), "image/png").expect("load");

        assert!(second.id() > first.id());
    }

    #[test]
    fn failed_load_does_not_consume_an_id() {
        let mut loader = DocumentLoader::new();
        let mut engine = LopdfRasterizer::new();

        let _ = loader.load(&mut engine, b"junk".to_vec(), "application/zip");
        let doc = loader.load(&mut engine, png_bytes(4, 4), "image/png").expect("load");

        assert_eq!(doc.id(), 1);
    }
}
