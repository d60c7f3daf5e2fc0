//! Document state model
//!
//! A [`Document`] is the normalized result of decoding an uploaded file:
//! an ordered sequence of page rasters plus a page count. Single images
//! become one-page documents; PDFs keep a rasterizer handle so pages other
//! than the first can be materialized on demand.

use docstamp_engine::{PdfHandle, RasterError, RgbaImage};
use std::sync::Arc;

/// Unique identifier for a loaded document
///
/// Assigned by the loader, monotonic within a session. Page caches are
/// keyed by this so entries from a superseded document can never be
/// confused with the current one.
pub type DocumentId = u64;

/// What kind of upload produced a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    SingleImage,
    MultiPagePdf,
}

/// One rasterized page
///
/// Immutable once produced. The bitmap is shared behind an [`Arc`] so the
/// page cache, the viewport and the exporter can hold the same pixels
/// without copying.
#[derive(Debug, Clone)]
pub struct PageImage {
    index: u32,
    bitmap: Arc<RgbaImage>,
}

impl PageImage {
    /// Wrap a decoded raster as page `index` (1-based).
    pub fn new(index: u32, bitmap: RgbaImage) -> Self {
        Self { index, bitmap: Arc::new(bitmap) }
    }

    /// 1-based page number.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn pixel_width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn pixel_height(&self) -> u32 {
        self.bitmap.height()
    }

    pub fn bitmap(&self) -> &RgbaImage {
        &self.bitmap
    }
}

#[derive(Debug)]
pub(crate) enum DocumentSource {
    Image,
    Pdf { handle: PdfHandle, raster_scale: f32 },
}

/// Errors from turning an uploaded file into a document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("unsupported file type: {mime}")]
    UnsupportedFileType { mime: String },
    #[error("image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("rasterization error: {0}")]
    Raster(#[from] RasterError),
}

/// A loaded document: page count plus the means to materialize each page
///
/// Created on successful decode of an upload, replaced wholesale when a
/// new upload supersedes it. `page_count() >= 1` always holds for a
/// constructed document; there is no zero-page success state.
#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    source_kind: SourceKind,
    page_count: u32,
    source: DocumentSource,
    first_page: PageImage,
}

impl Document {
    pub(crate) fn new(
        id: DocumentId,
        source_kind: SourceKind,
        page_count: u32,
        source: DocumentSource,
        first_page: PageImage,
    ) -> Self {
        debug_assert!(page_count >= 1);
        Self { id, source_kind, page_count, source, first_page }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Page 1, rasterized eagerly at load time.
    pub fn first_page(&self) -> &PageImage {
        &self.first_page
    }

    /// Rasterizer handle for on-demand page materialization.
    /// `None` for single-image documents.
    pub fn pdf_handle(&self) -> Option<PdfHandle> {
        match self.source {
            DocumentSource::Image => None,
            DocumentSource::Pdf { handle, .. } => Some(handle),
        }
    }

    /// Scale factor used for every page raster of this document. Pages
    /// re-rendered on demand must use the same scale so repeated requests
    /// for a page are geometrically identical.
    pub fn raster_scale(&self) -> f32 {
        match self.source {
            DocumentSource::Image => 1.0,
            DocumentSource::Pdf { raster_scale, .. } => raster_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn page_image_reports_raster_dimensions() {
        let bitmap = RgbaImage::from_pixel(320, 200, Rgba([255, 255, 255, 255]));
        let page = PageImage::new(1, bitmap);

        assert_eq!(page.index(), 1);
        assert_eq!(page.pixel_width(), 320);
        assert_eq!(page.pixel_height(), 200);
    }

    #[test]
    fn image_document_has_no_pdf_handle() {
        let bitmap = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
        let doc = Document::new(
            1,
            SourceKind::SingleImage,
            1,
            DocumentSource::Image,
            PageImage::new(1, bitmap),
        );

        assert!(doc.pdf_handle().is_none());
        assert_eq!(doc.raster_scale(), 1.0);
        assert_eq!(doc.page_count(), 1);
    }
}
