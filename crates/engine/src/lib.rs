//! Rasterization service for the document stamping core
//!
//! Turns PDF bytes into per-page raster images at a requested scale and
//! reports page geometry. The stamping core talks to this through the
//! [`Rasterizer`] trait so a richer backend can be swapped in without
//! touching the document or navigation logic.

use image::{ImageBuffer, Rgba};
use std::collections::HashMap;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Handle to an open PDF inside a rasterizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PdfHandle(u64);

impl PdfHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Page size in points (1/72 inch)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSizePt {
    pub width_pt: f32,
    pub height_pt: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported by the default backend")]
    EncryptedUnsupported,
    #[error("backend error: {0}")]
    Backend(String),
}

/// External rasterization collaborator
///
/// Page numbers are 1-based throughout, matching both the PDF page tree
/// and the navigation layer that sits on top of this trait.
pub trait Rasterizer {
    /// Open a PDF from raw bytes and return a handle for later calls.
    fn open(&mut self, bytes: Vec<u8>) -> Result<PdfHandle, RasterError>;

    /// Total number of pages in the open document.
    fn page_count(&self, handle: PdfHandle) -> Result<u32, RasterError>;

    /// Geometry of a single page in points.
    fn page_size(&self, handle: PdfHandle, page_number: u32) -> Result<PageSizePt, RasterError>;

    /// Render one page to a bitmap. `scale` multiplies the page's point
    /// dimensions to produce the pixel dimensions of the output; the same
    /// (handle, page, scale) triple must always yield geometrically
    /// identical output.
    fn rasterize(
        &self,
        handle: PdfHandle,
        page_number: u32,
        scale: f32,
    ) -> Result<RgbaImage, RasterError>;

    /// Release the document behind a handle.
    fn close(&mut self, handle: PdfHandle) -> Result<(), RasterError>;
}

#[derive(Debug, Clone)]
struct OpenPdf {
    page_sizes: Vec<PageSizePt>,
}

/// Default `lopdf`-backed rasterizer
///
/// Parses the page tree for geometry and renders each page as a blank
/// white surface with a hairline border at the requested scale. Content
/// rasterization is delegated to richer backends behind the same trait;
/// everything the stamping core needs (page count, geometry, stable
/// raster dimensions) is exact here.
#[derive(Debug, Default)]
pub struct LopdfRasterizer {
    next_handle: u64,
    docs: HashMap<PdfHandle, OpenPdf>,
}

impl LopdfRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_sizes(bytes: &[u8]) -> Result<Vec<PageSizePt>, RasterError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(RasterError::EncryptedUnsupported);
        }

        let doc = lopdf::Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut sizes = Vec::with_capacity(pages.len());

        for (_, object_id) in pages {
            let dict = doc.get_dictionary(object_id)?;
            let size = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| {
                    if array.len() != 4 {
                        return None;
                    }
                    let x0 = array[0].as_float().ok()?;
                    let y0 = array[1].as_float().ok()?;
                    let x1 = array[2].as_float().ok()?;
                    let y1 = array[3].as_float().ok()?;
                    Some(PageSizePt { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
                })
                // US Letter fallback when a page carries no MediaBox
                .unwrap_or(PageSizePt { width_pt: 612.0, height_pt: 792.0 });

            sizes.push(size);
        }

        if sizes.is_empty() {
            return Err(RasterError::Backend("document has no pages".to_owned()));
        }

        Ok(sizes)
    }

    fn record(&self, handle: PdfHandle) -> Result<&OpenPdf, RasterError> {
        self.docs.get(&handle).ok_or(RasterError::InvalidHandle(handle.raw()))
    }
}

impl Rasterizer for LopdfRasterizer {
    fn open(&mut self, bytes: Vec<u8>) -> Result<PdfHandle, RasterError> {
        let page_sizes = Self::parse_sizes(&bytes)?;
        log::debug!("opened pdf with {} pages", page_sizes.len());

        self.next_handle += 1;
        let handle = PdfHandle(self.next_handle);
        self.docs.insert(handle, OpenPdf { page_sizes });

        Ok(handle)
    }

    fn page_count(&self, handle: PdfHandle) -> Result<u32, RasterError> {
        Ok(self.record(handle)?.page_sizes.len() as u32)
    }

    fn page_size(&self, handle: PdfHandle, page_number: u32) -> Result<PageSizePt, RasterError> {
        let record = self.record(handle)?;
        let page_count = record.page_sizes.len() as u32;

        page_number
            .checked_sub(1)
            .and_then(|index| record.page_sizes.get(index as usize))
            .copied()
            .ok_or(RasterError::PageOutOfRange { page: page_number, page_count })
    }

    fn rasterize(
        &self,
        handle: PdfHandle,
        page_number: u32,
        scale: f32,
    ) -> Result<RgbaImage, RasterError> {
        let page_size = self.page_size(handle, page_number)?;
        let scale = if scale <= 0.0 { 1.0 } else { scale };

        let width = (page_size.width_pt * scale).round().max(1.0) as u32;
        let height = (page_size.height_pt * scale).round().max(1.0) as u32;

        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        if width >= 4 && height >= 4 {
            for x in 0..width {
                image.put_pixel(x, 0, Rgba([220, 220, 220, 255]));
                image.put_pixel(x, height - 1, Rgba([220, 220, 220, 255]));
            }
            for y in 0..height {
                image.put_pixel(0, y, Rgba([220, 220, 220, 255]));
                image.put_pixel(width - 1, y, Rgba([220, 220, 220, 255]));
            }
        }

        Ok(image)
    }

    fn close(&mut self, handle: PdfHandle) -> Result<(), RasterError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(RasterError::InvalidHandle(handle.raw()))
    }
}

/// Build an in-memory PDF with the given page count and page size
///
/// Exists so downstream crates can exercise the rasterizer and loader
/// without binary fixtures. The output is a complete, parseable document.
pub fn blank_pdf(page_count: usize, size: PageSizePt) -> Vec<u8> {
    use lopdf::{dictionary, Document, Object};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(page_count);

    for _ in 0..page_count {
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(size.width_pt),
                Object::Real(size.height_pt),
            ],
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serializing an in-memory PDF cannot fail");
    bytes
}

pub const LETTER: PageSizePt = PageSizePt { width_pt: 612.0, height_pt: 792.0 };

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_pdf_and_reads_page_count() {
        let mut engine = LopdfRasterizer::new();
        let handle = engine.open(blank_pdf(3, LETTER)).expect("open should succeed");

        assert_eq!(engine.page_count(handle).expect("count should succeed"), 3);
    }

    #[test]
    fn page_size_is_one_based() {
        let mut engine = LopdfRasterizer::new();
        let handle = engine.open(blank_pdf(2, LETTER)).expect("open should succeed");

        let size = engine.page_size(handle, 1).expect("page 1 should exist");
        assert_eq!(size.width_pt, 612.0);
        assert_eq!(size.height_pt, 792.0);

        let err = engine.page_size(handle, 0).expect_err("page 0 is out of range");
        assert!(matches!(err, RasterError::PageOutOfRange { page: 0, page_count: 2 }));

        let err = engine.page_size(handle, 3).expect_err("page 3 is out of range");
        assert!(matches!(err, RasterError::PageOutOfRange { page: 3, page_count: 2 }));
    }

    #[test]
    fn rasterize_scales_page_geometry() {
        let mut engine = LopdfRasterizer::new();
        let handle = engine.open(blank_pdf(1, LETTER)).expect("open should succeed");

        let image = engine.rasterize(handle, 1, 2.0).expect("rasterize should succeed");
        assert_eq!(image.width(), 1224);
        assert_eq!(image.height(), 1584);

        // Same request twice yields identical geometry
        let again = engine.rasterize(handle, 1, 2.0).expect("rasterize should succeed");
        assert_eq!(again.dimensions(), image.dimensions());
    }

    #[test]
    fn invalid_handle_returns_error() {
        let engine = LopdfRasterizer::new();
        let err = engine.page_count(PdfHandle(999)).expect_err("should fail for unknown handle");

        assert!(matches!(err, RasterError::InvalidHandle(999)));
    }

    #[test]
    fn close_releases_handle() {
        let mut engine = LopdfRasterizer::new();
        let handle = engine.open(blank_pdf(1, LETTER)).expect("open should succeed");

        engine.close(handle).expect("close should succeed");
        assert!(engine.page_count(handle).is_err());
    }

    #[test]
    fn encrypted_pdf_is_rejected() {
        let mut bytes = blank_pdf(1, LETTER);
        bytes.extend_from_slice(b"/Encrypt");

        let mut engine = LopdfRasterizer::new();
        let err = engine.open(bytes).expect_err("encrypted marker should be rejected");
        assert!(matches!(err, RasterError::EncryptedUnsupported));
    }
}
