//! Export pipeline
//!
//! Flattens the current page and its stamps into a PNG at a fixed pixel
//! ratio, independent of the live viewport, and optionally wraps that
//! raster as a single-page PDF with the image embedded as an XObject.

use crate::document::PageImage;
use crate::render::{flatten, StampFont};
use crate::stamp::Stamp;
use lopdf::{dictionary, Object, Stream};

/// Fixed download names for exported artifacts.
pub const IMAGE_EXPORT_FILENAME: &str = "stamped-document.png";
pub const PDF_EXPORT_FILENAME: &str = "stamped-document.pdf";

/// High-DPI factor applied to exports by default.
pub const DEFAULT_PIXEL_RATIO: f32 = 2.0;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no document loaded")]
    NoDocumentLoaded,
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flattens rendered compositions into downloadable artifacts
///
/// Export output depends only on the page raster, the stamps and the
/// configured pixel ratio, never on the user's current zoom or pan.
pub struct Exporter {
    pixel_ratio: f32,
    font: Option<StampFont>,
}

impl Exporter {
    pub fn new() -> Self {
        Self { pixel_ratio: DEFAULT_PIXEL_RATIO, font: None }
    }

    pub fn with_pixel_ratio(mut self, ratio: f32) -> Self {
        self.pixel_ratio = if ratio > 0.0 { ratio } else { DEFAULT_PIXEL_RATIO };
        self
    }

    /// Configure the label font. Without one, stamp shapes still export
    /// but text labels are omitted from the raster.
    pub fn with_font(mut self, font: StampFont) -> Self {
        self.font = Some(font);
        self
    }

    pub fn set_font(&mut self, font: StampFont) {
        self.font = Some(font);
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Flatten `page` plus `stamps` to PNG bytes.
    ///
    /// `None` means nothing is loaded and fails with
    /// [`ExportError::NoDocumentLoaded`] instead of producing a blank
    /// artifact.
    pub fn export_raster(
        &self,
        page: Option<&PageImage>,
        stamps: &[&Stamp],
    ) -> Result<Vec<u8>, ExportError> {
        let page = page.ok_or(ExportError::NoDocumentLoaded)?;
        let surface = flatten(page, stamps, self.pixel_ratio, self.font.as_ref());

        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(surface)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Wrap a raster export as a single-page PDF sized `page_width_pt` x
    /// `page_height_pt` (callers derive these from the raster so the page
    /// matches its aspect ratio). The raster is embedded as an RGB image
    /// XObject with its alpha channel as a soft mask.
    pub fn export_document(
        &self,
        raster_png: &[u8],
        page_width_pt: f32,
        page_height_pt: f32,
    ) -> Result<Vec<u8>, ExportError> {
        if raster_png.is_empty() {
            return Err(ExportError::NoDocumentLoaded);
        }

        let raster = image::load_from_memory(raster_png)?.to_rgba8();
        let (width, height) = raster.dimensions();

        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in raster.pixels() {
            rgb.push(pixel[0]);
            rgb.push(pixel[1]);
            rgb.push(pixel[2]);
            alpha.push(pixel[3]);
        }

        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let smask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        ));

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "SMask" => smask_id,
            },
            rgb,
        ));

        let content = format!("q {page_width_pt} 0 0 {page_height_pt} 0 0 cm /Im0 Do Q");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let resources = dictionary! {
            "XObject" => Object::Dictionary(dictionary! { "Im0" => image_id }),
        };
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(page_width_pt),
                Object::Real(page_height_pt),
            ],
            "Contents" => content_id,
            "Resources" => Object::Dictionary(resources),
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut std::io::Cursor::new(&mut bytes))?;
        Ok(bytes)
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}
