//! Canvas composition
//!
//! Draws a page raster as the base layer and the page's stamps on top, in
//! z-order, under one zoom/pan transform. The live viewport and the
//! exporter both go through [`compose_into`], so a stamp is visually
//! anchored to the same document content on screen and in exports.

use crate::document::PageImage;
use crate::stamp::{Color, Stamp, StampShape};
use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use docstamp_viewer::ViewportState;
use docstamp_engine::RgbaImage;
use image::Rgba;

/// Label font size in document-space units, scaled with the transform.
const LABEL_SIZE: f32 = 16.0;

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("invalid font data")]
    InvalidFont,
}

/// Font used for stamp labels
///
/// Supplied by the host application (no font asset ships with the core).
/// Labels are skipped when no font is configured; shapes always draw.
#[derive(Clone)]
pub struct StampFont {
    font: FontArc,
}

impl StampFont {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, FontError> {
        let font = FontArc::try_from_vec(bytes).map_err(|_| FontError::InvalidFont)?;
        Ok(Self { font })
    }
}

/// Render a page plus its stamps into a surface of the given pixel size,
/// at the viewport's current zoom and pan.
pub fn render_viewport(
    page: &PageImage,
    stamps: &[&Stamp],
    viewport: &ViewportState,
    surface_width: u32,
    surface_height: u32,
    font: Option<&StampFont>,
) -> RgbaImage {
    let mut surface =
        RgbaImage::from_pixel(surface_width.max(1), surface_height.max(1), Rgba([245, 245, 245, 255]));
    let (pan_x, pan_y) = viewport.pan();
    compose_into(&mut surface, page, stamps, viewport.zoom(), pan_x, pan_y, font);
    surface
}

/// Flatten a page plus its stamps at `pixel_ratio`, ignoring the live
/// viewport entirely. This is the deterministic surface exports read.
pub fn flatten(
    page: &PageImage,
    stamps: &[&Stamp],
    pixel_ratio: f32,
    font: Option<&StampFont>,
) -> RgbaImage {
    let ratio = if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 };
    let width = (page.pixel_width() as f32 * ratio).round().max(1.0) as u32;
    let height = (page.pixel_height() as f32 * ratio).round().max(1.0) as u32;

    let mut surface = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    compose_into(&mut surface, page, stamps, ratio, 0.0, 0.0, font);
    surface
}

/// Draw page then stamps into `target` under `screen = doc * zoom + pan`.
fn compose_into(
    target: &mut RgbaImage,
    page: &PageImage,
    stamps: &[&Stamp],
    zoom: f32,
    pan_x: f32,
    pan_y: f32,
    font: Option<&StampFont>,
) {
    let page_width = (page.pixel_width() as f32 * zoom).round().max(1.0) as u32;
    let page_height = (page.pixel_height() as f32 * zoom).round().max(1.0) as u32;

    if (page_width, page_height) == page.bitmap().dimensions() {
        image::imageops::overlay(target, page.bitmap(), pan_x as i64, pan_y as i64);
    } else {
        let scaled = image::imageops::resize(
            page.bitmap(),
            page_width,
            page_height,
            image::imageops::FilterType::Triangle,
        );
        image::imageops::overlay(target, &scaled, pan_x as i64, pan_y as i64);
    }

    for stamp in stamps {
        draw_stamp(target, stamp, zoom, pan_x, pan_y, font);
    }
}

fn draw_stamp(
    target: &mut RgbaImage,
    stamp: &Stamp,
    zoom: f32,
    pan_x: f32,
    pan_y: f32,
    font: Option<&StampFont>,
) {
    let pos = stamp.position();
    let x = pos.x * zoom + pan_x;
    let y = pos.y * zoom + pan_y;
    let fill = to_pixel(stamp.color());

    let label_center = match stamp.shape() {
        StampShape::Rectangle { width, height } => {
            let w = width * zoom;
            let h = height * zoom;
            fill_rect(target, x, y, w, h, fill);
            (x + w / 2.0, y + h / 2.0)
        }
        StampShape::Circle { radius } => {
            let r = radius * zoom;
            fill_circle(target, x, y, r, fill);
            (x, y)
        }
    };

    if let (Some(font), Some(text)) = (font, stamp.text()) {
        // White reads against every stamp fill the UI offers
        draw_label(target, font, text, label_center, LABEL_SIZE * zoom, Rgba([255, 255, 255, 255]));
    }
}

fn to_pixel(color: Color) -> Rgba<u8> {
    Rgba([color.r, color.g, color.b, color.a])
}

fn fill_rect(target: &mut RgbaImage, x: f32, y: f32, width: f32, height: f32, fill: Rgba<u8>) {
    let x0 = x.floor().max(0.0) as i64;
    let y0 = y.floor().max(0.0) as i64;
    let x1 = ((x + width).ceil() as i64).min(target.width() as i64);
    let y1 = ((y + height).ceil() as i64).min(target.height() as i64);

    for py in y0..y1 {
        for px in x0..x1 {
            target.put_pixel(px as u32, py as u32, fill);
        }
    }
}

fn fill_circle(target: &mut RgbaImage, cx: f32, cy: f32, radius: f32, fill: Rgba<u8>) {
    let x0 = ((cx - radius).floor().max(0.0)) as i64;
    let y0 = ((cy - radius).floor().max(0.0)) as i64;
    let x1 = (((cx + radius).ceil()) as i64).min(target.width() as i64);
    let y1 = (((cy + radius).ceil()) as i64).min(target.height() as i64);
    let radius_sq = radius * radius;

    for py in y0..y1 {
        for px in x0..x1 {
            let dx = px as f32 + 0.5 - cx;
            let dy = py as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= radius_sq {
                target.put_pixel(px as u32, py as u32, fill);
            }
        }
    }
}

fn draw_label(
    target: &mut RgbaImage,
    font: &StampFont,
    text: &str,
    center: (f32, f32),
    px: f32,
    fill: Rgba<u8>,
) {
    let scale = PxScale::from(px.max(1.0));
    let scaled = font.font.as_scaled(scale);

    let width: f32 = text.chars().map(|c| scaled.h_advance(scaled.glyph_id(c))).sum();
    let mut caret = center.0 - width / 2.0;
    // Descent is negative; this centers the cap box on the anchor
    let baseline = center.1 + (scaled.ascent() + scaled.descent()) / 2.0;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        let glyph = id.with_scale_and_position(scale, ab_glyph::point(caret, baseline));
        caret += scaled.h_advance(id);

        let Some(outlined) = font.font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        let (max_x, max_y) = (target.width() as i32, target.height() as i32);
        outlined.draw(|gx, gy, coverage| {
            let x = bounds.min.x as i32 + gx as i32;
            let y = bounds.min.y as i32 + gy as i32;
            if coverage > 0.5 && x >= 0 && y >= 0 && x < max_x && y < max_y {
                target.put_pixel(x as u32, y as u32, fill);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stamp::StampStore;
    use docstamp_viewer::{DocPoint, ScreenPoint};

    fn white_page(width: u32, height: u32) -> PageImage {
        PageImage::new(1, RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])))
    }

    #[test]
    fn flatten_draws_stamp_at_scaled_position() {
        let page = white_page(200, 100);
        let mut store = StampStore::new();
        store.add(
            1,
            DocPoint::new(120.0, 80.0),
            StampShape::Rectangle { width: 40.0, height: 10.0 },
            Color::RED,
            None,
        );

        let stamps = store.list_for_page(1);
        let surface = flatten(&page, &stamps, 2.0, None);

        assert_eq!(surface.dimensions(), (400, 200));
        // Inside the stamp (document (125, 82) -> surface (250, 164))
        assert_eq!(*surface.get_pixel(250, 164), Rgba([255, 0, 0, 255]));
        // Just outside the stamp
        assert_eq!(*surface.get_pixel(230, 150), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn later_stamps_draw_on_top() {
        let page = white_page(100, 100);
        let mut store = StampStore::new();
        store.add(
            1,
            DocPoint::new(10.0, 10.0),
            StampShape::Rectangle { width: 40.0, height: 40.0 },
            Color::RED,
            None,
        );
        store.add(
            1,
            DocPoint::new(30.0, 30.0),
            StampShape::Rectangle { width: 40.0, height: 40.0 },
            Color::BLUE,
            None,
        );

        let stamps = store.list_for_page(1);
        let surface = flatten(&page, &stamps, 1.0, None);

        // Overlap region belongs to the later (topmost) stamp
        assert_eq!(*surface.get_pixel(35, 35), Rgba([0, 0, 255, 255]));
        // Non-overlapping part of the first stamp is untouched
        assert_eq!(*surface.get_pixel(15, 15), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn viewport_render_applies_zoom_and_pan() {
        let page = white_page(100, 100);
        let mut store = StampStore::new();
        store.add(
            1,
            DocPoint::new(20.0, 20.0),
            StampShape::Rectangle { width: 10.0, height: 10.0 },
            Color::RED,
            None,
        );

        let mut viewport = ViewportState::default();
        viewport.pan_by(50.0, 30.0);
        viewport.zoom_at(ScreenPoint::new(50.0, 30.0), 1.0); // zoom 2.0, anchored at pan origin

        let stamps = store.list_for_page(1);
        let surface = render_viewport(&page, &stamps, &viewport, 300, 300, None);

        // Stamp center, document (25, 25) -> screen (25*2+50, 25*2+30)
        assert_eq!(*surface.get_pixel(100, 80), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn circle_fill_respects_radius() {
        let page = white_page(100, 100);
        let mut store = StampStore::new();
        store.add(1, DocPoint::new(50.0, 50.0), StampShape::Circle { radius: 20.0 }, Color::BLUE, None);

        let stamps = store.list_for_page(1);
        let surface = flatten(&page, &stamps, 1.0, None);

        assert_eq!(*surface.get_pixel(50, 50), Rgba([0, 0, 255, 255]));
        assert_eq!(*surface.get_pixel(50, 65), Rgba([0, 0, 255, 255]));
        // Outside the radius along the diagonal
        assert_eq!(*surface.get_pixel(66, 66), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn export_surface_is_independent_of_viewport_state() {
        let page = white_page(64, 64);
        let mut store = StampStore::new();
        store.add(
            1,
            DocPoint::new(8.0, 8.0),
            StampShape::Rectangle { width: 16.0, height: 16.0 },
            Color::RED,
            None,
        );
        let stamps = store.list_for_page(1);

        let flat = flatten(&page, &stamps, 2.0, None);

        let mut viewport = ViewportState::default();
        viewport.pan_by(-31.0, 17.0);
        viewport.zoom_at(ScreenPoint::new(10.0, 10.0), 0.7);
        let flat_after_viewport_changes = flatten(&page, &stamps, 2.0, None);

        assert_eq!(flat.as_raw(), flat_after_viewport_changes.as_raw());
    }
}
