//! Editing session facade
//!
//! Ties the loader, stamp store, page navigator, viewport and exporter
//! together behind the operations a host UI actually performs: load a
//! file, flip pages, place and drag stamps with pointer coordinates,
//! render the canvas, export. Pointer input arrives in screen space and is
//! converted through the viewport exactly once, here.

use crate::document::{Document, DocumentError, PageImage};
use crate::export::{ExportError, Exporter};
use crate::loader::DocumentLoader;
use crate::navigator::{NavigationError, PageNavigator};
use crate::persistence::{PersistenceError, StampArchive};
use crate::render::{render_viewport, StampFont};
use crate::stamp::{
    Color, Restyle, Stamp, StampError, StampId, StampShape, StampStore, DEFAULT_STAMP_POSITION,
};
use docstamp_engine::{Rasterizer, RgbaImage};
use docstamp_viewer::{ScreenPoint, ViewportState};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no document loaded")]
    NoDocumentLoaded,
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// One user-facing editing session over at most one loaded document
pub struct EditSession<R: Rasterizer> {
    rasterizer: R,
    loader: DocumentLoader,
    document: Option<Document>,
    navigator: PageNavigator,
    stamps: StampStore,
    viewport: ViewportState,
    exporter: Exporter,
    font: Option<StampFont>,
}

impl<R: Rasterizer> EditSession<R> {
    pub fn new(rasterizer: R) -> Self {
        Self {
            rasterizer,
            loader: DocumentLoader::new(),
            document: None,
            navigator: PageNavigator::new(),
            stamps: StampStore::new(),
            viewport: ViewportState::default(),
            exporter: Exporter::new(),
            font: None,
        }
    }

    /// Font used for stamp labels on screen and in exports.
    pub fn set_font(&mut self, font: StampFont) {
        self.exporter.set_font(font.clone());
        self.font = Some(font);
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn current_page(&self) -> u32 {
        self.navigator.current_page()
    }

    /// Load an uploaded file, replacing any current document.
    ///
    /// Decoding happens before any state is touched, so a failed load
    /// leaves the previous document, its stamps and the current page
    /// exactly as they were.
    pub fn load_file(&mut self, bytes: Vec<u8>, mime: &str) -> Result<(), SessionError> {
        let document = self.loader.load(&mut self.rasterizer, bytes, mime)?;

        if let Some(old) = self.document.take() {
            if let Some(handle) = old.pdf_handle() {
                if let Err(err) = self.rasterizer.close(handle) {
                    log::warn!("failed to release superseded document: {err}");
                }
            }
        }

        self.navigator.invalidate();
        self.stamps.clear();
        self.viewport = ViewportState::new(self.viewport.bounds());
        self.document = Some(document);
        Ok(())
    }

    /// Raster of the page currently shown.
    pub fn current_page_image(&mut self) -> Result<PageImage, SessionError> {
        let document = self.document.as_ref().ok_or(SessionError::NoDocumentLoaded)?;
        let page = self.navigator.current_page();
        Ok(self.navigator.go_to(document, &self.rasterizer, page)?)
    }

    pub fn go_to_page(&mut self, page: u32) -> Result<PageImage, SessionError> {
        let document = self.document.as_ref().ok_or(SessionError::NoDocumentLoaded)?;
        Ok(self.navigator.go_to(document, &self.rasterizer, page)?)
    }

    pub fn next_page(&mut self) -> Result<PageImage, SessionError> {
        let document = self.document.as_ref().ok_or(SessionError::NoDocumentLoaded)?;
        Ok(self.navigator.next(document, &self.rasterizer)?)
    }

    pub fn previous_page(&mut self) -> Result<PageImage, SessionError> {
        let document = self.document.as_ref().ok_or(SessionError::NoDocumentLoaded)?;
        Ok(self.navigator.previous(document, &self.rasterizer)?)
    }

    /// Add a stamp at the default position on the current page.
    pub fn add_stamp(
        &mut self,
        shape: StampShape,
        color: Color,
        text: Option<String>,
    ) -> Result<Stamp, SessionError> {
        if self.document.is_none() {
            return Err(SessionError::NoDocumentLoaded);
        }
        let page = self.navigator.current_page();
        Ok(self.stamps.add(page, DEFAULT_STAMP_POSITION, shape, color, text))
    }

    /// Add a stamp under the pointer. The screen position is converted to
    /// document space, so the stamp stays glued to the same document
    /// content whatever the zoom and pan are later.
    pub fn add_stamp_at(
        &mut self,
        at: ScreenPoint,
        shape: StampShape,
        color: Color,
        text: Option<String>,
    ) -> Result<Stamp, SessionError> {
        if self.document.is_none() {
            return Err(SessionError::NoDocumentLoaded);
        }
        let page = self.navigator.current_page();
        let position = self.viewport.screen_to_document(at);
        Ok(self.stamps.add(page, position, shape, color, text))
    }

    /// Drag a stamp to a new pointer position. A stale id is logged and
    /// ignored; returns whether the stamp moved.
    pub fn drag_stamp_to(&mut self, id: StampId, to: ScreenPoint) -> bool {
        let position = self.viewport.screen_to_document(to);
        match self.stamps.move_stamp(id, position) {
            Ok(()) => true,
            Err(StampError::NotFound(id)) => {
                log::warn!("ignoring drag of unknown stamp {id}");
                false
            }
        }
    }

    /// Remove a stamp by id; a stale id is logged and ignored.
    pub fn remove_stamp(&mut self, id: StampId) -> bool {
        match self.stamps.remove(id) {
            Ok(_) => true,
            Err(StampError::NotFound(id)) => {
                log::warn!("ignoring removal of unknown stamp {id}");
                false
            }
        }
    }

    /// Remove the topmost stamp under the pointer (double-click binding).
    pub fn remove_stamp_at(&mut self, at: ScreenPoint) -> Option<StampId> {
        let position = self.viewport.screen_to_document(at);
        let page = self.navigator.current_page();
        let id = self.stamps.hit_test(page, position)?.id();
        self.stamps.remove(id).ok()?;
        Some(id)
    }

    /// Remove every stamp on one page, or on all pages when `None`.
    pub fn remove_all_stamps(&mut self, page: Option<u32>) {
        self.stamps.remove_all(page);
    }

    /// Partial style update; a stale id is logged and ignored.
    pub fn restyle_stamp(&mut self, id: StampId, restyle: Restyle) -> bool {
        match self.stamps.restyle(id, restyle) {
            Ok(()) => true,
            Err(StampError::NotFound(id)) => {
                log::warn!("ignoring restyle of unknown stamp {id}");
                false
            }
        }
    }

    /// Stamps on the page currently shown, bottom to top.
    pub fn stamps_on_current_page(&self) -> Vec<&Stamp> {
        self.stamps.list_for_page(self.navigator.current_page())
    }

    pub fn stamps(&self) -> &StampStore {
        &self.stamps
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.viewport.pan_by(dx, dy);
    }

    pub fn zoom_at(&mut self, anchor: ScreenPoint, delta: f32) {
        self.viewport.zoom_at(anchor, delta);
    }

    /// Render the current page and its stamps into a surface of the given
    /// pixel size under the live viewport transform.
    pub fn render_current(
        &mut self,
        surface_width: u32,
        surface_height: u32,
    ) -> Result<RgbaImage, SessionError> {
        let page = self.current_page_image()?;
        let stamps = self.stamps.list_for_page(page.index());
        Ok(render_viewport(
            &page,
            &stamps,
            &self.viewport,
            surface_width,
            surface_height,
            self.font.as_ref(),
        ))
    }

    /// Export the current page and its stamps as PNG bytes.
    pub fn export_image(&mut self) -> Result<Vec<u8>, SessionError> {
        let page = self.current_page_image()?;
        let stamps = self.stamps.list_for_page(page.index());
        Ok(self.exporter.export_raster(Some(&page), &stamps)?)
    }

    /// Export the current page and its stamps as a single-page PDF. The
    /// page is sized in points from the raster dimensions, undoing the
    /// document's raster scale so a letter-size source stays letter-size.
    pub fn export_pdf(&mut self) -> Result<Vec<u8>, SessionError> {
        let page = self.current_page_image()?;
        let stamps = self.stamps.list_for_page(page.index());
        let png = self.exporter.export_raster(Some(&page), &stamps)?;

        let scale = self
            .document
            .as_ref()
            .ok_or(SessionError::NoDocumentLoaded)?
            .raster_scale();
        let width_pt = page.pixel_width() as f32 / scale;
        let height_pt = page.pixel_height() as f32 / scale;
        Ok(self.exporter.export_document(&png, width_pt, height_pt)?)
    }

    pub fn save_stamps(&self, archive: &dyn StampArchive) -> Result<(), SessionError> {
        archive.save(self.stamps.all())?;
        Ok(())
    }

    /// Replace the stamp store with the archive contents. Returns how many
    /// stamps were restored.
    pub fn load_stamps(&mut self, archive: &dyn StampArchive) -> Result<usize, SessionError> {
        let stamps = archive.load()?;
        let count = stamps.len();
        self.stamps.replace_all(stamps);
        Ok(count)
    }
}
