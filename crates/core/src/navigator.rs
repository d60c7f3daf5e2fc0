//! Page navigation with cache-aware rasterization
//!
//! Tracks the current 1-based page index against the document's page
//! count, serves repeated visits from an LRU cache keyed by
//! (document id, page index), and discards stale rasterization responses
//! by generation check so rapid page-flipping can never display the wrong
//! page.

use crate::document::{Document, DocumentId, PageImage, SourceKind};
use docstamp_engine::{RasterError, Rasterizer, RgbaImage};
use docstamp_viewer::LruCache;

/// Pages kept in the navigator cache. Rasters are shared `Arc`s, so this
/// bounds memory, not correctness.
pub const PAGE_CACHE_CAPACITY: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("page {page} out of range (page_count={page_count})")]
    OutOfRange { page: u32, page_count: u32 },
    #[error("rasterization error: {0}")]
    Raster(#[from] RasterError),
}

/// Ticket identifying one in-flight rasterization request
///
/// Issued by [`PageNavigator::begin_request`]; a completion presented with
/// a ticket from a superseded request is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterTicket {
    generation: u64,
    page: u32,
}

impl RasterTicket {
    pub fn page(&self) -> u32 {
        self.page
    }
}

/// Tracks and materializes the current page of a document
#[derive(Debug)]
pub struct PageNavigator {
    current_page: u32,
    generation: u64,
    cache: LruCache<(DocumentId, u32), PageImage>,
}

impl PageNavigator {
    pub fn new() -> Self {
        Self { current_page: 1, generation: 0, cache: LruCache::new(PAGE_CACHE_CAPACITY) }
    }

    /// 1-based index of the page currently shown.
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Navigate to `page`, materializing its raster from cache or the
    /// rasterization service. Out-of-range requests fail and leave the
    /// current page unchanged.
    pub fn go_to(
        &mut self,
        document: &Document,
        rasterizer: &dyn Rasterizer,
        page: u32,
    ) -> Result<PageImage, NavigationError> {
        self.check_bounds(document, page)?;

        // A synchronous navigation supersedes any in-flight request.
        self.generation += 1;

        let key = (document.id(), page);
        if let Some(cached) = self.cache.get(&key) {
            let image = cached.clone();
            self.current_page = page;
            return Ok(image);
        }

        let image = self.materialize(document, rasterizer, page)?;
        self.cache.insert(key, image.clone());
        self.current_page = page;
        Ok(image)
    }

    /// Advance one page. A no-op (not an error) on the last page, matching
    /// the disabled-button affordance of the hosting UI.
    pub fn next(
        &mut self,
        document: &Document,
        rasterizer: &dyn Rasterizer,
    ) -> Result<PageImage, NavigationError> {
        let target = (self.current_page + 1).min(document.page_count());
        self.go_to(document, rasterizer, target)
    }

    /// Go back one page; no-op on page 1.
    pub fn previous(
        &mut self,
        document: &Document,
        rasterizer: &dyn Rasterizer,
    ) -> Result<PageImage, NavigationError> {
        let target = self.current_page.saturating_sub(1).max(1);
        self.go_to(document, rasterizer, target)
    }

    /// Start an asynchronous navigation to `page`. The returned ticket
    /// must be passed back to [`PageNavigator::complete_request`] with the
    /// rasterized bitmap; only the most recently issued ticket is applied.
    pub fn begin_request(
        &mut self,
        document: &Document,
        page: u32,
    ) -> Result<RasterTicket, NavigationError> {
        self.check_bounds(document, page)?;
        self.generation += 1;
        Ok(RasterTicket { generation: self.generation, page })
    }

    /// Apply a completed rasterization. Returns `None` when the ticket is
    /// stale, meaning the caller issued a newer request (or navigated
    /// synchronously) while this one was in flight; the result is then
    /// silently dropped and the current page is untouched.
    pub fn complete_request(
        &mut self,
        document: &Document,
        ticket: RasterTicket,
        bitmap: RgbaImage,
    ) -> Option<PageImage> {
        if ticket.generation != self.generation {
            log::debug!(
                "discarding stale raster for page {} (generation {} != {})",
                ticket.page,
                ticket.generation,
                self.generation
            );
            return None;
        }

        let image = PageImage::new(ticket.page, bitmap);
        self.cache.insert((document.id(), ticket.page), image.clone());
        self.current_page = ticket.page;
        Some(image)
    }

    /// Reset for a new document: drops the whole cache, returns to page 1
    /// and invalidates any in-flight request.
    pub fn invalidate(&mut self) {
        self.cache.clear();
        self.current_page = 1;
        self.generation += 1;
    }

    fn check_bounds(&self, document: &Document, page: u32) -> Result<(), NavigationError> {
        if page < 1 || page > document.page_count() {
            return Err(NavigationError::OutOfRange {
                page,
                page_count: document.page_count(),
            });
        }
        Ok(())
    }

    fn materialize(
        &self,
        document: &Document,
        rasterizer: &dyn Rasterizer,
        page: u32,
    ) -> Result<PageImage, NavigationError> {
        if page == 1 || document.source_kind() == SourceKind::SingleImage {
            return Ok(document.first_page().clone());
        }

        // Bounds were checked, so a handle must exist for page > 1.
        let handle = document.pdf_handle().ok_or(NavigationError::OutOfRange {
            page,
            page_count: document.page_count(),
        })?;
        let bitmap = rasterizer.rasterize(handle, page, document.raster_scale())?;
        Ok(PageImage::new(page, bitmap))
    }
}

impl Default for PageNavigator {
    fn default() -> Self {
        Self::new()
    }
}
