//! Document Stamping Core Library
//!
//! Document and stamp state model for the stamping tool.

pub mod document;
pub mod export;
pub mod loader;
pub mod navigator;
pub mod persistence;
pub mod render;
pub mod session;
pub mod stamp;

pub use document::{Document, DocumentError, DocumentId, PageImage, SourceKind};
pub use export::{
    ExportError, Exporter, DEFAULT_PIXEL_RATIO, IMAGE_EXPORT_FILENAME, PDF_EXPORT_FILENAME,
};
pub use loader::{DocumentLoader, DEFAULT_PDF_SCALE};
pub use navigator::{NavigationError, PageNavigator, RasterTicket, PAGE_CACHE_CAPACITY};
pub use persistence::{JsonStampArchive, MemoryStampArchive, PersistenceError, StampArchive};
pub use render::{flatten, render_viewport, FontError, StampFont};
pub use session::{EditSession, SessionError};
pub use stamp::{
    Color, Restyle, Stamp, StampError, StampId, StampShape, StampStore, DEFAULT_STAMP_POSITION,
};
