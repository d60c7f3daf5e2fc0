//! Stamp data model and store
//!
//! A stamp is a positioned, styled annotation (shape plus optional label)
//! overlaid on a document page. Positions are stored in document-space
//! coordinates so zooming and panning never mutate stamp data; the caller
//! converts pointer coordinates through the viewport before calling in.

use docstamp_viewer::DocPoint;

/// Unique identifier for a stamp
///
/// Stable for the lifetime of the stamp. Generated with UUID v4 so ids
/// never collide within a session.
pub type StampId = uuid::Uuid;

/// Default position for a freshly added stamp, in document space.
pub const DEFAULT_STAMP_POSITION: DocPoint = DocPoint { x: 50.0, y: 50.0 };

/// RGBA fill color
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rrggbb` or `#rrggbbaa` (the wire format stamp colors use).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        let byte = |range: std::ops::Range<usize>| {
            digits.get(range).and_then(|pair| u8::from_str_radix(pair, 16).ok())
        };

        match digits.len() {
            6 => Some(Self::rgb(byte(0..2)?, byte(2..4)?, byte(4..6)?)),
            8 => Some(Self::new(byte(0..2)?, byte(2..4)?, byte(4..6)?, byte(6..8)?)),
            _ => None,
        }
    }

    /// Lowercase `#rrggbb` form; alpha is dropped.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
}

/// Stamp geometry, sized in document-space units
///
/// For rectangles the stamp position is the top-left corner; for circles
/// it is the center.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum StampShape {
    Rectangle { width: f32, height: f32 },
    Circle { radius: f32 },
}

impl StampShape {
    /// Default rectangle stamp, 100x50.
    pub fn rectangle() -> Self {
        Self::Rectangle { width: 100.0, height: 50.0 }
    }

    /// Default circle stamp, radius 50.
    pub fn circle() -> Self {
        Self::Circle { radius: 50.0 }
    }

    /// Whether `point` falls inside the filled shape anchored at
    /// `position`. Used for hit testing against pointer events.
    fn contains(&self, position: DocPoint, point: DocPoint) -> bool {
        match *self {
            StampShape::Rectangle { width, height } => {
                point.x >= position.x
                    && point.x <= position.x + width
                    && point.y >= position.y
                    && point.y <= position.y + height
            }
            StampShape::Circle { radius } => {
                let dx = point.x - position.x;
                let dy = point.y - position.y;
                dx * dx + dy * dy <= radius * radius
            }
        }
    }
}

/// A positioned, styled annotation on one document page
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Stamp {
    id: StampId,
    page_index: u32,
    position: DocPoint,
    shape: StampShape,
    color: Color,
    text: Option<String>,
}

impl Stamp {
    pub fn id(&self) -> StampId {
        self.id
    }

    /// 1-based page this stamp belongs to.
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// Position in document space.
    pub fn position(&self) -> DocPoint {
        self.position
    }

    pub fn shape(&self) -> StampShape {
        self.shape
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn hit_test(&self, point: DocPoint) -> bool {
        self.shape.contains(self.position, point)
    }
}

/// Partial style update: `None` fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct Restyle {
    pub color: Option<Color>,
    pub text: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StampError {
    #[error("no stamp with id {0}")]
    NotFound(StampId),
}

/// Owns every stamp of the current editing session
///
/// Backed by a single vector: insertion order defines z-order, so the
/// last-added stamp renders on top and `list_for_page` is deterministic.
#[derive(Debug, Default)]
pub struct StampStore {
    stamps: Vec<Stamp>,
}

impl StampStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stamp with a fresh id and append it (topmost in z-order).
    pub fn add(
        &mut self,
        page_index: u32,
        position: DocPoint,
        shape: StampShape,
        color: Color,
        text: Option<String>,
    ) -> Stamp {
        let stamp = Stamp {
            id: StampId::new_v4(),
            page_index,
            position,
            shape,
            color,
            text,
        };
        self.stamps.push(stamp.clone());
        stamp
    }

    /// Move a stamp to a new document-space position. Only the position
    /// changes; id, shape, color, text and page stay as they were.
    pub fn move_stamp(&mut self, id: StampId, position: DocPoint) -> Result<(), StampError> {
        let stamp = self.find_mut(id)?;
        stamp.position = position;
        Ok(())
    }

    pub fn remove(&mut self, id: StampId) -> Result<Stamp, StampError> {
        let index = self
            .stamps
            .iter()
            .position(|stamp| stamp.id == id)
            .ok_or(StampError::NotFound(id))?;
        Ok(self.stamps.remove(index))
    }

    /// Remove every stamp on `page_index`, or the whole store when `None`.
    pub fn remove_all(&mut self, page_index: Option<u32>) {
        match page_index {
            Some(page) => self.stamps.retain(|stamp| stamp.page_index != page),
            None => self.stamps.clear(),
        }
    }

    /// Apply a partial style update; unspecified fields are unchanged.
    pub fn restyle(&mut self, id: StampId, restyle: Restyle) -> Result<(), StampError> {
        let stamp = self.find_mut(id)?;
        if let Some(color) = restyle.color {
            stamp.color = color;
        }
        if let Some(text) = restyle.text {
            stamp.text = Some(text);
        }
        Ok(())
    }

    /// Stamps on a page in insertion (z) order, bottom to top.
    pub fn list_for_page(&self, page_index: u32) -> Vec<&Stamp> {
        self.stamps.iter().filter(|stamp| stamp.page_index == page_index).collect()
    }

    /// Topmost stamp on `page_index` containing `point`, if any.
    pub fn hit_test(&self, page_index: u32, point: DocPoint) -> Option<&Stamp> {
        self.stamps
            .iter()
            .rev()
            .find(|stamp| stamp.page_index == page_index && stamp.hit_test(point))
    }

    pub fn get(&self, id: StampId) -> Option<&Stamp> {
        self.stamps.iter().find(|stamp| stamp.id == id)
    }

    pub fn all(&self) -> &[Stamp] {
        &self.stamps
    }

    /// Replace the whole store contents, e.g. from a persisted archive.
    pub fn replace_all(&mut self, stamps: Vec<Stamp>) {
        self.stamps = stamps;
    }

    pub fn clear(&mut self) {
        self.stamps.clear();
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    fn find_mut(&mut self, id: StampId) -> Result<&mut Stamp, StampError> {
        self.stamps
            .iter_mut()
            .find(|stamp| stamp.id == id)
            .ok_or(StampError::NotFound(id))
    }
}
