//! Viewport state and coordinate transforms
//!
//! All transform math between screen space and document space lives here,
//! as a single forward and a single inverse function, so drag handling and
//! anchor-preserving zoom share one source of truth. Also provides the
//! small LRU cache the page navigator uses for rasterized pages.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Point in document space: relative to the unscaled page image,
/// invariant under zoom and pan.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DocPoint {
    pub x: f32,
    pub y: f32,
}

impl DocPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Point in screen space: relative to the visible viewport, dependent on
/// the current zoom and pan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ViewportError {
    #[error("invalid zoom bounds: min {min} must be positive and not exceed max {max}")]
    InvalidZoomBounds { min: f32, max: f32 },
}

/// Allowed zoom range for a viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomBounds {
    min: f32,
    max: f32,
}

impl ZoomBounds {
    pub fn new(min: f32, max: f32) -> Result<Self, ViewportError> {
        if min <= 0.0 || min > max {
            return Err(ViewportError::InvalidZoomBounds { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn clamp(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min, self.max)
    }
}

impl Default for ZoomBounds {
    fn default() -> Self {
        Self { min: 0.5, max: 3.0 }
    }
}

/// Presentational viewport state: zoom scalar plus pan offset
///
/// Never persisted. Forward transform: `screen = doc * zoom + pan`.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportState {
    zoom: f32,
    pan_x: f32,
    pan_y: f32,
    bounds: ZoomBounds,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self { zoom: 1.0, pan_x: 0.0, pan_y: 0.0, bounds: ZoomBounds::default() }
    }
}

impl ViewportState {
    pub fn new(bounds: ZoomBounds) -> Self {
        Self { zoom: bounds.clamp(1.0), pan_x: 0.0, pan_y: 0.0, bounds }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> (f32, f32) {
        (self.pan_x, self.pan_y)
    }

    pub fn bounds(&self) -> ZoomBounds {
        self.bounds
    }

    /// Forward transform into screen space.
    pub fn document_to_screen(&self, point: DocPoint) -> ScreenPoint {
        ScreenPoint::new(point.x * self.zoom + self.pan_x, point.y * self.zoom + self.pan_y)
    }

    /// Inverse transform into document space. Exact algebraic inverse of
    /// [`ViewportState::document_to_screen`].
    pub fn screen_to_document(&self, point: ScreenPoint) -> DocPoint {
        DocPoint::new((point.x - self.pan_x) / self.zoom, (point.y - self.pan_y) / self.zoom)
    }

    /// Pan the whole canvas by a screen-space delta.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Zoom by `delta`, keeping the document point under `anchor` fixed on
    /// screen. The new zoom is clamped to the configured bounds; at a
    /// bound the pan is still recomputed so the anchor law holds for the
    /// clamped zoom.
    pub fn zoom_at(&mut self, anchor: ScreenPoint, delta: f32) {
        let target = self.bounds.clamp(self.zoom + delta);
        let anchored = self.screen_to_document(anchor);

        self.zoom = target;
        self.pan_x = anchor.x - anchored.x * self.zoom;
        self.pan_y = anchor.y - anchored.y * self.zoom;
    }
}

/// Insertion-order LRU cache with a fixed capacity
#[derive(Debug, Clone)]
pub struct LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    capacity: usize,
    map: HashMap<K, V>,
    order: VecDeque<K>,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), map: HashMap::new(), order: VecDeque::new() }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        if self.map.contains_key(key) {
            self.touch(key);
        }

        self.map.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        let existed = self.map.insert(key.clone(), value).is_some();

        if existed {
            self.touch(&key);
            return;
        }

        self.order.push_back(key);

        while self.map.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.map.remove(&oldest);
            }
        }
    }

    /// Drop every entry. Used when a new document replaces the old one.
    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }

    fn touch(&mut self, key: &K) {
        if let Some(index) = self.order.iter().position(|existing| existing == key) {
            let Some(found) = self.order.remove(index) else {
                return;
            };
            self.order.push_back(found);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < EPSILON, "{a} != {b}");
    }

    #[test]
    fn transform_round_trip_is_identity() {
        let mut state = ViewportState::default();
        state.pan_by(37.5, -12.25);
        state.zoom_at(ScreenPoint::new(100.0, 80.0), 0.75);

        for &(x, y) in &[(0.0, 0.0), (50.0, 50.0), (123.4, 567.8), (-20.0, 315.0)] {
            let screen = ScreenPoint::new(x, y);
            let back = state.document_to_screen(state.screen_to_document(screen));
            assert_close(back.x, screen.x);
            assert_close(back.y, screen.y);

            let doc = DocPoint::new(x, y);
            let back = state.screen_to_document(state.document_to_screen(doc));
            assert_close(back.x, doc.x);
            assert_close(back.y, doc.y);
        }
    }

    #[test]
    fn zoom_at_keeps_anchor_point_fixed() {
        let mut state = ViewportState::default();
        state.pan_by(-40.0, 25.0);

        let anchor = ScreenPoint::new(200.0, 150.0);
        let before = state.screen_to_document(anchor);

        state.zoom_at(anchor, 0.5);
        let after = state.screen_to_document(anchor);

        assert_close(before.x, after.x);
        assert_close(before.y, after.y);
        assert_close(state.zoom(), 1.5);
    }

    #[test]
    fn zoom_is_clamped_to_bounds() {
        let mut state = ViewportState::default();

        state.zoom_at(ScreenPoint::new(0.0, 0.0), 10.0);
        assert_close(state.zoom(), 3.0);

        state.zoom_at(ScreenPoint::new(0.0, 0.0), -10.0);
        assert_close(state.zoom(), 0.5);
    }

    #[test]
    fn anchor_law_holds_at_clamped_bound() {
        let mut state = ViewportState::default();
        let anchor = ScreenPoint::new(320.0, 240.0);
        let before = state.screen_to_document(anchor);

        // Push past the max; zoom clamps but the anchor stays fixed
        state.zoom_at(anchor, 99.0);
        let after = state.screen_to_document(anchor);

        assert_close(before.x, after.x);
        assert_close(before.y, after.y);
    }

    #[test]
    fn custom_bounds_are_validated() {
        assert!(ZoomBounds::new(0.25, 4.0).is_ok());
        assert!(matches!(
            ZoomBounds::new(0.0, 4.0),
            Err(ViewportError::InvalidZoomBounds { .. })
        ));
        assert!(matches!(
            ZoomBounds::new(2.0, 1.0),
            Err(ViewportError::InvalidZoomBounds { .. })
        ));
    }

    #[test]
    fn lru_cache_evicts_oldest_entry() {
        let mut cache = LruCache::new(2);

        cache.insert(1_u32, "one");
        cache.insert(2_u32, "two");
        cache.insert(3_u32, "three");

        assert!(!cache.contains_key(&1));
        assert!(cache.contains_key(&2));
        assert!(cache.contains_key(&3));
    }

    #[test]
    fn lru_cache_refreshes_recently_accessed_entry() {
        let mut cache = LruCache::new(2);

        cache.insert(1_u32, "one");
        cache.insert(2_u32, "two");

        let _ = cache.get(&1);
        cache.insert(3_u32, "three");

        assert!(cache.contains_key(&1));
        assert!(!cache.contains_key(&2));
        assert!(cache.contains_key(&3));
    }

    #[test]
    fn lru_cache_clear_empties_everything() {
        let mut cache = LruCache::new(4);
        cache.insert(1_u32, "one");
        cache.insert(2_u32, "two");

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains_key(&1));
    }
}
