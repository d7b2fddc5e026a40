use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::util::fresh_id;
use crate::model::geometry::{Corner, Rect, WindowGeometry};
use crate::model::tree::{LeafItem, Params};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct WindowId(String);

impl WindowId {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl Borrow<str> for WindowId {
    fn borrow(&self) -> &str { &self.0 }
}

impl From<&str> for WindowId {
    fn from(value: &str) -> Self { Self::new(value) }
}

/// A panel positioned by absolute geometry, outside the split tree.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FloatingWindow {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub params: LeafItem,
}

impl FloatingWindow {
    pub fn new(rect: Rect, params: LeafItem) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            params,
        }
    }

    pub fn rect(&self) -> Rect { Rect::new(self.x, self.y, self.w, self.h) }

    fn set_rect(&mut self, rect: Rect) {
        self.x = rect.x;
        self.y = rect.y;
        self.w = rect.w;
        self.h = rect.h;
    }
}

/// Registry of floating windows for one application, keyed by window id.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(transparent)]
pub struct FloatingManager {
    windows: BTreeMap<WindowId, FloatingWindow>,
    #[serde(skip)]
    id_counter: u64,
}

impl PartialEq for FloatingManager {
    fn eq(&self, other: &Self) -> bool { self.windows == other.windows }
}

impl FloatingManager {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, id: &str) -> Option<&FloatingWindow> { self.windows.get(id) }

    pub fn contains(&self, id: &str) -> bool { self.windows.contains_key(id) }

    pub fn iter(&self) -> impl Iterator<Item = (&WindowId, &FloatingWindow)> + '_ {
        self.windows.iter()
    }

    pub fn open_window(&mut self, params: LeafItem, rect: Rect) -> WindowId {
        let windows = &self.windows;
        let id = WindowId(fresh_id("w", &mut self.id_counter, |c| windows.contains_key(c)));
        self.windows.insert(id.clone(), FloatingWindow::new(rect, params));
        id
    }

    /// Merge only the supplied geometry fields.
    pub fn move_window(&mut self, id: &str, geometry: &WindowGeometry) -> bool {
        if geometry.is_empty() || !geometry.is_finite() {
            return false;
        }
        if geometry.w.is_some_and(|w| w < 0.0) || geometry.h.is_some_and(|h| h < 0.0) {
            debug!(id, ?geometry, "move_window: negative size");
            return false;
        }
        let Some(window) = self.windows.get_mut(id) else {
            debug!(id, "move_window: unknown window");
            return false;
        };
        let mut rect = window.rect();
        geometry.apply_to(&mut rect);
        window.set_rect(rect);
        true
    }

    /// Drag `corner` by `(dx, dy)`. Position and size change together so the
    /// opposite corner stays where it was.
    pub fn resize_from_corner(
        &mut self,
        id: &str,
        corner: Corner,
        dx: f64,
        dy: f64,
        min: (f64, f64),
    ) -> bool {
        let Some(rect) = self.windows.get(id).map(FloatingWindow::rect) else { return false };
        if !dx.is_finite() || !dy.is_finite() {
            return false;
        }
        let patch = corner.resize(rect, dx, dy, min);
        self.move_window(id, &patch)
    }

    pub fn set_window_params(&mut self, id: &str, patch: &Params) -> bool {
        let Some(window) = self.windows.get_mut(id) else { return false };
        window.params.merge(patch);
        true
    }

    pub fn close_window(&mut self, id: &str) -> bool { self.windows.remove(id).is_some() }

    pub(crate) fn is_well_formed(&self) -> bool {
        self.windows.values().all(|window| {
            let rect = window.rect();
            WindowGeometry::full(rect).is_finite() && rect.w >= 0.0 && rect.h >= 0.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with_window() -> (FloatingManager, WindowId) {
        let mut manager = FloatingManager::new();
        let id = manager.open_window(LeafItem::of_kind("plot"), Rect::new(10.0, 10.0, 200.0, 100.0));
        (manager, id)
    }

    #[test]
    fn open_assigns_unique_ids() {
        let mut manager = FloatingManager::new();
        let a = manager.open_window(LeafItem::empty(), Rect::default());
        let b = manager.open_window(LeafItem::empty(), Rect::default());
        assert_ne!(a, b);
        assert_eq!(manager.iter().count(), 2);
    }

    #[test]
    fn open_skips_ids_taken_by_restored_windows() {
        let mut manager: FloatingManager = serde_json::from_str(
            r#"{"w1":{"x":0.0,"y":0.0,"w":1.0,"h":1.0,"params":{"type":null}}}"#,
        )
        .unwrap();
        let id = manager.open_window(LeafItem::empty(), Rect::default());
        assert_eq!(id.as_str(), "w2");
    }

    #[test]
    fn move_merges_supplied_fields_only() {
        let (mut manager, id) = manager_with_window();
        assert!(manager.move_window(id.as_str(), &WindowGeometry::position(50.0, 60.0)));
        assert_eq!(manager.get(id.as_str()).unwrap().rect(), Rect::new(50.0, 60.0, 200.0, 100.0));

        assert!(manager.move_window(id.as_str(), &WindowGeometry::size(300.0, 150.0)));
        assert_eq!(manager.get(id.as_str()).unwrap().rect(), Rect::new(50.0, 60.0, 300.0, 150.0));
    }

    #[test]
    fn move_rejects_garbage() {
        let (mut manager, id) = manager_with_window();
        let before = manager.clone();
        assert!(!manager.move_window(id.as_str(), &WindowGeometry::default()));
        assert!(!manager.move_window(id.as_str(), &WindowGeometry::position(f64::NAN, 0.0)));
        assert!(!manager.move_window(id.as_str(), &WindowGeometry::size(-1.0, 10.0)));
        assert!(!manager.move_window("ghost", &WindowGeometry::position(0.0, 0.0)));
        assert_eq!(manager, before);
    }

    #[test]
    fn corner_resize_keeps_opposite_corner() {
        let (mut manager, id) = manager_with_window();
        assert!(manager.resize_from_corner(id.as_str(), Corner::TopLeft, 20.0, 10.0, (50.0, 50.0)));
        let rect = manager.get(id.as_str()).unwrap().rect();
        assert_eq!(rect, Rect::new(30.0, 20.0, 180.0, 90.0));
        assert_eq!(rect.x + rect.w, 210.0);
        assert_eq!(rect.y + rect.h, 110.0);
    }

    #[test]
    fn params_merge_and_close() {
        let (mut manager, id) = manager_with_window();
        let patch: Params = serde_json::from_str(r#"{"zoom":2}"#).unwrap();
        assert!(manager.set_window_params(id.as_str(), &patch));
        let window = manager.get(id.as_str()).unwrap();
        assert_eq!(window.params.kind.as_deref(), Some("plot"));
        assert_eq!(window.params.params["zoom"], 2);

        assert!(manager.close_window(id.as_str()));
        assert!(!manager.close_window(id.as_str()));
        assert!(manager.iter().next().is_none());
    }

    #[test]
    fn serializes_as_plain_map() {
        let (manager, id) = manager_with_window();
        let json = serde_json::to_value(&manager).unwrap();
        assert_eq!(
            json[id.as_str()],
            serde_json::json!({"x": 10.0, "y": 10.0, "w": 200.0, "h": 100.0, "params": {"type": "plot"}})
        );
    }
}
