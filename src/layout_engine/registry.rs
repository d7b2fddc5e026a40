use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::common::config::AppDefaults;
use crate::common::util::copy_name;
use crate::layout_engine::SplitDirection;
use crate::layout_engine::drag_swap::{DragState, DragSwapController};
use crate::layout_engine::floating::{FloatingManager, WindowId};
use crate::layout_engine::gesture::{Gesture, GestureCommit};
use crate::layout_engine::panel::{PanelBinding, PanelCatalog, bind_item};
use crate::model::geometry::{Corner, Rect, WindowGeometry};
use crate::model::tree::{LayoutTree, LeafItem, NodeId, Params, ROOT, TreeError};

/// One complete tree + items configuration, selectable by name.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NamedLayout {
    #[serde(flatten)]
    pub layout: LayoutTree,
    #[serde(
        default,
        rename = "ignoreWhenCycling",
        alias = "ignore_when_cycling",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub ignore_when_cycling: bool,
}

impl NamedLayout {
    pub fn new(layout: LayoutTree) -> Self { Self { layout, ignore_when_cycling: false } }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("no layouts")]
    Empty,
    #[error("active layout {0:?} does not exist")]
    MissingActive(String),
    #[error("layout {name:?} is malformed: {source}")]
    Tree {
        name: String,
        #[source]
        source: TreeError,
    },
    #[error("a floating window has non-finite or negative geometry")]
    MalformedWindows,
}

/// A panel whose type the catalog no longer knows.
#[derive(Debug, Clone, PartialEq)]
pub enum MissingPanel {
    Leaf(NodeId, String),
    Window(WindowId, String),
}

/// Named layouts of one application, the active pointer, its floating
/// windows and the transient pointer state that goes with them.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AppLayouts {
    active: String,
    list: BTreeMap<String, NamedLayout>,
    #[serde(default)]
    windows: FloatingManager,
    #[serde(skip)]
    protected: BTreeSet<String>,
    #[serde(skip)]
    drag: DragSwapController,
    #[serde(skip)]
    gesture: Gesture,
}

impl PartialEq for AppLayouts {
    fn eq(&self, other: &Self) -> bool {
        self.active == other.active && self.list == other.list && self.windows == other.windows
    }
}

impl AppLayouts {
    pub fn from_defaults(defaults: &AppDefaults) -> Self {
        let active = defaults.active_name();
        let mut list = defaults.layouts.clone();
        if list.is_empty() {
            list.insert(active.clone(), NamedLayout::default());
        }
        Self {
            protected: list.keys().cloned().collect(),
            active,
            list,
            windows: FloatingManager::default(),
            drag: DragSwapController::default(),
            gesture: Gesture::default(),
        }
    }

    /// Lay a stored registry over the defaults: stored layouts replace
    /// same-named defaults, defaults missing from storage are added. A stored
    /// registry with a malformed tree or window is rejected as a whole; a
    /// stale `active` falls back to the default one.
    pub fn merged_over(defaults: &AppDefaults, stored: AppLayouts) -> Result<Self, RegistryError> {
        stored.validate_contents()?;
        let mut merged = Self::from_defaults(defaults);
        merged.list.extend(stored.list);
        if merged.list.contains_key(&stored.active) {
            merged.active = stored.active;
        }
        merged.windows = stored.windows;
        Ok(merged)
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.list.is_empty() {
            return Err(RegistryError::Empty);
        }
        if !self.list.contains_key(&self.active) {
            return Err(RegistryError::MissingActive(self.active.clone()));
        }
        self.validate_contents()
    }

    fn validate_contents(&self) -> Result<(), RegistryError> {
        for (name, named) in &self.list {
            named
                .layout
                .validate()
                .map_err(|source| RegistryError::Tree { name: name.clone(), source })?;
        }
        if !self.windows.is_well_formed() {
            return Err(RegistryError::MalformedWindows);
        }
        Ok(())
    }

    pub fn active_name(&self) -> &str { &self.active }

    pub fn active_layout(&self) -> Option<&NamedLayout> { self.list.get(&self.active) }

    pub fn active_tree(&self) -> Option<&LayoutTree> { self.active_layout().map(|l| &l.layout) }

    pub fn layout(&self, name: &str) -> Option<&NamedLayout> { self.list.get(name) }

    pub fn layout_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.list.keys().map(String::as_str)
    }

    pub fn is_protected(&self, name: &str) -> bool { self.protected.contains(name) }

    pub fn windows(&self) -> &FloatingManager { &self.windows }

    pub fn drag_state(&self) -> &DragState { self.drag.state() }

    pub fn gesture(&self) -> &Gesture { &self.gesture }

    fn tree_mut(&mut self) -> Option<&mut LayoutTree> {
        self.list.get_mut(&self.active).map(|l| &mut l.layout)
    }

    /// Any structural change invalidates ids held by in-flight pointer state.
    pub fn cancel_transients(&mut self) {
        self.drag.reset();
        self.gesture.cancel();
    }

    // Tree operations on the active layout.

    pub fn split_node(
        &mut self,
        id: &str,
        direction: SplitDirection,
        prepend: bool,
        duplicate: bool,
    ) -> Option<[NodeId; 2]> {
        if !self.active_tree()?.is_leaf(id) {
            return None;
        }
        self.cancel_transients();
        self.tree_mut()?.split_node(id, direction, prepend, duplicate)
    }

    pub fn relinquish_node(&mut self, id: &str) -> bool {
        if id == ROOT || self.active_tree().and_then(|t| t.parent_of(id)).is_none() {
            return false;
        }
        self.cancel_transients();
        self.tree_mut().is_some_and(|tree| tree.relinquish_node(id))
    }

    pub fn update_ratio(&mut self, id: &str, ratio: f64) -> bool {
        self.tree_mut().is_some_and(|tree| tree.update_ratio(id, ratio))
    }

    pub fn snap_ratio(&mut self, id: &str, area: Rect, extent: f64) -> bool {
        self.tree_mut().is_some_and(|tree| tree.snap_ratio(id, area, extent))
    }

    pub fn set_node_params(&mut self, id: &str, patch: &Params) -> bool {
        self.tree_mut().is_some_and(|tree| tree.set_node_params(id, patch))
    }

    // Drag-swap.

    pub fn start_drag(&mut self, leaf: Option<&str>) -> bool {
        if leaf.is_some() {
            self.gesture.cancel();
        }
        let pair = self.drag.start_drag(leaf.map(NodeId::new));
        self.apply_swap(pair)
    }

    pub fn drag_over(&mut self, id: &str) -> bool { self.drag.drag_over(Some(NodeId::new(id))) }

    /// Pointer left every leaf. A drop before the next `drag_over` swaps
    /// nothing.
    pub fn drag_leave(&mut self) -> bool { self.drag.drag_over(None) }

    pub fn cancel_drag(&mut self) -> bool { self.drag.cancel_drag() }

    pub fn finish_drag(&mut self) -> bool {
        let pair = self.drag.finish_drag();
        self.apply_swap(pair)
    }

    fn apply_swap(&mut self, pair: Option<(NodeId, NodeId)>) -> bool {
        let Some((from, to)) = pair else { return false };
        let swapped = self.tree_mut().is_some_and(|tree| tree.swap_items(from.as_str(), to.as_str()));
        if !swapped {
            debug!(%from, %to, "drag ended on a node that is not a leaf");
        }
        swapped
    }

    // Resize and window-move previews.

    pub fn begin_resize(&mut self, id: &str) -> bool {
        if !self.active_tree().is_some_and(|t| t.is_split(id)) {
            return false;
        }
        self.drag.reset();
        self.gesture.begin_resize(NodeId::new(id));
        true
    }

    pub fn preview_resize(&mut self, ratio: f64) -> bool { self.gesture.preview_ratio(ratio) }

    pub fn begin_window_move(&mut self, id: &str) -> bool {
        if !self.windows.contains(id) {
            return false;
        }
        self.drag.reset();
        self.gesture.begin_window_move(WindowId::new(id));
        true
    }

    pub fn preview_window_move(&mut self, geometry: WindowGeometry) -> bool {
        self.gesture.preview_geometry(geometry)
    }

    pub fn commit_gesture(&mut self) -> bool {
        match self.gesture.commit() {
            Some(GestureCommit::Ratio(node, ratio)) => self.update_ratio(node.as_str(), ratio),
            Some(GestureCommit::Window(window, geometry)) => {
                self.windows.move_window(window.as_str(), &geometry)
            }
            None => false,
        }
    }

    pub fn cancel_gesture(&mut self) -> bool {
        let was_active = self.gesture.is_active();
        self.gesture.cancel();
        was_active
    }

    /// Ratio the renderer should use for split `id`, preview included.
    pub fn effective_ratio(&self, id: &str) -> Option<f64> {
        let committed = self.active_tree()?.split(id)?.ratio;
        Some(self.gesture.ratio_for(id).unwrap_or(committed))
    }

    pub fn effective_window_rect(&self, id: &str) -> Option<Rect> {
        let mut rect = self.windows.get(id)?.rect();
        if let Some(preview) = self.gesture.geometry_for(id) {
            preview.apply_to(&mut rect);
        }
        Some(rect)
    }

    pub fn calculate_layout(&self, area: Rect) -> Vec<(NodeId, Rect)> {
        let Some(tree) = self.active_tree() else { return Vec::new() };
        let preview = match &self.gesture {
            Gesture::Resizing { node, ratio: Some(ratio) } => Some((node.as_str(), *ratio)),
            _ => None,
        };
        tree.calculate_layout_with(area, preview)
    }

    // Floating windows.

    pub fn open_window(&mut self, params: LeafItem, rect: Rect) -> WindowId {
        self.windows.open_window(params, rect)
    }

    /// Move leaf `id` into a new floating window. The leaf is relinquished,
    /// or blanked when it is the root.
    pub fn detach_node(&mut self, id: &str, rect: Rect) -> Option<WindowId> {
        let item = self.active_tree()?.item(id)?.clone();
        if item.is_empty() {
            return None;
        }
        self.cancel_transients();
        let tree = self.tree_mut()?;
        if id == ROOT {
            tree.replace_item(ROOT, LeafItem::empty());
        } else {
            tree.relinquish_node(id);
        }
        Some(self.windows.open_window(item, rect))
    }

    pub fn move_window(&mut self, id: &str, geometry: &WindowGeometry) -> bool {
        self.windows.move_window(id, geometry)
    }

    pub fn resize_window_from_corner(
        &mut self,
        id: &str,
        corner: Corner,
        dx: f64,
        dy: f64,
        min: (f64, f64),
    ) -> bool {
        self.windows.resize_from_corner(id, corner, dx, dy, min)
    }

    pub fn set_window_params(&mut self, id: &str, patch: &Params) -> bool {
        self.windows.set_window_params(id, patch)
    }

    pub fn close_window(&mut self, id: &str) -> bool {
        if self.gesture.geometry_for(id).is_some() {
            self.gesture.cancel();
        }
        self.windows.close_window(id)
    }

    // Named layouts.

    pub fn select_layout(&mut self, name: &str) -> bool {
        if !self.list.contains_key(name) {
            debug!(name, "select_layout: unknown layout");
            return false;
        }
        if self.active == name {
            return false;
        }
        self.cancel_transients();
        self.active = name.to_string();
        true
    }

    /// Deep-clone `name` under a fresh name and select the copy.
    pub fn copy_layout(&mut self, name: &str) -> Option<String> {
        let copy = self.list.get(name)?.clone();
        let new_name = copy_name(name, |candidate| self.list.contains_key(candidate));
        self.cancel_transients();
        info!(from = name, to = %new_name, "copied layout");
        self.list.insert(new_name.clone(), copy);
        self.active = new_name.clone();
        Some(new_name)
    }

    pub fn rename_layout(&mut self, from: &str, to: &str) -> bool {
        if to.trim().is_empty() || self.list.contains_key(to) {
            debug!(from, to, "rename_layout: refused");
            return false;
        }
        let Some(layout) = self.list.remove(from) else { return false };
        self.cancel_transients();
        self.list.insert(to.to_string(), layout);
        if self.active == from {
            self.active = to.to_string();
        }
        true
    }

    pub fn delete_layout(&mut self, name: &str) -> bool {
        if self.is_protected(name) {
            debug!(name, "delete_layout: default layouts cannot be deleted");
            return false;
        }
        if !self.list.contains_key(name) || self.list.len() == 1 {
            return false;
        }
        self.cancel_transients();
        self.list.remove(name);
        if self.active == name {
            let fallback = self
                .list
                .keys()
                .find(|candidate| self.protected.contains(*candidate))
                .or_else(|| self.list.keys().next())
                .cloned();
            if let Some(fallback) = fallback {
                self.active = fallback;
            }
        }
        info!(name, active = %self.active, "deleted layout");
        true
    }

    pub fn toggle_cycling(&mut self, name: &str, ignore: bool) -> bool {
        match self.list.get_mut(name) {
            Some(layout) if layout.ignore_when_cycling != ignore => {
                layout.ignore_when_cycling = ignore;
                true
            }
            _ => false,
        }
    }

    /// Advance to the next layout in key order that has not opted out of
    /// cycling. Walks at most once around; if every other layout opted out
    /// the active layout stays selected.
    pub fn cycle_layouts(&mut self) -> bool {
        let names: Vec<&String> = self.list.keys().collect();
        let start = names.iter().position(|name| **name == self.active);
        let next = (1..=names.len())
            .map(|step| names[(start.unwrap_or(names.len() - 1) + step) % names.len()])
            .take_while(|name| **name != self.active)
            .find(|name| !self.list[*name].ignore_when_cycling)
            .cloned();

        self.cancel_transients();
        match next {
            Some(name) => {
                debug!(from = %self.active, to = %name, "cycled layout");
                self.active = name;
                true
            }
            None => false,
        }
    }

    /// Throw away every user layout and window and start over from defaults.
    pub fn reset(&mut self, defaults: &AppDefaults) {
        info!("resetting layouts to defaults");
        *self = Self::from_defaults(defaults);
    }

    // Panel resolution.

    pub fn bind_leaf(&self, id: &str, catalog: &impl PanelCatalog) -> Option<PanelBinding> {
        Some(bind_item(self.active_tree()?.item(id)?, catalog))
    }

    pub fn bind_window(&self, id: &str, catalog: &impl PanelCatalog) -> Option<PanelBinding> {
        Some(bind_item(&self.windows.get(id)?.params, catalog))
    }

    /// Leaves and windows whose panel type is no longer registered. Nothing is
    /// removed; the caller relinquishes or closes them if it wants to.
    pub fn missing_panels(&self, catalog: &impl PanelCatalog) -> Vec<MissingPanel> {
        let mut missing = Vec::new();
        if let Some(tree) = self.active_tree() {
            for (id, item) in tree.items() {
                if let PanelBinding::Missing { kind } = bind_item(item, catalog) {
                    missing.push(MissingPanel::Leaf(id.clone(), kind));
                }
            }
        }
        for (id, window) in self.windows.iter() {
            if let PanelBinding::Missing { kind } = bind_item(&window.params, catalog) {
                missing.push(MissingPanel::Window(id.clone(), kind));
            }
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn defaults() -> AppDefaults {
        let mut defaults = AppDefaults::fallback();
        defaults.layouts.insert(
            "Split".into(),
            NamedLayout {
                layout: serde_json::from_value(json!({
                    "tree": {"root": {"split": "row", "ratio": 0.5, "children": ["a", "b"]}},
                    "items": {"a": {"type": "chart"}, "b": {"type": null}}
                }))
                .unwrap(),
                ignore_when_cycling: true,
            },
        );
        defaults
    }

    #[test]
    fn persisted_shape() {
        let layouts = AppLayouts::from_defaults(&defaults());
        let value = serde_json::to_value(&layouts).unwrap();
        assert_eq!(value["active"], "Default");
        assert_eq!(value["windows"], json!({}));
        assert_eq!(value["list"]["Split"]["ignoreWhenCycling"], true);
        assert_eq!(value["list"]["Split"]["items"]["a"], json!({"type": "chart"}));
        assert!(value["list"]["Default"].get("ignoreWhenCycling").is_none());
    }

    #[test]
    fn validate_names_the_broken_layout() {
        let mut stored: AppLayouts = serde_json::from_value(json!({
            "active": "Mine",
            "list": {"Mine": {"tree": {}, "items": {"root": {}, "stray": {}}}}
        }))
        .unwrap();
        assert_eq!(
            stored.validate(),
            Err(RegistryError::Tree {
                name: "Mine".into(),
                source: TreeError::Unreachable(NodeId::new("stray")),
            })
        );

        stored.list.clear();
        assert_eq!(stored.validate(), Err(RegistryError::Empty));
        assert!(AppLayouts::merged_over(&defaults(), stored).is_ok());
    }

    #[test]
    fn merge_prefers_stored_copies_of_defaults() {
        let mut stored = AppLayouts::from_defaults(&defaults());
        assert!(stored.select_layout("Split"));
        assert!(!stored.start_drag(Some("a")));
        assert!(stored.drag_over("b"));
        assert!(stored.finish_drag());

        let merged = AppLayouts::merged_over(&defaults(), stored.clone()).unwrap();
        assert_eq!(merged, stored);
        assert!(merged.is_protected("Split"));
    }
}
