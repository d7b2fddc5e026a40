//! Split tree stored as two flat maps: `tree` holds the internal split nodes
//! and `items` holds the leaves. Every node id lives in exactly one of them.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::common::collections::HashSet;
use crate::common::util::fresh_id;
use crate::layout_engine::SplitDirection;
use crate::model::geometry::Rect;

pub const ROOT: &str = "root";
pub const MIN_RATIO: f64 = 0.05;
pub const MAX_RATIO: f64 = 0.95;

/// Free-form panel parameters. Contents are owned by the panel, not the engine.
pub type Params = serde_json::Map<String, Value>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

    pub fn root() -> Self { Self(ROOT.to_string()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str { &self.0 }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self { Self::new(value) }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self { Self(value) }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SplitNode {
    pub split: SplitDirection,
    pub ratio: f64,
    pub children: [NodeId; 2],
}

impl SplitNode {
    pub fn new(split: SplitDirection, ratio: f64, children: [NodeId; 2]) -> Self {
        Self { split, ratio, children }
    }

    fn sibling_of(&self, child: &str) -> Option<&NodeId> {
        match &self.children {
            [a, b] if a.as_str() == child => Some(b),
            [a, b] if b.as_str() == child => Some(a),
            _ => None,
        }
    }
}

/// Payload of a leaf: the panel type (None for an empty placeholder) plus
/// whatever parameters the panel stores.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LeafItem {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub params: Params,
}

impl LeafItem {
    pub fn empty() -> Self { Self::default() }

    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self { kind: Some(kind.into()), params: Params::new() }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool { self.kind.is_none() }

    /// Shallow merge. A `"type"` key replaces the panel type: a string sets
    /// it, `null` clears it.
    pub fn merge(&mut self, patch: &Params) {
        for (key, value) in patch {
            if key == "type" {
                match value {
                    Value::String(kind) => self.kind = Some(kind.clone()),
                    Value::Null => self.kind = None,
                    other => debug!("ignoring non-string panel type {other}"),
                }
            } else {
                self.params.insert(key.clone(), value.clone());
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    #[error("root node is missing")]
    MissingRoot,
    #[error("node {0} is both a split and a leaf")]
    InBothMaps(NodeId),
    #[error("split {parent} references missing child {child}")]
    DanglingChild { parent: NodeId, child: NodeId },
    #[error("node {0} is referenced more than once")]
    SharedChild(NodeId),
    #[error("node {0} is not reachable from root")]
    Unreachable(NodeId),
    #[error("split {id} has ratio {ratio} outside (0, 1)")]
    InvalidRatio { id: NodeId, ratio: f64 },
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LayoutTree {
    #[serde(default)]
    tree: BTreeMap<NodeId, SplitNode>,
    #[serde(default)]
    items: BTreeMap<NodeId, LeafItem>,
    #[serde(skip)]
    id_counter: u64,
}

impl PartialEq for LayoutTree {
    fn eq(&self, other: &Self) -> bool { self.tree == other.tree && self.items == other.items }
}

impl Default for LayoutTree {
    fn default() -> Self { Self::with_root_item(LeafItem::empty()) }
}

impl LayoutTree {
    pub fn with_root_item(item: LeafItem) -> Self {
        let mut items = BTreeMap::new();
        items.insert(NodeId::root(), item);
        Self {
            tree: BTreeMap::new(),
            items,
            id_counter: 0,
        }
    }

    pub fn from_parts(
        tree: BTreeMap<NodeId, SplitNode>,
        items: BTreeMap<NodeId, LeafItem>,
    ) -> Result<Self, TreeError> {
        let layout = Self { tree, items, id_counter: 0 };
        layout.validate()?;
        Ok(layout)
    }

    pub fn splits(&self) -> &BTreeMap<NodeId, SplitNode> { &self.tree }

    pub fn items(&self) -> &BTreeMap<NodeId, LeafItem> { &self.items }

    pub fn item(&self, id: &str) -> Option<&LeafItem> { self.items.get(id) }

    pub fn split(&self, id: &str) -> Option<&SplitNode> { self.tree.get(id) }

    pub fn is_leaf(&self, id: &str) -> bool { self.items.contains_key(id) }

    pub fn is_split(&self, id: &str) -> bool { self.tree.contains_key(id) }

    pub fn contains(&self, id: &str) -> bool { self.is_leaf(id) || self.is_split(id) }

    pub fn node_count(&self) -> usize { self.tree.len() + self.items.len() }

    pub fn parent_of(&self, id: &str) -> Option<&NodeId> {
        self.tree
            .iter()
            .find(|(_, node)| node.children.iter().any(|c| c.as_str() == id))
            .map(|(parent, _)| parent)
    }

    /// Leaf ids in depth-first, first-child-first order.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.calculate_layout(Rect::new(0.0, 0.0, 1.0, 1.0))
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Turn leaf `id` into a split with two fresh leaf children. The original
    /// item goes to the second child when `prepend` is set, otherwise the
    /// first; the other child gets a copy when `duplicate` is set, otherwise
    /// an empty item. Returns the new child ids.
    pub fn split_node(
        &mut self,
        id: &str,
        direction: SplitDirection,
        prepend: bool,
        duplicate: bool,
    ) -> Option<[NodeId; 2]> {
        if !self.items.contains_key(id) {
            debug!(id, "split_node: not a leaf");
            return None;
        }
        // mint while `id` is still present so neither fresh id can reuse it
        let first = self.mint_id();
        let second = self.mint_id();
        let (key, item) = self.items.remove_entry(id)?;

        let other = if duplicate { item.clone() } else { LeafItem::empty() };
        let (first_item, second_item) = if prepend { (other, item) } else { (item, other) };
        self.items.insert(first.clone(), first_item);
        self.items.insert(second.clone(), second_item);
        self.tree.insert(
            key,
            SplitNode::new(direction, 0.5, [first.clone(), second.clone()]),
        );
        Some([first, second])
    }

    /// Remove `id` (and everything below it) and let its sibling take over
    /// the parent's slot. The sibling's content moves under the parent's id,
    /// so every reference to the parent, including `root`, stays valid.
    pub fn relinquish_node(&mut self, id: &str) -> bool {
        if id == ROOT {
            debug!("relinquish_node: root is not removable");
            return false;
        }
        let Some(parent) = self.parent_of(id).cloned() else {
            debug!(id, "relinquish_node: no parent");
            return false;
        };
        let Some(split) = self.tree.remove(&parent) else { return false };
        let Some(sibling) = split.sibling_of(id).cloned() else {
            self.tree.insert(parent, split);
            return false;
        };

        self.prune(id);
        if let Some(node) = self.tree.remove(&sibling) {
            self.tree.insert(parent, node);
        } else if let Some(item) = self.items.remove(&sibling) {
            self.items.insert(parent, item);
        }
        true
    }

    /// Store `ratio` on split `id`, clamped to `[MIN_RATIO, MAX_RATIO]`.
    pub fn update_ratio(&mut self, id: &str, ratio: f64) -> bool {
        if ratio.is_nan() {
            return false;
        }
        let Some(node) = self.tree.get_mut(id) else {
            debug!(id, "update_ratio: not a split");
            return false;
        };
        node.ratio = clamp_ratio(ratio);
        true
    }

    /// Pick the ratio that makes the first child of split `id` exactly
    /// `extent` pixels long, given the whole tree is laid out in `area`.
    pub fn snap_ratio(&mut self, id: &str, area: Rect, extent: f64) -> bool {
        let Some(direction) = self.tree.get(id).map(|node| node.split) else { return false };
        let Some(rect) = self.node_rect(id, area) else { return false };
        let length = direction.extent(rect);
        if length <= 0.0 {
            return false;
        }
        self.update_ratio(id, extent / length)
    }

    pub fn set_node_params(&mut self, id: &str, patch: &Params) -> bool {
        let Some(item) = self.items.get_mut(id) else {
            debug!(id, "set_node_params: not a leaf");
            return false;
        };
        item.merge(patch);
        true
    }

    pub fn replace_item(&mut self, id: &str, item: LeafItem) -> bool {
        match self.items.get_mut(id) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    /// Exchange the items of two distinct leaves. Structure is untouched.
    pub fn swap_items(&mut self, a: &str, b: &str) -> bool {
        if a == b || !self.is_leaf(a) || !self.is_leaf(b) {
            return false;
        }
        let (Some((ka, ia)), Some((kb, ib))) =
            (self.items.remove_entry(a), self.items.remove_entry(b))
        else {
            return false;
        };
        self.items.insert(ka, ib);
        self.items.insert(kb, ia);
        true
    }

    pub fn calculate_layout(&self, area: Rect) -> Vec<(NodeId, Rect)> {
        self.calculate_layout_with(area, None)
    }

    /// Leaf rects for `area`. `preview` overrides the ratio of one split.
    pub fn calculate_layout_with(
        &self,
        area: Rect,
        preview: Option<(&str, f64)>,
    ) -> Vec<(NodeId, Rect)> {
        let mut out = Vec::new();
        self.walk(area, preview, |id, rect, is_leaf| {
            if is_leaf {
                out.push((id.clone(), rect));
            }
        });
        out
    }

    pub fn node_rect(&self, id: &str, area: Rect) -> Option<Rect> {
        let mut found = None;
        self.walk(area, None, |node, rect, _| {
            if node.as_str() == id {
                found = Some(rect);
            }
        });
        found
    }

    /// Check the structural invariants: root present, key sets disjoint,
    /// every child resolvable, each node referenced once, everything
    /// reachable from root, ratios inside (0, 1).
    pub fn validate(&self) -> Result<(), TreeError> {
        match (self.tree.contains_key(ROOT), self.items.contains_key(ROOT)) {
            (false, false) => return Err(TreeError::MissingRoot),
            (true, true) => return Err(TreeError::InBothMaps(NodeId::root())),
            _ => {}
        }
        if let Some(id) = self.tree.keys().find(|id| self.items.contains_key(*id)) {
            return Err(TreeError::InBothMaps(id.clone()));
        }
        for (id, node) in &self.tree {
            if !(node.ratio > 0.0 && node.ratio < 1.0) {
                return Err(TreeError::InvalidRatio { id: id.clone(), ratio: node.ratio });
            }
            if let Some(child) = node.children.iter().find(|c| !self.contains(c.as_str())) {
                return Err(TreeError::DanglingChild {
                    parent: id.clone(),
                    child: child.clone(),
                });
            }
        }

        let mut seen = HashSet::default();
        let mut stack = vec![NodeId::root()];
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                return Err(TreeError::SharedChild(id));
            }
            if let Some(node) = self.tree.get(&id) {
                stack.extend(node.children.iter().rev().cloned());
            }
        }
        if let Some(orphan) = self.tree.keys().chain(self.items.keys()).find(|id| !seen.contains(*id))
        {
            return Err(TreeError::Unreachable(orphan.clone()));
        }
        Ok(())
    }

    pub fn draw_tree(&self) -> String {
        let mut out = String::new();
        let tree = self.get_ascii_tree(&NodeId::root(), self.node_count());
        if ascii_tree::write_tree(&mut out, &tree).is_err() {
            out.clear();
        }
        out
    }

    fn get_ascii_tree(&self, id: &NodeId, budget: usize) -> ascii_tree::Tree {
        match self.tree.get(id) {
            Some(node) if budget > 0 => ascii_tree::Tree::Node(
                format!("{id} {} {:.2}", node.split, node.ratio),
                node.children.iter().map(|c| self.get_ascii_tree(c, budget - 1)).collect(),
            ),
            Some(_) => ascii_tree::Tree::Leaf(vec![format!("{id} …")]),
            None => {
                let kind = self
                    .items
                    .get(id)
                    .and_then(|item| item.kind.as_deref())
                    .unwrap_or("<empty>");
                ascii_tree::Tree::Leaf(vec![format!("{id}: {kind}")])
            }
        }
    }

    /// Depth-first walk from root. Visits each node at most once, so a
    /// malformed tree cannot loop forever.
    fn walk(
        &self,
        area: Rect,
        preview: Option<(&str, f64)>,
        mut visit: impl FnMut(&NodeId, Rect, bool),
    ) {
        let mut seen = HashSet::default();
        let mut stack = vec![(NodeId::root(), area)];
        while let Some((id, rect)) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            match self.tree.get(&id) {
                Some(node) => {
                    visit(&id, rect, false);
                    let ratio = match preview {
                        Some((target, ratio)) if target == id.as_str() => ratio,
                        _ => node.ratio,
                    };
                    let (first, second) = node.split.divide(rect, ratio);
                    stack.push((node.children[1].clone(), second));
                    stack.push((node.children[0].clone(), first));
                }
                None if self.items.contains_key(&id) => visit(&id, rect, true),
                None => {}
            }
        }
    }

    fn mint_id(&mut self) -> NodeId {
        let (tree, items) = (&self.tree, &self.items);
        NodeId(fresh_id("n", &mut self.id_counter, |candidate| {
            tree.contains_key(candidate) || items.contains_key(candidate)
        }))
    }

    fn prune(&mut self, id: &str) {
        let mut stack = vec![NodeId::new(id)];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.tree.remove(&id) {
                stack.extend(node.children);
            }
            self.items.remove(&id);
        }
    }
}

pub fn clamp_ratio(ratio: f64) -> f64 { ratio.clamp(MIN_RATIO, MAX_RATIO) }
