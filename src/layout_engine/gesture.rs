use crate::layout_engine::floating::WindowId;
use crate::model::geometry::WindowGeometry;
use crate::model::tree::{NodeId, clamp_ratio};

/// Transient preview for an in-progress divider resize or window move.
/// Intermediate pointer moves overwrite the preview; only a commit touches
/// the committed model.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Gesture {
    #[default]
    Idle,
    Resizing {
        node: NodeId,
        ratio: Option<f64>,
    },
    MovingWindow {
        window: WindowId,
        geometry: WindowGeometry,
    },
}

/// What a finished gesture asks the model to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureCommit {
    Ratio(NodeId, f64),
    Window(WindowId, WindowGeometry),
}

impl Gesture {
    pub fn is_active(&self) -> bool { !matches!(self, Gesture::Idle) }

    pub fn begin_resize(&mut self, node: NodeId) { *self = Gesture::Resizing { node, ratio: None }; }

    pub fn begin_window_move(&mut self, window: WindowId) {
        *self = Gesture::MovingWindow { window, geometry: WindowGeometry::default() };
    }

    pub fn preview_ratio(&mut self, value: f64) -> bool {
        match self {
            Gesture::Resizing { ratio, .. } if !value.is_nan() => {
                *ratio = Some(clamp_ratio(value));
                true
            }
            _ => false,
        }
    }

    pub fn preview_geometry(&mut self, patch: WindowGeometry) -> bool {
        match self {
            Gesture::MovingWindow { geometry, .. } if patch.is_finite() => {
                *geometry = patch;
                true
            }
            _ => false,
        }
    }

    /// Preview ratio for `node`, if a resize of it is in progress.
    pub fn ratio_for(&self, node: &str) -> Option<f64> {
        match self {
            Gesture::Resizing { node: target, ratio } if target.as_str() == node => *ratio,
            _ => None,
        }
    }

    pub fn geometry_for(&self, window: &str) -> Option<WindowGeometry> {
        match self {
            Gesture::MovingWindow { window: target, geometry } if target.as_str() == window => {
                Some(*geometry)
            }
            _ => None,
        }
    }

    pub fn commit(&mut self) -> Option<GestureCommit> {
        match std::mem::take(self) {
            Gesture::Resizing { node, ratio: Some(ratio) } => Some(GestureCommit::Ratio(node, ratio)),
            Gesture::MovingWindow { window, geometry } if !geometry.is_empty() => {
                Some(GestureCommit::Window(window, geometry))
            }
            _ => None,
        }
    }

    pub fn cancel(&mut self) { *self = Gesture::Idle; }
}
