use crate::model::tree::NodeId;

/// Pointer-drag state for swapping two leaves' content. Never persisted.
///
/// `to` is `None` while the pointer is outside every leaf; dropping there
/// swaps nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging { from: NodeId, to: Option<NodeId> },
}

#[derive(Debug, Clone, Default)]
pub struct DragSwapController {
    state: DragState,
}

impl DragSwapController {
    pub fn new() -> Self { Self::default() }

    pub fn state(&self) -> &DragState { &self.state }

    /// `Some(leaf)` starts a new drag, replacing any drag in flight.
    /// `None` ends the current drag exactly like [`Self::finish_drag`].
    pub fn start_drag(&mut self, leaf: Option<NodeId>) -> Option<(NodeId, NodeId)> {
        match leaf {
            Some(from) => {
                self.state = DragState::Dragging { to: Some(from.clone()), from };
                None
            }
            None => self.finish_drag(),
        }
    }

    /// Retarget the drag. `None` means the pointer left every leaf.
    pub fn drag_over(&mut self, target: Option<NodeId>) -> bool {
        match &mut self.state {
            DragState::Dragging { to, .. } => {
                *to = target;
                true
            }
            DragState::Idle => false,
        }
    }

    /// Leave the dragging state. Returns the pair to swap when the pointer
    /// ended over a different leaf than it started on.
    pub fn finish_drag(&mut self) -> Option<(NodeId, NodeId)> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging { from, to: Some(to) } if from != to => Some((from, to)),
            _ => None,
        }
    }

    /// Abort without swapping. Returns whether a drag was in flight.
    pub fn cancel_drag(&mut self) -> bool {
        !matches!(std::mem::take(&mut self.state), DragState::Idle)
    }

    pub fn reset(&mut self) { self.state = DragState::Idle; }
}
