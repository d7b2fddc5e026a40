mod drag_swap;
pub mod engine;
mod floating;
mod gesture;
pub(crate) mod graph;
pub mod panel;
pub mod persist;
pub mod registry;

pub use drag_swap::{DragState, DragSwapController};
pub use engine::{Action, EventResponse, LayoutCommand, LayoutEngine};
pub use floating::{FloatingManager, FloatingWindow, WindowId};
pub use gesture::{Gesture, GestureCommit};
pub use graph::SplitDirection;
pub use panel::{PanelBinding, PanelCatalog, PanelSpec, StaticCatalog};
pub use persist::{LayoutStore, StoreError};
pub use registry::{AppLayouts, MissingPanel, NamedLayout, RegistryError};
