use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::registry::AppLayouts;
use super::{SplitDirection, WindowId};
use crate::common::config::{AppDefaults, Config, Settings};
use crate::model::geometry::{Corner, Rect, WindowGeometry};
use crate::model::tree::{LeafItem, NodeId, Params};

#[non_exhaustive]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutCommand {
    SplitNode {
        id: NodeId,
        direction: SplitDirection,
        #[serde(default)]
        prepend: bool,
        #[serde(default)]
        duplicate: bool,
    },
    RelinquishNode {
        id: NodeId,
    },
    UpdateRatio {
        id: NodeId,
        ratio: f64,
    },
    SnapRatio {
        id: NodeId,
        area: Rect,
        extent: f64,
    },
    SetNodeParams {
        id: NodeId,
        params: Params,
    },

    StartDrag(Option<NodeId>),
    DragOver(NodeId),
    /// Pointer left every leaf while dragging.
    DragLeave,
    FinishDrag,
    /// Pointer-leave or pointer-up outside the dashboard.
    CancelDrag,

    BeginResize {
        id: NodeId,
    },
    PreviewResize {
        ratio: f64,
    },
    BeginWindowMove {
        id: WindowId,
    },
    PreviewWindowMove(WindowGeometry),
    CommitGesture,
    CancelGesture,

    OpenWindow {
        kind: Option<String>,
        #[serde(default)]
        params: Params,
        #[serde(default)]
        geometry: Option<Rect>,
    },
    DetachNode {
        id: NodeId,
        #[serde(default)]
        geometry: Option<Rect>,
    },
    MoveWindow {
        id: WindowId,
        geometry: WindowGeometry,
    },
    ResizeWindowFromCorner {
        id: WindowId,
        corner: Corner,
        dx: f64,
        dy: f64,
    },
    SetWindowParams {
        id: WindowId,
        params: Params,
    },
    CloseWindow {
        id: WindowId,
    },

    SelectLayout(String),
    CopyLayout(String),
    RenameLayout {
        from: String,
        to: String,
    },
    DeleteLayout(String),
    ToggleCycling {
        name: String,
        ignore: bool,
    },
    CycleLayouts,
    ResetLayouts,
}

/// Abstract hotkey actions, independent of the key bound to them.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum_macros::EnumString,
    strum_macros::Display,
    strum_macros::VariantNames
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "kebab-case")]
pub enum Action {
    CycleLayout,
    ResetAllSettings,
}

#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventResponse {
    /// Committed state changed and should be persisted.
    pub changed: bool,
    pub active_layout: Option<String>,
    /// Node or window ids minted by the command.
    pub created: Vec<String>,
}

impl EventResponse {
    fn changed(changed: bool) -> Self { Self { changed, ..Self::default() } }

    fn created(ids: Vec<String>) -> Self {
        Self {
            changed: !ids.is_empty(),
            created: ids,
            ..Self::default()
        }
    }
}

/// State container for every application's layouts. All mutation goes through
/// [`LayoutEngine::handle_command`] and [`LayoutEngine::handle_action`].
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    apps: BTreeMap<String, AppLayouts>,
    defaults: BTreeMap<String, AppDefaults>,
    settings: Settings,
}

impl LayoutEngine {
    pub fn new(config: &Config) -> Self {
        let apps = config
            .apps
            .iter()
            .map(|(name, defaults)| (name.clone(), AppLayouts::from_defaults(defaults)))
            .collect();
        Self {
            apps,
            defaults: config.apps.clone(),
            settings: config.settings.clone(),
        }
    }

    /// Build from defaults, then lay stored per-application state over them.
    /// An application whose stored state does not parse or validate keeps its
    /// defaults.
    pub fn restore(config: &Config, stored: BTreeMap<String, Value>) -> Self {
        let mut engine = Self::new(config);
        for (app, value) in stored {
            let defaults = defaults_for(&engine.defaults, &app);
            let merged = serde_json::from_value::<AppLayouts>(value)
                .map_err(|e| e.to_string())
                .and_then(|stored| {
                    AppLayouts::merged_over(&defaults, stored).map_err(|e| e.to_string())
                });
            match merged {
                Ok(layouts) => {
                    engine.apps.insert(app, layouts);
                }
                Err(error) => warn!(%app, %error, "discarding stored layouts"),
            }
        }
        engine
    }

    pub fn settings(&self) -> &Settings { &self.settings }

    pub fn app(&self, app: &str) -> Option<&AppLayouts> { self.apps.get(app) }

    pub fn apps(&self) -> &BTreeMap<String, AppLayouts> { &self.apps }

    /// Apply `command` to `app`. An application without state runs against a
    /// scratch registry built from its defaults, kept only if the command
    /// changed it.
    #[instrument(name = "layout_engine::handle_command", skip(self))]
    pub fn handle_command(&mut self, app: &str, command: LayoutCommand) -> EventResponse {
        let defaults = defaults_for(&self.defaults, app);
        if let Some(layouts) = self.apps.get_mut(app) {
            return apply(layouts, command, &defaults, &self.settings);
        }

        let mut layouts = AppLayouts::from_defaults(&defaults);
        let response = apply(&mut layouts, command, &defaults, &self.settings);
        if response.changed {
            self.apps.insert(app.to_string(), layouts);
        }
        response
    }

    #[instrument(name = "layout_engine::handle_action", skip(self))]
    pub fn handle_action(&mut self, app: &str, action: Action) -> EventResponse {
        match action {
            Action::CycleLayout => self.handle_command(app, LayoutCommand::CycleLayouts),
            Action::ResetAllSettings => {
                self.reset_all();
                EventResponse {
                    changed: true,
                    active_layout: self.app(app).map(|l| l.active_name().to_string()),
                    created: Vec::new(),
                }
            }
        }
    }

    /// Reset every application, including ones that only exist in stored
    /// state, to its compiled-in defaults.
    pub fn reset_all(&mut self) {
        info!("resetting all applications to defaults");
        for (app, layouts) in self.apps.iter_mut() {
            layouts.reset(&defaults_for(&self.defaults, app));
        }
    }

    /// Ascii rendering of an application's active layout and its windows.
    pub fn draw(&self, app: &str) -> Option<String> {
        let layouts = self.app(app)?;
        let mut out = format!("{app} [{}]\n", layouts.active_name());
        if let Some(tree) = layouts.active_tree() {
            out.push_str(&tree.draw_tree());
        }
        for (id, window) in layouts.windows().iter() {
            let rect = window.rect();
            out.push_str(&format!(
                "window {id}: {} @ ({}, {}) {}x{}\n",
                window.params.kind.as_deref().unwrap_or("<empty>"),
                rect.x,
                rect.y,
                rect.w,
                rect.h
            ));
        }
        Some(out)
    }
}

fn defaults_for(defaults: &BTreeMap<String, AppDefaults>, app: &str) -> AppDefaults {
    defaults.get(app).cloned().unwrap_or_else(AppDefaults::fallback)
}

fn apply(
    layouts: &mut AppLayouts,
    command: LayoutCommand,
    defaults: &AppDefaults,
    settings: &Settings,
) -> EventResponse {
    let min_size = settings.min_window_size.as_tuple();
    let mut response = match command {
        LayoutCommand::SplitNode { id, direction, prepend, duplicate } => {
            match layouts.split_node(id.as_str(), direction, prepend, duplicate) {
                Some(children) => EventResponse::created(
                    children.into_iter().map(|c| c.as_str().to_string()).collect(),
                ),
                None => EventResponse::default(),
            }
        }
        LayoutCommand::RelinquishNode { id } => {
            EventResponse::changed(layouts.relinquish_node(id.as_str()))
        }
        LayoutCommand::UpdateRatio { id, ratio } => {
            EventResponse::changed(layouts.update_ratio(id.as_str(), ratio))
        }
        LayoutCommand::SnapRatio { id, area, extent } => {
            EventResponse::changed(layouts.snap_ratio(id.as_str(), area, extent))
        }
        LayoutCommand::SetNodeParams { id, params } => {
            EventResponse::changed(layouts.set_node_params(id.as_str(), &params))
        }

        LayoutCommand::StartDrag(leaf) => {
            EventResponse::changed(layouts.start_drag(leaf.as_ref().map(NodeId::as_str)))
        }
        LayoutCommand::DragOver(id) => {
            let _ = layouts.drag_over(id.as_str());
            EventResponse::default()
        }
        LayoutCommand::DragLeave => {
            let _ = layouts.drag_leave();
            EventResponse::default()
        }
        LayoutCommand::FinishDrag => EventResponse::changed(layouts.finish_drag()),
        LayoutCommand::CancelDrag => {
            let _ = layouts.cancel_drag();
            EventResponse::default()
        }

        LayoutCommand::BeginResize { id } => {
            let _ = layouts.begin_resize(id.as_str());
            EventResponse::default()
        }
        LayoutCommand::PreviewResize { ratio } => {
            let _ = layouts.preview_resize(ratio);
            EventResponse::default()
        }
        LayoutCommand::BeginWindowMove { id } => {
            let _ = layouts.begin_window_move(id.as_str());
            EventResponse::default()
        }
        LayoutCommand::PreviewWindowMove(geometry) => {
            let _ = layouts.preview_window_move(geometry);
            EventResponse::default()
        }
        LayoutCommand::CommitGesture => EventResponse::changed(layouts.commit_gesture()),
        LayoutCommand::CancelGesture => {
            let _ = layouts.cancel_gesture();
            EventResponse::default()
        }

        LayoutCommand::OpenWindow { kind, params, geometry } => {
            let item = LeafItem { kind, params };
            let id = layouts.open_window(item, geometry.unwrap_or(settings.detach));
            EventResponse::created(vec![id.as_str().to_string()])
        }
        LayoutCommand::DetachNode { id, geometry } => {
            match layouts.detach_node(id.as_str(), geometry.unwrap_or(settings.detach)) {
                Some(window) => EventResponse::created(vec![window.as_str().to_string()]),
                None => EventResponse::default(),
            }
        }
        LayoutCommand::MoveWindow { id, geometry } => {
            EventResponse::changed(layouts.move_window(id.as_str(), &geometry))
        }
        LayoutCommand::ResizeWindowFromCorner { id, corner, dx, dy } => EventResponse::changed(
            layouts.resize_window_from_corner(id.as_str(), corner, dx, dy, min_size),
        ),
        LayoutCommand::SetWindowParams { id, params } => {
            EventResponse::changed(layouts.set_window_params(id.as_str(), &params))
        }
        LayoutCommand::CloseWindow { id } => {
            EventResponse::changed(layouts.close_window(id.as_str()))
        }

        LayoutCommand::SelectLayout(name) => {
            EventResponse::changed(layouts.select_layout(&name))
        }
        LayoutCommand::CopyLayout(name) => match layouts.copy_layout(&name) {
            Some(copy) => EventResponse::created(vec![copy]),
            None => EventResponse::default(),
        },
        LayoutCommand::RenameLayout { from, to } => {
            EventResponse::changed(layouts.rename_layout(&from, &to))
        }
        LayoutCommand::DeleteLayout(name) => {
            EventResponse::changed(layouts.delete_layout(&name))
        }
        LayoutCommand::ToggleCycling { name, ignore } => {
            EventResponse::changed(layouts.toggle_cycling(&name, ignore))
        }
        LayoutCommand::CycleLayouts => EventResponse::changed(layouts.cycle_layouts()),
        LayoutCommand::ResetLayouts => {
            layouts.reset(defaults);
            EventResponse::changed(true)
        }
    };

    if !response.changed {
        debug!("command had no effect on committed state");
    }
    response.active_layout = Some(layouts.active_name().to_string());
    response
}
