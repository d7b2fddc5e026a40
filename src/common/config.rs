use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::layout_engine::NamedLayout;
use crate::model::geometry::Rect;

const FALLBACK_LAYOUT: &str = "Default";

pub fn data_dir() -> PathBuf { dirs::home_dir().unwrap_or_default().join(".dashpane") }
pub fn state_file() -> PathBuf { data_dir().join("layouts.json") }
pub fn config_file() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".config").join("dashpane").join("config.toml")
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    apps: BTreeMap<String, AppDefaults>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub settings: Settings,
    /// Compiled-in default layouts per application. These names are protected
    /// from deletion and are what a reset restores.
    pub apps: BTreeMap<String, AppDefaults>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "yes")]
    pub save_on_change: bool,
    /// Overrides `~/.dashpane/layouts.json`.
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    /// Where detached and newly opened windows land when no geometry is given.
    #[serde(default = "default_detach")]
    pub detach: Rect,
    #[serde(default)]
    pub min_window_size: Size,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_on_change: true,
            state_file: None,
            detach: default_detach(),
            min_window_size: Size::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct Size {
    pub w: f64,
    pub h: f64,
}

impl Default for Size {
    fn default() -> Self { Self { w: 120.0, h: 80.0 } }
}

impl Size {
    pub fn as_tuple(self) -> (f64, f64) { (self.w, self.h) }
}

fn yes() -> bool { true }
fn default_detach() -> Rect { Rect::new(80.0, 80.0, 480.0, 320.0) }

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let Rect { x, y, w, h } = self.detach;
        if ![x, y, w, h].iter().all(|v| v.is_finite()) {
            issues.push("settings.detach must be finite".to_string());
        } else if w <= 0.0 || h <= 0.0 {
            issues.push(format!("settings.detach size must be positive, got {w}x{h}"));
        }
        let Size { w, h } = self.min_window_size;
        if !(w.is_finite() && h.is_finite() && w >= 0.0 && h >= 0.0) {
            issues.push(format!("settings.min_window_size must be non-negative, got {w}x{h}"));
        }
        issues
    }
}

/// Default layouts of one application.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct AppDefaults {
    #[serde(default)]
    pub active: Option<String>,
    #[serde(default, alias = "list")]
    pub layouts: BTreeMap<String, NamedLayout>,
}

impl AppDefaults {
    /// Used for applications the configuration does not mention: one empty
    /// layout named "Default".
    pub fn fallback() -> Self {
        let mut layouts = BTreeMap::new();
        layouts.insert(FALLBACK_LAYOUT.to_string(), NamedLayout::default());
        Self {
            active: Some(FALLBACK_LAYOUT.to_string()),
            layouts,
        }
    }

    /// The configured active layout if it exists, else the first layout.
    pub fn active_name(&self) -> String {
        self.active
            .as_ref()
            .filter(|name| self.layouts.contains_key(*name))
            .or_else(|| self.layouts.keys().next())
            .cloned()
            .unwrap_or_else(|| FALLBACK_LAYOUT.to_string())
    }

    pub fn validate(&self, app: &str) -> Vec<String> {
        let mut issues = Vec::new();
        if self.layouts.is_empty() {
            issues.push(format!("apps.{app} defines no layouts"));
        }
        if let Some(active) = &self.active {
            if !self.layouts.contains_key(active) {
                issues.push(format!("apps.{app}.active names missing layout {active:?}"));
            }
        }
        for (name, named) in &self.layouts {
            if let Err(e) = named.layout.validate() {
                issues.push(format!("apps.{app}.layouts.{name:?}: {e}"));
            }
        }
        issues
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&buf)
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let file: ConfigFile = toml::from_str(buf)?;
        Ok(Config { settings: file.settings, apps: file.apps })
    }

    /// Read `path` if it exists, otherwise fall back to the bundled defaults.
    pub fn read_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() { Self::read(path) } else { Ok(Self::default()) }
    }

    pub fn state_file(&self) -> PathBuf {
        self.settings.state_file.clone().unwrap_or_else(state_file)
    }

    pub fn defaults_for(&self, app: &str) -> AppDefaults {
        self.apps.get(app).cloned().unwrap_or_else(AppDefaults::fallback)
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.settings.validate();
        for (app, defaults) in &self.apps {
            issues.extend(defaults.validate(app));
        }
        issues
    }
}

impl Default for Config {
    fn default() -> Config {
        Self::parse(include_str!("../../dashpane.default.toml"))
            .expect("bundled dashpane.default.toml parses")
    }
}
