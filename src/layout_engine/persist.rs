use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::engine::LayoutEngine;
use super::registry::AppLayouts;
use crate::common::config::Config;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Stored state, one still-unparsed entry per application so that a corrupt
/// application can be dropped without losing the others.
pub type StoredState = BTreeMap<String, Value>;

/// Mirrors every application's registry to a JSON file keyed by application.
#[derive(Debug, Clone)]
pub struct LayoutStore {
    path: PathBuf,
}

impl LayoutStore {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    /// `Ok(None)` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<StoredState>, StoreError> {
        let buf = match fs::read_to_string(&self.path) {
            Ok(buf) => buf,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&buf)?))
    }

    /// Write to a sibling temp file and rename it over the old state, so a
    /// crash mid-write leaves the previous state intact.
    pub fn save(&self, apps: &BTreeMap<String, AppLayouts>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = fs::File::create(&tmp)?;
        serde_json::to_writer_pretty(&mut file, apps)?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), apps = apps.len(), "saved layouts");
        Ok(())
    }

    /// Boot path: defaults with whatever stored state survives validation laid
    /// over them. An unreadable file is logged and ignored.
    pub fn restore(&self, config: &Config) -> LayoutEngine {
        match self.load() {
            Ok(Some(stored)) => LayoutEngine::restore(config, stored),
            Ok(None) => LayoutEngine::new(config),
            Err(error) => {
                warn!(path = %self.path.display(), %error, "ignoring unreadable state file");
                LayoutEngine::new(config)
            }
        }
    }
}
