use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};

use super::{Event, Reactor};
use crate::common::config::Config;
use crate::layout_engine::LayoutEngine;

/// Journal of handled events, one ron value per line.
pub struct Record {
    file: Option<File>,
}

impl Record {
    pub fn new(path: Option<&Path>) -> io::Result<Self> {
        Ok(Self { file: path.map(File::create).transpose()? })
    }

    pub fn disabled() -> Self { Self { file: None } }

    pub(super) fn on_event(&mut self, event: &Event) {
        let Some(file) = self.file.as_mut() else { return };
        let written = ron::ser::to_string(event)
            .map_err(io::Error::other)
            .and_then(|line| writeln!(file, "{line}"));
        if let Err(e) = written {
            warn!("dropping journal entry: {e}");
        }
    }
}

/// Re-apply a journal onto a fresh engine built from `config`. Nothing is
/// saved.
pub fn replay(path: &Path, config: &Config) -> anyhow::Result<LayoutEngine> {
    let file = BufReader::new(
        File::open(path).with_context(|| format!("opening journal {}", path.display()))?,
    );
    let mut reactor = Reactor::new(config, LayoutEngine::new(config), None, Record::disabled());
    let mut count = 0;
    for (index, line) in file.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: Event =
            ron::from_str(&line).with_context(|| format!("journal line {}", index + 1))?;
        let _ = reactor.handle_event(event);
        count += 1;
    }
    info!(count, "replayed journal");
    Ok(reactor.into_engine())
}
