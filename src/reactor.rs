//! Single entry point for events. The reactor owns the engine, mirrors every
//! committed change to the store and appends each event to the journal.

pub mod replay;

use serde::{Deserialize, Serialize};
use tracing::{error, instrument, trace};

pub use self::replay::{Record, replay};
use crate::common::config::Config;
use crate::layout_engine::{Action, EventResponse, LayoutCommand, LayoutEngine, LayoutStore, StoreError};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    Command { app: String, command: LayoutCommand },
    Action { app: String, action: Action },
    /// Restore every application's defaults.
    ResetAll,
}

pub struct Reactor {
    engine: LayoutEngine,
    store: Option<LayoutStore>,
    record: Record,
    save_on_change: bool,
}

impl Reactor {
    pub fn new(
        config: &Config,
        engine: LayoutEngine,
        store: Option<LayoutStore>,
        record: Record,
    ) -> Self {
        Self {
            engine,
            store,
            record,
            save_on_change: config.settings.save_on_change,
        }
    }

    /// Restore from the configured state file and keep saving to it.
    pub fn boot(config: &Config, record: Record) -> Self {
        let store = LayoutStore::new(config.state_file());
        let engine = store.restore(config);
        Self::new(config, engine, Some(store), record)
    }

    pub fn engine(&self) -> &LayoutEngine { &self.engine }

    pub fn into_engine(self) -> LayoutEngine { self.engine }

    #[instrument(name = "reactor::handle_event", skip(self))]
    pub fn handle_event(&mut self, event: Event) -> EventResponse {
        self.record.on_event(&event);
        let response = match event {
            Event::Command { app, command } => self.engine.handle_command(&app, command),
            Event::Action { app, action } => self.engine.handle_action(&app, action),
            Event::ResetAll => {
                self.engine.reset_all();
                EventResponse { changed: true, ..EventResponse::default() }
            }
        };
        trace!(?response);
        if response.changed && self.save_on_change {
            if let Err(e) = self.save() {
                error!("failed to save layouts: {e}");
            }
        }
        response
    }

    /// Write the current state regardless of `save_on_change`.
    pub fn save(&self) -> Result<(), StoreError> {
        match &self.store {
            Some(store) => store.save(self.engine.apps()),
            None => Ok(()),
        }
    }
}
