//! Contract between the engine and the host's panel implementations.
//!
//! The engine only ever stores a panel `type` string and a parameter bag.
//! Hosts inject a [`PanelCatalog`] that knows which types exist and what
//! their default parameters are; drawing stays entirely on the host side.

use crate::common::collections::HashMap;
use crate::model::tree::{LeafItem, Params};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelSpec {
    pub default_params: Params,
}

impl PanelSpec {
    pub fn new(default_params: Params) -> Self { Self { default_params } }
}

pub trait PanelCatalog {
    fn resolve(&self, kind: &str) -> Option<&PanelSpec>;
}

/// Catalog backed by a fixed map, enough for hosts with a static panel set.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    panels: HashMap<String, PanelSpec>,
}

impl StaticCatalog {
    pub fn new() -> Self { Self::default() }

    pub fn with_panel(mut self, kind: impl Into<String>, spec: PanelSpec) -> Self {
        self.panels.insert(kind.into(), spec);
        self
    }

    pub fn unregister(&mut self, kind: &str) -> Option<PanelSpec> { self.panels.remove(kind) }
}

impl PanelCatalog for StaticCatalog {
    fn resolve(&self, kind: &str) -> Option<&PanelSpec> { self.panels.get(kind) }
}

/// What a renderer should draw for one leaf or window.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelBinding {
    /// Placeholder leaf with no panel assigned.
    Empty,
    /// Stored params laid over the panel's defaults.
    Resolved { kind: String, params: Params },
    /// The assigned type is not in the catalog. The engine keeps the content;
    /// the renderer decides whether to relinquish or close it.
    Missing { kind: String },
}

pub fn bind_item(item: &LeafItem, catalog: &impl PanelCatalog) -> PanelBinding {
    let Some(kind) = item.kind.as_deref() else { return PanelBinding::Empty };
    match catalog.resolve(kind) {
        Some(spec) => {
            let mut params = spec.default_params.clone();
            params.extend(item.params.iter().map(|(k, v)| (k.clone(), v.clone())));
            PanelBinding::Resolved { kind: kind.to_string(), params }
        }
        None => PanelBinding::Missing { kind: kind.to_string() },
    }
}
