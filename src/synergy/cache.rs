//! Versioned handle to the most recently built graph
//!
//! A cache hit requires both the store snapshot and the rule set version to
//! match, so a graph is never served for records it was not built from.

use crate::loader::CardStore;
use crate::synergy::builder::{BuilderConfig, GraphBuilder};
use crate::synergy::graph::SynergyGraph;
use crate::synergy::rules::RuleSet;
use crate::{GoldfishError, Result};
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
pub struct GraphCache {
    config: BuilderConfig,
    slot: RwLock<Option<Arc<SynergyGraph>>>,
}

impl GraphCache {
    pub fn new(config: BuilderConfig) -> Self {
        GraphCache {
            config,
            slot: RwLock::new(None),
        }
    }

    /// The cached graph if it matches `store` and `rules`, otherwise a fresh
    /// build that replaces it
    pub fn get_or_build(&self, store: &CardStore, rules: &RuleSet) -> Result<Arc<SynergyGraph>> {
        if let Some(graph) = self.current(store, rules) {
            return Ok(graph);
        }
        let graph = Arc::new(GraphBuilder::new(rules).with_config(self.config.clone()).build(store)?);
        self.insert(Arc::clone(&graph));
        Ok(graph)
    }

    /// The cached graph for `store`: `None` when empty, `GraphStale` when it
    /// was built from another snapshot
    pub fn cached(&self, store: &CardStore) -> Result<Option<Arc<SynergyGraph>>> {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            None => Ok(None),
            Some(graph) if graph.snapshot() == store.version() => Ok(Some(Arc::clone(graph))),
            Some(graph) => Err(GoldfishError::GraphStale {
                built: graph.snapshot().short().to_string(),
                current: store.version().short().to_string(),
            }),
        }
    }

    /// Store a graph built elsewhere (e.g. loaded from disk)
    pub fn insert(&self, graph: Arc<SynergyGraph>) {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = Some(graph);
    }

    pub fn invalidate(&self) {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn current(&self, store: &CardStore, rules: &RuleSet) -> Option<Arc<SynergyGraph>> {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        slot.as_ref()
            .filter(|g| g.snapshot() == store.version() && g.ruleset_version() == rules.version())
            .cloned()
    }
}
