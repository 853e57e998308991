//! Topology feed: graph changes streamed into a running simulation.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    pump()    ┌───────────────────┐
//! │   producer   │───>│ mpsc channel │─────────────>│ SimulationContext │
//! │   threads    │    └──────────────┘  before and  └───────────────────┘
//! └──────────────┘                      after step
//! ```
//!
//! Producers hold a cloneable [`TopologySender`] and may run on any thread.
//! Events are only applied when the context pumps, never while a tick runs,
//! so the internal graph does not change shape under the ants.

use std::sync::{mpsc, Mutex};

use formica_core::error::{Result as SimResult, SimError};
use thiserror::Error;

/// One change to the external graph.
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyEvent {
    NodeAdded {
        key: String,
    },
    NodeRemoved {
        key: String,
    },
    EdgeAdded {
        key: String,
        from: String,
        to: String,
        directed: bool,
    },
    EdgeRemoved {
        key: String,
    },
    EdgeWeightChanged {
        key: String,
        weight: f64,
    },
    GraphCleared,
}

/// The simulation is gone and no longer listens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("topology feed closed")]
pub struct FeedClosed;

/// Producer side of the topology feed.
#[derive(Debug, Clone)]
pub struct TopologySender {
    tx: mpsc::Sender<TopologyEvent>,
}

impl TopologySender {
    pub fn send(&self, event: TopologyEvent) -> Result<(), FeedClosed> {
        self.tx.send(event).map_err(|_| FeedClosed)
    }

    pub fn node_added(&self, key: impl Into<String>) -> Result<(), FeedClosed> {
        self.send(TopologyEvent::NodeAdded { key: key.into() })
    }

    pub fn node_removed(&self, key: impl Into<String>) -> Result<(), FeedClosed> {
        self.send(TopologyEvent::NodeRemoved { key: key.into() })
    }

    pub fn edge_added(
        &self,
        key: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        directed: bool,
    ) -> Result<(), FeedClosed> {
        self.send(TopologyEvent::EdgeAdded {
            key: key.into(),
            from: from.into(),
            to: to.into(),
            directed,
        })
    }

    pub fn edge_removed(&self, key: impl Into<String>) -> Result<(), FeedClosed> {
        self.send(TopologyEvent::EdgeRemoved { key: key.into() })
    }

    pub fn edge_weight_changed(&self, key: impl Into<String>, weight: f64) -> Result<(), FeedClosed> {
        self.send(TopologyEvent::EdgeWeightChanged {
            key: key.into(),
            weight,
        })
    }

    pub fn graph_cleared(&self) -> Result<(), FeedClosed> {
        self.send(TopologyEvent::GraphCleared)
    }
}

/// Consumer side, owned by the context.
#[derive(Debug)]
pub(crate) struct TopologyFeed {
    tx: mpsc::Sender<TopologyEvent>,
    rx: Mutex<mpsc::Receiver<TopologyEvent>>,
}

impl TopologyFeed {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    pub(crate) fn sender(&self) -> TopologySender {
        TopologySender {
            tx: self.tx.clone(),
        }
    }

    /// Take up to `limit` queued events without blocking.
    pub(crate) fn drain(&self, limit: usize) -> SimResult<Vec<TopologyEvent>> {
        let rx = self.rx.lock().map_err(|_| SimError::SectionPoisoned)?;
        Ok(rx.try_iter().take(limit).collect())
    }
}
