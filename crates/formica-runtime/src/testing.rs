//! Fixtures shared by the unit tests of this crate.

use std::sync::Arc;

use formica_core::error::{Result, SimError};
use formica_core::types::{AntId, ColonyIndex};

use crate::ant::{Ant, AntBody, AntFactory, TickScope};
use crate::graph::NodeId;

/// An ant that never moves on its own.
pub(crate) struct Idle(AntBody);

impl Ant for Idle {
    fn body(&self) -> &AntBody {
        &self.0
    }

    fn body_mut(&mut self) -> &mut AntBody {
        &mut self.0
    }

    fn step(&mut self, _scope: &mut TickScope<'_>) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn idle_factory() -> Arc<dyn AntFactory> {
    Arc::new(|id: AntId, colony: ColonyIndex, start: Option<NodeId>| {
        Box::new(Idle(AntBody::new(id, colony, start))) as Box<dyn Ant>
    })
}

/// An ant that fails its first step and idles afterwards.
pub(crate) struct Faulty {
    body: AntBody,
    failed: bool,
}

impl Ant for Faulty {
    fn body(&self) -> &AntBody {
        &self.body
    }

    fn body_mut(&mut self) -> &mut AntBody {
        &mut self.body
    }

    fn step(&mut self, _scope: &mut TickScope<'_>) -> Result<()> {
        if self.failed {
            return Ok(());
        }
        self.failed = true;
        Err(SimError::agent(self.body.id(), "lost its way"))
    }
}

pub(crate) fn faulty_factory() -> Arc<dyn AntFactory> {
    Arc::new(|id: AntId, colony: ColonyIndex, start: Option<NodeId>| {
        Box::new(Faulty {
            body: AntBody::new(id, colony, start),
            failed: false,
        }) as Box<dyn Ant>
    })
}
