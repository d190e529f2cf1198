//! Build and decommission queues.
//!
//! Both queues are `BTreeMap<Tick, Vec<_>>`: draining a step is one map
//! removal, and entries scheduled for the same step keep the order they were
//! queued in.
//!
//! | Request         | Accepted times                                        |
//! |-----------------|-------------------------------------------------------|
//! | build, setup    | `t >= now` (initial deployments may target step 0)   |
//! | build, running  | `t > now` (this step's BuildPending has already run) |
//! | decommission    | `t >= now` (DecommissionPending runs after Tock)     |
//!
//! An agent has at most one pending decommission; scheduling another one
//! replaces it.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use fc_core::{AgentId, FcError, FcResult, Tick};

/// A queued request to instantiate a prototype.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildOrder {
    pub prototype: String,
    pub parent:    Option<AgentId>,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    builds:   BTreeMap<Tick, Vec<BuildOrder>>,
    decoms:   BTreeMap<Tick, Vec<AgentId>>,
    decom_at: BTreeMap<AgentId, Tick>,
    now:      Tick,
    running:  bool,
    kill:     bool,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub(crate) fn set_now(&mut self, t: Tick) {
        self.now = t;
        self.running = true;
    }

    /// Queue a build of `prototype` at `t`.
    pub fn schedule_build(
        &mut self,
        prototype: impl Into<String>,
        parent:    Option<AgentId>,
        t:         Tick,
    ) -> FcResult<()> {
        let prototype = prototype.into();
        if t < self.now || (self.running && t == self.now) {
            return Err(FcError::Value(format!(
                "cannot schedule build of '{prototype}' at {t}; current time is {}",
                self.now
            )));
        }
        debug!(prototype = %prototype, %t, "build scheduled");
        self.builds.entry(t).or_default().push(BuildOrder { prototype, parent });
        Ok(())
    }

    /// Queue `agent` for decommission at `t`, replacing any earlier request.
    pub fn schedule_decom(&mut self, agent: AgentId, t: Tick) -> FcResult<()> {
        if t < self.now {
            return Err(FcError::Value(format!(
                "cannot schedule decommission of {agent} at {t}; current time is {}",
                self.now
            )));
        }
        if let Some(prev) = self.decom_at.get(&agent).copied() {
            warn!(%agent, from = %prev, to = %t, "replacing scheduled decommission");
            self.remove_decom(agent, prev);
        }
        self.decoms.entry(t).or_default().push(agent);
        self.decom_at.insert(agent, t);
        Ok(())
    }

    /// The step at which `agent` is currently due to leave, if any.
    pub fn decom_time(&self, agent: AgentId) -> Option<Tick> {
        self.decom_at.get(&agent).copied()
    }

    pub(crate) fn take_builds(&mut self, t: Tick) -> Vec<BuildOrder> {
        self.builds.remove(&t).unwrap_or_default()
    }

    pub(crate) fn take_decoms(&mut self, t: Tick) -> Vec<AgentId> {
        let agents = self.decoms.remove(&t).unwrap_or_default();
        for a in &agents {
            self.decom_at.remove(a);
        }
        agents
    }

    /// Drop any pending decommission for an agent that is already gone.
    pub(crate) fn cancel_decom(&mut self, agent: AgentId) {
        if let Some(t) = self.decom_at.remove(&agent) {
            self.remove_decom(agent, t);
        }
    }

    fn remove_decom(&mut self, agent: AgentId, t: Tick) {
        if let Some(v) = self.decoms.get_mut(&t) {
            v.retain(|&a| a != agent);
            if v.is_empty() {
                self.decoms.remove(&t);
            }
        }
    }

    /// Ask the run to stop after the current step.
    pub fn kill_sim(&mut self) {
        self.kill = true;
    }

    pub fn kill_requested(&self) -> bool {
        self.kill
    }

    pub fn pending_builds(&self) -> usize {
        self.builds.values().map(Vec::len).sum()
    }

    pub fn pending_decoms(&self) -> usize {
        self.decom_at.len()
    }
}
