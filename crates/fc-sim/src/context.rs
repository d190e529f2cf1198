//! `Context`: run-wide state shared by the scheduler and every agent.
//!
//! The Context owns everything that is global to a run: configuration, the id
//! counters, the prototype and recipe registries, the build/decommission
//! queues, the RNG and the recorder.  Agents never hold references into it;
//! each callback receives an [`AgentCtx`] that borrows what the agent may use
//! for the duration of the call.

use std::sync::Arc;

use fc_core::{AgentId, FcError, FcResult, IdCounters, SimInfo, SimRng, Tick};
use fc_output::{DatumBuilder, Recorder};
use fc_resource::Composition;

use crate::agent::Agent;
use crate::registry::{PrototypeRegistry, RecipeRegistry};
use crate::scheduler::Scheduler;

pub struct Context {
    info:       SimInfo,
    ids:        IdCounters,
    prototypes: PrototypeRegistry,
    recipes:    RecipeRegistry,
    scheduler:  Scheduler,
    rng:        SimRng,
    recorder:   Recorder,
}

impl Context {
    pub fn new(info: SimInfo, recorder: Recorder) -> Self {
        let rng = SimRng::new(info.seed);
        Self {
            info,
            ids: IdCounters::new(),
            prototypes: PrototypeRegistry::new(),
            recipes: RecipeRegistry::new(),
            scheduler: Scheduler::new(),
            rng,
            recorder,
        }
    }

    pub fn info(&self) -> &SimInfo {
        &self.info
    }

    pub fn ids(&self) -> &IdCounters {
        &self.ids
    }

    pub fn add_prototype(&mut self, name: impl Into<String>, proto: Box<dyn Agent>) -> FcResult<()> {
        self.prototypes.add(name, proto)
    }

    pub fn prototypes(&self) -> &PrototypeRegistry {
        &self.prototypes
    }

    pub fn add_recipe(&mut self, name: impl Into<String>, comp: Arc<Composition>) -> FcResult<()> {
        self.recipes.add(name, comp)
    }

    pub fn recipes(&self) -> &RecipeRegistry {
        &self.recipes
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn rng_mut(&mut self) -> &mut SimRng {
        &mut self.rng
    }

    pub fn recorder_mut(&mut self) -> &mut Recorder {
        &mut self.recorder
    }

    /// Restore the counters, RNG and queues to a fresh-run state.
    /// Registries are kept.
    pub fn reset(&mut self) {
        self.ids.reset();
        self.rng.reset(self.info.seed);
        self.scheduler = Scheduler::new();
    }

    pub(crate) fn agent_ctx(&mut self, agent: AgentId, parent: Option<AgentId>, time: Tick) -> AgentCtx<'_> {
        AgentCtx {
            agent,
            parent,
            time,
            info:       &self.info,
            ids:        &self.ids,
            prototypes: &self.prototypes,
            recipes:    &self.recipes,
            scheduler:  &mut self.scheduler,
            rng:        &mut self.rng,
            recorder:   &mut self.recorder,
        }
    }
}

// ── AgentCtx ──────────────────────────────────────────────────────────────────

/// What one agent can see and do during one callback.
pub struct AgentCtx<'a> {
    agent:      AgentId,
    parent:     Option<AgentId>,
    time:       Tick,
    info:       &'a SimInfo,
    ids:        &'a IdCounters,
    prototypes: &'a PrototypeRegistry,
    recipes:    &'a RecipeRegistry,
    scheduler:  &'a mut Scheduler,
    rng:        &'a mut SimRng,
    recorder:   &'a mut Recorder,
}

impl AgentCtx<'_> {
    /// The agent being called.
    pub fn agent(&self) -> AgentId {
        self.agent
    }

    pub fn parent(&self) -> Option<AgentId> {
        self.parent
    }

    pub fn time(&self) -> Tick {
        self.time
    }

    pub fn info(&self) -> &SimInfo {
        self.info
    }

    pub fn ids(&self) -> &IdCounters {
        self.ids
    }

    pub fn recipe(&self, name: &str) -> FcResult<Arc<Composition>> {
        self.recipes.get(name)
    }

    pub fn rng(&mut self) -> &mut SimRng {
        self.rng
    }

    /// Start a row in `table` of the run's output.
    pub fn record(&mut self, table: &str) -> DatumBuilder<'_> {
        self.recorder.new_datum(table)
    }

    /// Build `prototype` at `t` with this agent as parent.
    pub fn schedule_build(&mut self, prototype: &str, t: Tick) -> FcResult<()> {
        if !self.prototypes.contains(prototype) {
            return Err(FcError::Key(format!("no prototype named '{prototype}'")));
        }
        self.scheduler.schedule_build(prototype, Some(self.agent), t)
    }

    /// Decommission this agent at `t`.
    pub fn schedule_decom(&mut self, t: Tick) -> FcResult<()> {
        self.scheduler.schedule_decom(self.agent, t)
    }

    /// When this agent is currently scheduled to leave.
    pub fn exit_time(&self) -> Option<Tick> {
        self.scheduler.decom_time(self.agent)
    }

    /// Stop the run after the current step.
    pub fn kill_sim(&mut self) {
        self.scheduler.kill_sim();
    }
}
