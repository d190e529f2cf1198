//! The `Sim` struct and its step loop.

use tracing::{debug, info, warn};

use fc_core::{AgentId, FcError, SimClock, Tick};
use fc_exchange::{ExchangeManager, TradeRecord};
use fc_output::Recorder;
use fc_resource::{Material, Product};

use crate::arena::{AgentArena, AgentSlot};
use crate::context::Context;
use crate::scheduler::BuildOrder;
use crate::{SimError, SimObserver, SimResult};

/// Outcome of a completed run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimSummary {
    /// First step that was not simulated.
    pub end:          Tick,
    pub steps:        u64,
    /// `true` when an agent stopped the run before `duration`.
    pub early_term:   bool,
    pub transactions: u64,
    pub agents_built: u64,
}

// ── Sim ───────────────────────────────────────────────────────────────────────

/// The simulation runner.
///
/// Each step `t` runs five phases in order:
///
/// 1. **BuildPending**: instantiate every prototype queued for `t`.
/// 2. **Tick**: every time listener, ascending id.
/// 3. **Exchange**: one material pass, then one product pass.
/// 4. **Tock**: every time listener, ascending id.
/// 5. **DecommissionPending**: remove agents queued for `t` whose
///    decommission condition holds; re-queue the rest for `t + 1`.
///
/// Any error aborts the run.  Create via [`SimBuilder`][crate::SimBuilder].
pub struct Sim {
    pub ctx:    Context,
    pub agents: AgentArena,
    clock:      SimClock,
    materials:  ExchangeManager<Material>,
    products:   ExchangeManager<Product>,
    started:    bool,
    finished:   bool,
    trades:     u64,
}

impl Sim {
    pub(crate) fn new(ctx: Context) -> Self {
        let info = ctx.info();
        let clock = info.make_clock();
        let materials = ExchangeManager::new(&info.solver, info.eps);
        let products = ExchangeManager::new(&info.solver, info.eps);
        Self {
            ctx,
            agents: AgentArena::new(),
            clock,
            materials,
            products,
            started: false,
            finished: false,
            trades: 0,
        }
    }

    /// The next step to be simulated.
    pub fn now(&self) -> Tick {
        self.clock.current_tick
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn transactions(&self) -> u64 {
        self.trades
    }

    pub fn recorder_mut(&mut self) -> &mut Recorder {
        self.ctx.recorder_mut()
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Run from the current step to the end of the configured duration, or
    /// until an agent kills the run.  Records `Finish` and closes the
    /// recorder.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<SimSummary> {
        let end = self.ctx.info().end_tick();
        let first = self.now();
        while self.now() < end && !self.ctx.scheduler().kill_requested() {
            self.step(observer)?;
        }
        let summary = self.finish(first)?;
        observer.on_sim_end(&summary);
        Ok(summary)
    }

    /// Simulate exactly one step.
    pub fn step<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        if self.finished {
            return Err(SimError::Fc(FcError::Value("simulation already finished".into())));
        }
        if !self.started {
            self.record_info()?;
            self.started = true;
        }
        let now = self.now();
        self.ctx.scheduler_mut().set_now(now);
        observer.on_step_start(now);
        info!(%now, agents = self.agents.len(), "step");

        self.build_pending(now, observer)?;
        self.time_step(now, true)?;
        self.exchange(now, observer)?;
        self.time_step(now, false)?;
        self.decommission_pending(now, observer)?;

        observer.on_step_end(now);
        self.clock.advance();
        Ok(())
    }

    // ── Phases ────────────────────────────────────────────────────────────

    fn build_pending<O: SimObserver>(&mut self, now: Tick, observer: &mut O) -> SimResult<()> {
        for order in self.ctx.scheduler_mut().take_builds(now) {
            let id = self.build(order, now)?;
            if let Some(slot) = self.agents.get(id) {
                observer.on_agent_enter(id, &slot.prototype, now);
            }
        }
        Ok(())
    }

    fn build(&mut self, order: BuildOrder, now: Tick) -> SimResult<AgentId> {
        let BuildOrder { prototype, parent } = order;
        let mut agent = self
            .ctx
            .prototypes()
            .instantiate(&prototype)
            .ok_or_else(|| SimError::UnknownPrototype(prototype.clone()))?;
        let id = self.ctx.ids().next_agent();

        agent.enter(&mut self.ctx.agent_ctx(id, parent, now))?;

        let lifetime = agent.lifetime();
        if let Some(l) = lifetime {
            if l == 0 {
                return Err(FcError::Config(format!("prototype '{prototype}' has zero lifetime")).into());
            }
            self.ctx.scheduler_mut().schedule_decom(id, now + (l - 1))?;
        }

        self.ctx
            .recorder_mut()
            .new_datum("AgentEntry")
            .add_val("AgentId", id)
            .add_val("Kind", agent.kind())
            .add_val("Spec", agent.spec())
            .add_val("Prototype", prototype.as_str())
            .add_val("ParentId", parent.map_or(-1, |p| p.0 as i64))
            .add_val("Lifetime", lifetime.map_or(-1, |l| l as i64))
            .add_val("EnterTime", now)
            .record()?;

        info!(agent = %id, prototype = %prototype, spec = agent.spec(), "agent entered");
        self.agents.insert(id, AgentSlot::new(agent, prototype, parent, now));
        if let Some(p) = parent {
            match self.agents.get_mut(p) {
                Some(ps) => ps.agent.build_notify(id),
                None => warn!(agent = %id, parent = %p, "parent is no longer live"),
            }
        }
        Ok(id)
    }

    /// Tick (`before == true`) or Tock for every listener.
    fn time_step(&mut self, now: Tick, before: bool) -> SimResult<()> {
        for id in self.agents.listeners() {
            let Some(slot) = self.agents.get_mut(id) else { continue };
            let parent = slot.parent;
            let Some(listener) = slot.agent.time_listener() else { continue };
            let mut actx = self.ctx.agent_ctx(id, parent, now);
            if before {
                listener.tick(&mut actx)?;
            } else {
                listener.tock(&mut actx)?;
            }
        }
        Ok(())
    }

    fn exchange<O: SimObserver>(&mut self, now: Tick, observer: &mut O) -> SimResult<()> {
        let records = self.materials.execute(&mut self.agents, now, self.ctx.ids())?;
        self.record_trades(&records)?;
        observer.on_trades(fc_resource::ResourceKind::Material, &records);

        let records = self.products.execute(&mut self.agents, now, self.ctx.ids())?;
        self.record_trades(&records)?;
        observer.on_trades(fc_resource::ResourceKind::Product, &records);
        Ok(())
    }

    fn record_trades(&mut self, records: &[TradeRecord]) -> SimResult<()> {
        for r in records {
            self.ctx
                .recorder_mut()
                .new_datum("Transactions")
                .add_val("TransactionId", r.id)
                .add_val("SenderId", r.sender)
                .add_val("ReceiverId", r.receiver)
                .add_val("ResourceId", r.resource)
                .add_val("Commodity", r.commodity.as_str())
                .add_val("Quantity", r.quantity)
                .add_val("Preference", r.preference)
                .add_val("Time", r.time)
                .record()?;
        }
        self.trades += records.len() as u64;
        Ok(())
    }

    fn decommission_pending<O: SimObserver>(&mut self, now: Tick, observer: &mut O) -> SimResult<()> {
        for id in self.ctx.scheduler_mut().take_decoms(now) {
            let Some(slot) = self.agents.get_mut(id) else {
                debug!(agent = %id, "decommission of an agent that is already gone");
                continue;
            };
            if !slot.agent.check_decommission_condition() {
                warn!(agent = %id, %now, "decommission condition not met; retrying next step");
                self.ctx.scheduler_mut().schedule_decom(id, now.next())?;
                continue;
            }
            let parent = slot.parent;
            slot.agent.decommission(&mut self.ctx.agent_ctx(id, parent, now))?;
            self.agents.remove(id);

            if let Some(p) = parent {
                if let Some(ps) = self.agents.get_mut(p) {
                    ps.agent.decom_notify(id);
                }
            }
            self.ctx
                .recorder_mut()
                .new_datum("AgentExit")
                .add_val("AgentId", id)
                .add_val("ExitTime", now)
                .record()?;
            info!(agent = %id, "agent decommissioned");
            observer.on_agent_exit(id, now);
        }
        Ok(())
    }

    /// Remove a live agent immediately, skipping its decommission condition.
    /// The agent's `decommission` hook still runs.
    pub fn remove_agent(&mut self, id: AgentId) -> SimResult<()> {
        let now = self.now();
        let mut slot = self.agents.remove(id).ok_or(SimError::AgentNotFound(id))?;
        slot.agent.decommission(&mut self.ctx.agent_ctx(id, slot.parent, now))?;
        self.ctx.scheduler_mut().cancel_decom(id);
        if let Some(p) = slot.parent {
            if let Some(ps) = self.agents.get_mut(p) {
                ps.agent.decom_notify(id);
            }
        }
        self.ctx
            .recorder_mut()
            .new_datum("AgentExit")
            .add_val("AgentId", id)
            .add_val("ExitTime", now)
            .record()?;
        Ok(())
    }

    // ── Records ───────────────────────────────────────────────────────────

    fn record_info(&mut self) -> SimResult<()> {
        let info = self.ctx.info().clone();
        let solver = self.materials.solver_name();
        self.ctx
            .recorder_mut()
            .new_datum("Info")
            .add_val("Duration", info.duration)
            .add_val("DtSecs", info.dt_secs)
            .add_val("Seed", info.seed)
            .add_val("Solver", solver)
            .add_val("Eps", info.eps)
            .add_val("EpsRsrc", info.eps_rsrc)
            .record()?;
        Ok(())
    }

    fn finish(&mut self, first: Tick) -> SimResult<SimSummary> {
        let end = self.now();
        let early_term = end < self.ctx.info().end_tick();
        let rec = self.ctx.recorder_mut();
        rec.new_datum("Finish")
            .add_val("EarlyTerm", early_term)
            .add_val("EndTime", end)
            .record()?;
        rec.close()?;
        self.finished = true;

        let summary = SimSummary {
            end,
            steps: end - first,
            early_term,
            transactions: self.trades,
            agents_built: u64::from(self.ctx.ids().agents_created()),
        };
        info!(?summary, "simulation finished");
        Ok(summary)
    }
}
