//! `Reactor`: a batch-refuelled reactor that cycles whole fuel assemblies.
//!
//! Fuel moves through three buffers, all counted in assemblies of
//! `assem_size`:
//!
//! ```text
//!   exchange ──▶ fresh ──▶ core ──▶ spent ──▶ exchange
//!                      load    discharge
//! ```
//!
//! A cycle lasts `cycle_time` steps at full core, followed by `refuel_time`
//! steps.  At the start of the step after the cycle ends, `n_assem_batch`
//! assemblies are transmuted to their spent recipe, discharged, and replaced
//! from the fresh buffer.  A new cycle begins in the Tock of the first step
//! with a full core whose refuelling period is over.
//!
//! | Event         | Phase | Condition                                   |
//! |---------------|-------|---------------------------------------------|
//! | `CYCLE_END`   | Tick  | `cycle_step == cycle_time`                  |
//! | `DISCHARGE`   | Tick  | cycle over and the batch not yet discharged |
//! | `LOAD`        | Tick  | cycle over and fresh fuel available         |
//! | `CYCLE_START` | Tock  | full core at `cycle_step == 0`              |
//! | `RETIRED`     | Tick  | first step after the lifetime ends          |
//!
//! After retirement the reactor discharges its whole core, stops ordering
//! fuel and keeps bidding spent fuel until it is empty.  Only then does its
//! decommission condition hold.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fc_core::{FcError, FcResult, ResourceId, Tick};
use fc_exchange::{BidPortfolio, CapacityConstraint, CommodityRequests, RequestPortfolio, Trade, Trader, TraderCtx};
use fc_resource::{Composition, Material, Resource, ResourceBuf};
use fc_sim::{Agent, AgentCtx, SimResult, TimeListener};

fn default_spent() -> usize {
    1_000_000_000
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReactorConfig {
    /// Fuel commodities accepted, with the recipe requested for each.
    pub fuel_incommods:  Vec<String>,
    pub fuel_inrecipes:  Vec<String>,
    /// Commodity and recipe each fuel leaves as, index-aligned with the above.
    pub fuel_outcommods: Vec<String>,
    pub fuel_outrecipes: Vec<String>,
    /// Empty means 1.0 for every fuel.
    #[serde(default)]
    pub fuel_prefs:      Vec<f64>,

    pub assem_size:    f64,
    pub n_assem_core:  usize,
    pub n_assem_batch: usize,
    /// Fresh assemblies kept on hand beyond the core.
    #[serde(default)]
    pub n_assem_fresh: usize,
    #[serde(default = "default_spent")]
    pub n_assem_spent: usize,

    pub cycle_time:  u64,
    #[serde(default)]
    pub refuel_time: u64,

    #[serde(default)]
    pub lifetime:            Option<u64>,
    /// Transmute the whole core at retirement instead of half of it.
    #[serde(default)]
    pub decom_transmute_all: bool,
}

impl ReactorConfig {
    /// A single-fuel reactor.
    pub fn single_fuel(
        incommod:  &str,
        inrecipe:  &str,
        outcommod: &str,
        outrecipe: &str,
    ) -> Self {
        Self {
            fuel_incommods:      vec![incommod.to_owned()],
            fuel_inrecipes:      vec![inrecipe.to_owned()],
            fuel_outcommods:     vec![outcommod.to_owned()],
            fuel_outrecipes:     vec![outrecipe.to_owned()],
            fuel_prefs:          Vec::new(),
            assem_size:          1.0,
            n_assem_core:        3,
            n_assem_batch:       1,
            n_assem_fresh:       0,
            n_assem_spent:       default_spent(),
            cycle_time:          1,
            refuel_time:         0,
            lifetime:            None,
            decom_transmute_all: false,
        }
    }

    fn validate(&self) -> FcResult<()> {
        let n = self.fuel_incommods.len();
        if n == 0 {
            return Err(FcError::Config("reactor has no fuel commodities".into()));
        }
        let lens = [self.fuel_inrecipes.len(), self.fuel_outcommods.len(), self.fuel_outrecipes.len()];
        if lens.iter().any(|&l| l != n) {
            return Err(FcError::Config(format!(
                "reactor fuel lists differ in length: {n} incommods, {lens:?} inrecipes/outcommods/outrecipes"
            )));
        }
        if !self.fuel_prefs.is_empty() && self.fuel_prefs.len() != n {
            return Err(FcError::Config(format!(
                "reactor has {} fuel preferences for {n} fuels",
                self.fuel_prefs.len()
            )));
        }
        if !(self.assem_size > 0.0) || self.n_assem_core == 0 || self.n_assem_batch == 0 {
            return Err(FcError::Config(
                "reactor needs a positive assembly size, core size and batch size".into(),
            ));
        }
        if self.cycle_time == 0 {
            return Err(FcError::Config("reactor cycle_time must be at least one step".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Reactor {
    cfg:        ReactorConfig,
    prefs:      Vec<f64>,
    in_comps:   Vec<Arc<Composition>>,
    out_comps:  Vec<Arc<Composition>>,
    fresh:      ResourceBuf<Material>,
    core:       ResourceBuf<Material>,
    spent:      ResourceBuf<Material>,
    /// Fuel index each held assembly arrived as.
    fuel_of:    BTreeMap<ResourceId, usize>,
    cycle_step: u64,
    discharged: bool,
    /// Last step of operation, when the lifetime is finite.
    retire_at:  Option<Tick>,
}

impl Reactor {
    pub fn new(cfg: ReactorConfig) -> Self {
        Self {
            cfg,
            prefs:      Vec::new(),
            in_comps:   Vec::new(),
            out_comps:  Vec::new(),
            fresh:      ResourceBuf::new(),
            core:       ResourceBuf::new(),
            spent:      ResourceBuf::new(),
            fuel_of:    BTreeMap::new(),
            cycle_step: 0,
            discharged: false,
            retire_at:  None,
        }
    }

    fn retired(&self, t: Tick) -> bool {
        self.retire_at.is_some_and(|r| t > r)
    }

    fn core_full(&self) -> bool {
        self.core.count() == self.cfg.n_assem_core
    }

    fn fuel_index(&self, m: &Material) -> FcResult<usize> {
        self.fuel_of
            .get(&m.id())
            .copied()
            .ok_or_else(|| FcError::Key(format!("no fuel entry for {}", m.id())))
    }

    // ── Fuel handling ─────────────────────────────────────────────────────

    /// Transmute the `n` oldest core assemblies and move them to the
    /// discharge end of the core.
    fn transmute(&mut self, n: usize) -> FcResult<usize> {
        let mut old = self.core.pop_n(n.min(self.core.count()))?;
        let rest = self.core.pop_n(self.core.count())?;
        for m in &mut old {
            let i = self.fuel_index(m)?;
            m.transmute(Arc::clone(&self.out_comps[i]));
        }
        let k = old.len();
        self.core.push_all(old)?;
        self.core.push_all(rest)?;
        Ok(k)
    }

    fn discharge(&mut self, ctx: &mut AgentCtx<'_>) -> SimResult<bool> {
        let npop = self.cfg.n_assem_batch.min(self.core.count());
        if self.cfg.n_assem_spent.saturating_sub(self.spent.count()) < npop {
            record(ctx, "DISCHARGE", "failed".into())?;
            return Ok(false);
        }
        self.spent.push_all(self.core.pop_n(npop)?)?;
        record(ctx, "DISCHARGE", format!("{npop} assemblies"))?;
        Ok(true)
    }

    fn load(&mut self, ctx: &mut AgentCtx<'_>) -> SimResult<()> {
        let n = (self.cfg.n_assem_core - self.core.count()).min(self.fresh.count());
        if n == 0 {
            return Ok(());
        }
        self.core.push_all(self.fresh.pop_n(n)?)?;
        record(ctx, "LOAD", format!("{n} assemblies"))
    }

    /// Assemblies to order this step, trimmed to what can still be burned
    /// before retirement.
    fn n_order(&self, now: Tick) -> usize {
        let missing_core = self.cfg.n_assem_core - self.core.count();
        let mut n = missing_core + self.cfg.n_assem_fresh.saturating_sub(self.fresh.count());
        if let Some(r) = self.retire_at {
            let period = (self.cfg.cycle_time + self.cfg.refuel_time) as f64;
            let t_left = r.0 as f64 - now.0 as f64 + 1.0;
            let t_left_cycle = period - self.cycle_step as f64;
            let cycles_left = ((t_left - t_left_cycle) / period).ceil();
            let need = cycles_left * self.cfg.n_assem_batch as f64 - self.cfg.n_assem_fresh as f64
                + missing_core as f64;
            n = n.min(need.max(0.0) as usize);
        }
        n
    }
}

fn record(ctx: &mut AgentCtx<'_>, event: &str, value: String) -> SimResult<()> {
    let (agent, time) = (ctx.agent(), ctx.time());
    ctx.record("ReactorEvents")
        .add_val("AgentId", agent)
        .add_val("Time", time)
        .add_val("Event", event)
        .add_val("Value", value)
        .record()?;
    Ok(())
}

// ── Agent ─────────────────────────────────────────────────────────────────────

impl Agent for Reactor {
    fn spec(&self) -> &'static str {
        "Reactor"
    }

    fn clone_agent(&self) -> Box<dyn Agent> {
        Box::new(self.clone())
    }

    fn enter(&mut self, ctx: &mut AgentCtx<'_>) -> SimResult<()> {
        self.cfg.validate()?;
        self.prefs = if self.cfg.fuel_prefs.is_empty() {
            vec![1.0; self.cfg.fuel_incommods.len()]
        } else {
            self.cfg.fuel_prefs.clone()
        };
        self.in_comps = self.cfg.fuel_inrecipes.iter().map(|r| ctx.recipe(r)).collect::<FcResult<_>>()?;
        self.out_comps = self.cfg.fuel_outrecipes.iter().map(|r| ctx.recipe(r)).collect::<FcResult<_>>()?;
        self.retire_at = self.cfg.lifetime.map(|l| ctx.time() + l.saturating_sub(1));
        debug!(agent = %ctx.agent(), retire_at = ?self.retire_at, "reactor entered");
        Ok(())
    }

    fn lifetime(&self) -> Option<u64> {
        self.cfg.lifetime
    }

    fn check_decommission_condition(&self) -> bool {
        self.core.is_empty() && self.spent.is_empty()
    }

    fn time_listener(&mut self) -> Option<&mut dyn TimeListener> {
        Some(self)
    }

    fn material_trader(&mut self) -> Option<&mut dyn Trader<Material>> {
        Some(self)
    }
}

impl TimeListener for Reactor {
    fn tick(&mut self, ctx: &mut AgentCtx<'_>) -> SimResult<()> {
        let t = ctx.time();
        if self.retired(t) {
            if self.retire_at.map(Tick::next) == Some(t) {
                info!(agent = %ctx.agent(), "reactor retired");
                record(ctx, "RETIRED", String::new())?;
                let n = if self.cfg.decom_transmute_all {
                    self.cfg.n_assem_core
                } else {
                    self.cfg.n_assem_core.div_ceil(2)
                };
                self.transmute(n)?;
            }
            while !self.core.is_empty() {
                if !self.discharge(ctx)? {
                    break;
                }
            }
            while !self.fresh.is_empty() && self.spent.count() < self.cfg.n_assem_spent {
                self.spent.push(self.fresh.pop()?)?;
            }
            return Ok(());
        }

        if self.cycle_step == self.cfg.cycle_time {
            let n = self.transmute(self.cfg.n_assem_batch)?;
            record(ctx, "CYCLE_END", format!("{n} assemblies transmuted"))?;
        }
        if self.cycle_step >= self.cfg.cycle_time && !self.discharged {
            self.discharged = self.discharge(ctx)?;
        }
        if self.cycle_step >= self.cfg.cycle_time {
            self.load(ctx)?;
        }
        Ok(())
    }

    fn tock(&mut self, ctx: &mut AgentCtx<'_>) -> SimResult<()> {
        if self.retired(ctx.time()) {
            return Ok(());
        }
        if self.cycle_step >= self.cfg.cycle_time + self.cfg.refuel_time && self.core_full() && self.discharged {
            self.discharged = false;
            self.cycle_step = 0;
        }
        if self.cycle_step == 0 && self.core_full() {
            record(ctx, "CYCLE_START", String::new())?;
        }
        if self.cycle_step > 0 || self.core_full() {
            self.cycle_step += 1;
        }
        Ok(())
    }
}

// ── Trading ───────────────────────────────────────────────────────────────────

impl Trader<Material> for Reactor {
    /// One portfolio per missing assembly, each offering every fuel as an
    /// exclusive alternative.
    fn get_requests(&mut self, ctx: &TraderCtx<'_>) -> FcResult<Vec<RequestPortfolio<Material>>> {
        if self.retired(ctx.time) {
            return Ok(Vec::new());
        }
        let n = self.n_order(ctx.time);
        let mut ports = Vec::with_capacity(n);
        for _ in 0..n {
            let mut port = RequestPortfolio::new();
            let mut alts = Vec::with_capacity(self.in_comps.len());
            for (i, commod) in self.cfg.fuel_incommods.iter().enumerate() {
                let target = Material::descriptor(self.cfg.assem_size, Arc::clone(&self.in_comps[i]));
                alts.push(port.add_request(&target, ctx.agent, commod.as_str(), self.prefs[i], true)?);
            }
            port.add_alternatives(&alts)?;
            port.add_default_constraint();
            ports.push(port);
        }
        Ok(ports)
    }

    /// Spent assemblies, whole and oldest first.
    fn get_bids(
        &mut self,
        requests: &CommodityRequests<Material>,
        ctx:      &TraderCtx<'_>,
    ) -> FcResult<Vec<BidPortfolio<Material>>> {
        if self.spent.is_empty() {
            return Ok(Vec::new());
        }
        let outcommods: BTreeSet<&str> = self.cfg.fuel_outcommods.iter().map(String::as_str).collect();
        let mut ports = Vec::new();
        for commod in outcommods {
            let Some(reqs) = requests.get(commod) else { continue };
            let mut mats = Vec::new();
            for m in self.spent.iter() {
                if self.cfg.fuel_outcommods[self.fuel_index(m)?] == commod {
                    mats.push(m);
                }
            }
            if mats.is_empty() {
                continue;
            }

            let mut port = BidPortfolio::new();
            for r in reqs {
                let mut offered = 0.0;
                for m in &mats {
                    port.add_bid(r, *m, ctx.agent, true)?;
                    offered += m.quantity();
                    if offered >= r.qty() {
                        break;
                    }
                }
            }
            let total: f64 = mats.iter().map(|m| m.quantity()).sum();
            port.add_constraint(CapacityConstraint::new(total));
            ports.push(port);
        }
        Ok(ports)
    }

    fn get_trades(
        &mut self,
        trades: &[Trade<Material>],
        _ctx:   &TraderCtx<'_>,
    ) -> FcResult<Vec<(Trade<Material>, Material)>> {
        let mut held = self.spent.pop_n(self.spent.count())?;
        let mut out = Vec::with_capacity(trades.len());
        for t in trades {
            let want = t.bid.source();
            let Some(k) = held.iter().position(|m| m.id() == want) else {
                self.spent.push_all(held)?;
                return Err(FcError::invariant(format!(
                    "reactor no longer holds spent assembly {want} offered on '{}'",
                    t.commodity()
                )));
            };
            let m = held.remove(k);
            self.fuel_of.remove(&m.id());
            out.push((t.clone(), m));
        }
        self.spent.push_all(held)?;
        Ok(out)
    }

    fn accept_trades(&mut self, responses: Vec<(Trade<Material>, Material)>, ctx: &TraderCtx<'_>) -> FcResult<()> {
        for (t, m) in responses {
            let i = self
                .cfg
                .fuel_incommods
                .iter()
                .position(|c| c == t.commodity())
                .ok_or_else(|| FcError::Value(format!("reactor received unsupported fuel '{}'", t.commodity())))?;
            self.fuel_of.insert(m.id(), i);
            if self.core.count() < self.cfg.n_assem_core {
                self.core.push(m)?;
            } else {
                self.fresh.push(m)?;
            }
        }
        debug!(agent = %ctx.agent, core = self.core.count(), fresh = self.fresh.count(), "fuel received");
        Ok(())
    }
}
