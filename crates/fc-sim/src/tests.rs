//! Unit and integration tests for fc-sim.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fc_core::{AgentId, FcError, FcResult, SimInfo, Tick};
use fc_exchange::{BidPortfolio, CapacityConstraint, CommodityRequests, RequestPortfolio, Trade, Trader, TraderCtx};
use fc_output::{MemBackend, MemHandle, Value};
use fc_resource::{Product, Resource, ResourceKind};

use crate::{Agent, AgentCtx, SimBuilder, SimObserver, SimResult, SimSummary, TimeListener};

// ── Helpers ───────────────────────────────────────────────────────────────────

type Log = Rc<RefCell<Vec<String>>>;

/// Records every callback it receives into a shared log.
#[derive(Clone)]
struct Probe {
    log:      Log,
    id:       AgentId,
    lifetime: Option<u64>,
    spawn:    Option<&'static str>,
    ready_at: Option<Tick>,
    ready:    bool,
    kill_at:  Option<Tick>,
    bad:      bool,
    children: Vec<AgentId>,
}

impl Probe {
    fn new(log: &Log) -> Self {
        Probe {
            log:      Rc::clone(log),
            id:       AgentId::INVALID,
            lifetime: None,
            spawn:    None,
            ready_at: None,
            ready:    true,
            kill_at:  None,
            bad:      false,
            children: Vec::new(),
        }
    }

    fn note(&self, what: &str, t: Tick) {
        self.log.borrow_mut().push(format!("{what} {} {}", self.id.0, t.0));
    }
}

impl Agent for Probe {
    fn spec(&self) -> &'static str {
        "Probe"
    }

    fn clone_agent(&self) -> Box<dyn Agent> {
        Box::new(self.clone())
    }

    fn enter(&mut self, ctx: &mut AgentCtx<'_>) -> SimResult<()> {
        if self.bad {
            return Err(FcError::Config("probe misconfigured".into()).into());
        }
        self.id = ctx.agent();
        self.ready = self.ready_at.is_none();
        self.note("enter", ctx.time());
        Ok(())
    }

    fn lifetime(&self) -> Option<u64> {
        self.lifetime
    }

    fn check_decommission_condition(&self) -> bool {
        self.ready
    }

    fn decommission(&mut self, ctx: &mut AgentCtx<'_>) -> SimResult<()> {
        self.note("exit", ctx.time());
        Ok(())
    }

    fn build_notify(&mut self, child: AgentId) {
        self.children.push(child);
        self.log.borrow_mut().push(format!("child {}", child.0));
    }

    fn time_listener(&mut self) -> Option<&mut dyn TimeListener> {
        Some(self)
    }
}

impl TimeListener for Probe {
    fn tick(&mut self, ctx: &mut AgentCtx<'_>) -> SimResult<()> {
        self.note("tick", ctx.time());
        if self.kill_at == Some(ctx.time()) {
            ctx.kill_sim();
        }
        Ok(())
    }

    fn tock(&mut self, ctx: &mut AgentCtx<'_>) -> SimResult<()> {
        self.note("tock", ctx.time());
        if let Some(proto) = self.spawn.take() {
            ctx.schedule_build(proto, ctx.time().next())?;
        }
        if self.ready_at.is_some_and(|r| ctx.time() >= r) {
            self.ready = true;
        }
        Ok(())
    }
}

#[derive(Default)]
struct Counter {
    steps:    usize,
    enters:   usize,
    exits:    usize,
    material: usize,
    product:  usize,
    summary:  Option<SimSummary>,
}

impl SimObserver for Counter {
    fn on_step_end(&mut self, _t: Tick) {
        self.steps += 1;
    }

    fn on_agent_enter(&mut self, _agent: AgentId, _prototype: &str, _t: Tick) {
        self.enters += 1;
    }

    fn on_agent_exit(&mut self, _agent: AgentId, _t: Tick) {
        self.exits += 1;
    }

    fn on_trades(&mut self, kind: ResourceKind, trades: &[fc_exchange::TradeRecord]) {
        match kind {
            ResourceKind::Material => self.material += trades.len(),
            ResourceKind::Product => self.product += trades.len(),
        }
    }

    fn on_sim_end(&mut self, summary: &SimSummary) {
        self.summary = Some(summary.clone());
    }
}

fn with_mem(builder: SimBuilder) -> (SimBuilder, MemHandle) {
    let mem = MemBackend::new();
    let handle = mem.handle();
    (builder.backend(Box::new(mem)), handle)
}

fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

// ── Step loop ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod step_loop {
    use super::*;

    #[test]
    fn phases_run_in_order() {
        let log = Log::default();
        let mut sim = SimBuilder::new(SimInfo::new(2))
            .prototype("p", Box::new(Probe::new(&log)))
            .deploy("p", Tick(0))
            .build()
            .unwrap();
        let mut obs = Counter::default();
        let summary = sim.run(&mut obs).unwrap();

        assert_eq!(entries(&log), ["enter 0 0", "tick 0 0", "tock 0 0", "tick 0 1", "tock 0 1"]);
        assert_eq!(summary.end, Tick(2));
        assert_eq!(summary.steps, 2);
        assert!(!summary.early_term);
        assert_eq!(obs.steps, 2);
        assert_eq!(obs.enters, 1);
        assert_eq!(obs.summary, Some(summary));
    }

    #[test]
    fn later_deployment_enters_at_its_step() {
        let log = Log::default();
        let mut sim = SimBuilder::new(SimInfo::new(3))
            .prototype("p", Box::new(Probe::new(&log)))
            .deploy("p", Tick(2))
            .build()
            .unwrap();
        sim.run(&mut Counter::default()).unwrap();
        assert_eq!(entries(&log), ["enter 0 2", "tick 0 2", "tock 0 2"]);
    }

    #[test]
    fn run_records_info_entry_and_finish() {
        let log = Log::default();
        let (builder, rows) = with_mem(
            SimBuilder::new(SimInfo::new(4))
                .prototype("p", Box::new(Probe::new(&log)))
                .deploy("p", Tick(0)),
        );
        let mut sim = builder.build().unwrap();
        sim.run(&mut Counter::default()).unwrap();

        let info = rows.rows("Info");
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].get("Duration").and_then(Value::as_u64), Some(4));
        assert_eq!(info[0].get("Solver").and_then(Value::as_str), Some("greedy"));

        let entry = rows.rows("AgentEntry");
        assert_eq!(entry.len(), 1);
        assert_eq!(entry[0].get("Spec").and_then(Value::as_str), Some("Probe"));
        assert_eq!(entry[0].get("ParentId"), Some(&Value::Int(-1)));

        let finish = rows.rows("Finish");
        assert_eq!(finish[0].get("EarlyTerm").and_then(Value::as_bool), Some(false));
        assert_eq!(finish[0].get("EndTime").and_then(Value::as_u64), Some(4));
        assert!(sim.step(&mut Counter::default()).is_err());
    }

    #[test]
    fn kill_sim_stops_after_current_step() {
        let log = Log::default();
        let probe = Probe { kill_at: Some(Tick(2)), ..Probe::new(&log) };
        let (builder, rows) = with_mem(
            SimBuilder::new(SimInfo::new(10)).prototype("p", Box::new(probe)).deploy("p", Tick(0)),
        );
        let summary = builder.build().unwrap().run(&mut Counter::default()).unwrap();

        assert!(summary.early_term);
        assert_eq!(summary.end, Tick(3));
        assert!(entries(&log).contains(&"tock 0 2".to_string()));
        assert!(!entries(&log).contains(&"tick 0 3".to_string()));
        assert_eq!(rows.rows("Finish")[0].get("EarlyTerm").and_then(Value::as_bool), Some(true));
    }

    #[test]
    fn config_error_at_entry_aborts() {
        let log = Log::default();
        let probe = Probe { bad: true, ..Probe::new(&log) };
        let mut sim = SimBuilder::new(SimInfo::new(3))
            .prototype("p", Box::new(probe))
            .deploy("p", Tick(0))
            .build()
            .unwrap();
        let err = sim.run(&mut Counter::default()).unwrap_err();
        assert!(matches!(err, crate::SimError::Fc(FcError::Config(_))));
        assert!(!err.is_invariant());
        assert!(sim.agents.is_empty());
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod lifecycle {
    use super::*;

    #[test]
    fn lifetime_schedules_decommission() {
        let log = Log::default();
        let probe = Probe { lifetime: Some(3), ..Probe::new(&log) };
        let (builder, rows) = with_mem(
            SimBuilder::new(SimInfo::new(10)).prototype("p", Box::new(probe)).deploy("p", Tick(0)),
        );
        let mut sim = builder.build().unwrap();
        let mut obs = Counter::default();
        sim.run(&mut obs).unwrap();

        let log = entries(&log);
        assert!(log.contains(&"exit 0 2".to_string()));
        assert!(!log.contains(&"tick 0 3".to_string()));
        assert_eq!(obs.exits, 1);
        assert!(sim.agents.is_empty());
        let exit = rows.rows("AgentExit");
        assert_eq!(exit[0].get("ExitTime").and_then(Value::as_u64), Some(2));
    }

    #[test]
    fn unmet_condition_retries_next_step() {
        let log = Log::default();
        let probe = Probe { lifetime: Some(1), ready_at: Some(Tick(3)), ..Probe::new(&log) };
        let mut sim = SimBuilder::new(SimInfo::new(10))
            .prototype("p", Box::new(probe))
            .deploy("p", Tick(0))
            .build()
            .unwrap();
        sim.run(&mut Counter::default()).unwrap();

        let log = entries(&log);
        assert!(log.contains(&"tock 0 3".to_string()));
        assert!(log.contains(&"exit 0 3".to_string()));
        assert!(!log.contains(&"tick 0 4".to_string()));
    }

    #[test]
    fn child_build_notifies_parent() {
        let log = Log::default();
        let parent = Probe { spawn: Some("kid"), ..Probe::new(&log) };
        let (builder, rows) = with_mem(
            SimBuilder::new(SimInfo::new(3))
                .prototype("parent", Box::new(parent))
                .prototype("kid", Box::new(Probe::new(&log)))
                .deploy("parent", Tick(0)),
        );
        let mut sim = builder.build().unwrap();
        sim.run(&mut Counter::default()).unwrap();

        assert!(entries(&log).contains(&"enter 1 1".to_string()));
        assert!(entries(&log).contains(&"child 1".to_string()));
        assert_eq!(sim.agents.children(AgentId(0)), vec![AgentId(1)]);
        let entry = rows.rows("AgentEntry");
        assert_eq!(entry.len(), 2);
        assert_eq!(entry[1].get("ParentId"), Some(&Value::Int(0)));
        assert_eq!(entry[1].get("EnterTime").and_then(Value::as_u64), Some(1));
    }

    #[test]
    fn spawning_unknown_prototype_fails() {
        let log = Log::default();
        let parent = Probe { spawn: Some("ghost"), ..Probe::new(&log) };
        let mut sim = SimBuilder::new(SimInfo::new(3))
            .prototype("parent", Box::new(parent))
            .deploy("parent", Tick(0))
            .build()
            .unwrap();
        let err = sim.run(&mut Counter::default()).unwrap_err();
        assert!(matches!(err, crate::SimError::Fc(FcError::Key(_))));
    }

    #[test]
    fn remove_agent_skips_condition_but_runs_teardown() {
        let log = Log::default();
        let probe = Probe { ready_at: Some(Tick(100)), ..Probe::new(&log) };
        let (builder, rows) = with_mem(
            SimBuilder::new(SimInfo::new(5)).prototype("p", Box::new(probe)).deploy("p", Tick(0)),
        );
        let mut sim = builder.build().unwrap();
        sim.step(&mut Counter::default()).unwrap();
        sim.remove_agent(AgentId(0)).unwrap();
        assert!(sim.agents.is_empty());
        assert!(entries(&log).contains(&"exit 0 1".to_string()));
        sim.recorder_mut().flush().unwrap();
        let exit = rows.rows("AgentExit");
        assert_eq!(exit.len(), 1);
        assert_eq!(exit[0].get("ExitTime").and_then(Value::as_u64), Some(1));
        assert!(matches!(sim.remove_agent(AgentId(0)), Err(crate::SimError::AgentNotFound(_))));
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod scheduler {
    use super::*;
    use crate::Scheduler;

    #[test]
    fn setup_builds_may_target_now() {
        let mut s = Scheduler::new();
        s.schedule_build("p", None, Tick(0)).unwrap();
        assert_eq!(s.pending_builds(), 1);
    }

    #[test]
    fn running_builds_must_be_future() {
        let mut s = Scheduler::new();
        s.set_now(Tick(5));
        assert!(matches!(s.schedule_build("p", None, Tick(5)), Err(FcError::Value(_))));
        assert!(s.schedule_build("p", None, Tick(4)).is_err());
        s.schedule_build("p", Some(AgentId(1)), Tick(6)).unwrap();
        let orders = s.take_builds(Tick(6));
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].parent, Some(AgentId(1)));
        assert!(s.take_builds(Tick(6)).is_empty());
    }

    #[test]
    fn decommission_now_is_allowed_past_is_not() {
        let mut s = Scheduler::new();
        s.set_now(Tick(5));
        s.schedule_decom(AgentId(0), Tick(5)).unwrap();
        assert!(s.schedule_decom(AgentId(1), Tick(4)).is_err());
        assert_eq!(s.take_decoms(Tick(5)), vec![AgentId(0)]);
        assert_eq!(s.pending_decoms(), 0);
    }

    #[test]
    fn second_decommission_replaces_first() {
        let mut s = Scheduler::new();
        s.schedule_decom(AgentId(2), Tick(8)).unwrap();
        s.schedule_decom(AgentId(2), Tick(3)).unwrap();
        assert_eq!(s.decom_time(AgentId(2)), Some(Tick(3)));
        assert_eq!(s.pending_decoms(), 1);
        assert!(s.take_decoms(Tick(8)).is_empty());
        assert_eq!(s.take_decoms(Tick(3)), vec![AgentId(2)]);
    }

    #[test]
    fn cancel_removes_pending_decommission() {
        let mut s = Scheduler::new();
        s.schedule_decom(AgentId(1), Tick(2)).unwrap();
        s.schedule_decom(AgentId(2), Tick(2)).unwrap();
        s.cancel_decom(AgentId(1));
        assert_eq!(s.take_decoms(Tick(2)), vec![AgentId(2)]);
    }

    #[test]
    fn kill_flag() {
        let mut s = Scheduler::new();
        assert!(!s.kill_requested());
        s.kill_sim();
        assert!(s.kill_requested());
    }
}

// ── Registries and context ────────────────────────────────────────────────────

#[cfg(test)]
mod registries {
    use super::*;
    use crate::{Context, RecipeRegistry};
    use fc_output::Recorder;
    use fc_resource::{CompMap, Composition};

    #[test]
    fn duplicate_prototype_is_key_error() {
        let log = Log::default();
        let result = SimBuilder::new(SimInfo::new(1))
            .prototype("p", Box::new(Probe::new(&log)))
            .prototype("p", Box::new(Probe::new(&log)))
            .build();
        assert!(matches!(result, Err(crate::SimError::Fc(FcError::Key(_)))));
    }

    #[test]
    fn deploying_unknown_prototype_fails() {
        let result = SimBuilder::new(SimInfo::new(1)).deploy("nope", Tick(0)).build();
        assert!(matches!(result, Err(crate::SimError::UnknownPrototype(name)) if name == "nope"));
    }

    #[test]
    fn invalid_info_is_rejected() {
        let result = SimBuilder::new(SimInfo::new(0)).build();
        assert!(matches!(result, Err(crate::SimError::Fc(FcError::Config(_)))));
    }

    #[test]
    fn recipes_are_write_once() {
        let mut m = CompMap::new();
        m.insert(10010000, 1.0);
        let comp = Composition::from_mass(m).unwrap();
        let mut r = RecipeRegistry::new();
        r.add("h", comp.clone()).unwrap();
        assert!(matches!(r.add("h", comp), Err(FcError::Key(_))));
        assert!(r.get("h").is_ok());
        assert!(matches!(r.get("he"), Err(FcError::Key(_))));
    }

    #[test]
    fn instantiate_returns_fresh_copies() {
        let log = Log::default();
        let mut ctx = Context::new(SimInfo::new(1), Recorder::new());
        ctx.add_prototype("p", Box::new(Probe::new(&log))).unwrap();
        assert!(ctx.prototypes().instantiate("p").is_some());
        assert!(ctx.prototypes().instantiate("q").is_none());
        assert_eq!(ctx.prototypes().names().collect::<Vec<_>>(), ["p"]);
    }

    #[test]
    fn reset_restores_counters_and_rng() {
        let mut ctx = Context::new(SimInfo::new(1), Recorder::new());
        let first = ctx.rng_mut().random_01();
        ctx.ids().next_agent();
        ctx.ids().next_agent();
        ctx.scheduler_mut().schedule_decom(AgentId(0), Tick(1)).unwrap();
        ctx.reset();
        assert_eq!(ctx.ids().next_agent(), AgentId(0));
        assert_eq!(ctx.rng_mut().random_01(), first);
        assert_eq!(ctx.scheduler().pending_decoms(), 0);
    }
}

// ── Product exchange ──────────────────────────────────────────────────────────

#[cfg(test)]
mod product_exchange {
    use super::*;

    #[derive(Clone)]
    struct Shop {
        cap: f64,
    }

    impl Agent for Shop {
        fn spec(&self) -> &'static str {
            "Shop"
        }

        fn clone_agent(&self) -> Box<dyn Agent> {
            Box::new(self.clone())
        }

        fn product_trader(&mut self) -> Option<&mut dyn Trader<Product>> {
            Some(self)
        }
    }

    impl Trader<Product> for Shop {
        fn get_bids(
            &mut self,
            requests: &CommodityRequests<Product>,
            ctx:      &TraderCtx<'_>,
        ) -> FcResult<Vec<BidPortfolio<Product>>> {
            let Some(reqs) = requests.get("widgets") else { return Ok(vec![]) };
            let mut port = BidPortfolio::new();
            for r in reqs {
                port.add_bid(r, &Product::descriptor(r.qty(), "blue"), ctx.agent, false)?;
            }
            port.add_constraint(CapacityConstraint::new(self.cap));
            Ok(vec![port])
        }

        fn get_trades(
            &mut self,
            trades: &[Trade<Product>],
            ctx:    &TraderCtx<'_>,
        ) -> FcResult<Vec<(Trade<Product>, Product)>> {
            trades.iter().map(|t| Ok((t.clone(), Product::create(ctx.ids, t.amt, "blue")?))).collect()
        }
    }

    #[derive(Clone)]
    struct Shopper {
        got: Rc<Cell<f64>>,
    }

    impl Agent for Shopper {
        fn spec(&self) -> &'static str {
            "Shopper"
        }

        fn clone_agent(&self) -> Box<dyn Agent> {
            Box::new(self.clone())
        }

        fn product_trader(&mut self) -> Option<&mut dyn Trader<Product>> {
            Some(self)
        }
    }

    impl Trader<Product> for Shopper {
        fn get_requests(&mut self, ctx: &TraderCtx<'_>) -> FcResult<Vec<RequestPortfolio<Product>>> {
            let mut port = RequestPortfolio::new();
            port.add_request(&Product::descriptor(3.0, "blue"), ctx.agent, "widgets", 1.0, false)?;
            port.add_default_constraint();
            Ok(vec![port])
        }

        fn accept_trades(&mut self, responses: Vec<(Trade<Product>, Product)>, _ctx: &TraderCtx<'_>) -> FcResult<()> {
            for (_, p) in responses {
                self.got.set(self.got.get() + p.quantity());
            }
            Ok(())
        }
    }

    #[test]
    fn products_trade_and_are_recorded() {
        let got = Rc::new(Cell::new(0.0));
        let (builder, rows) = with_mem(
            SimBuilder::new(SimInfo::new(1))
                .prototype("buyer", Box::new(Shopper { got: Rc::clone(&got) }))
                .prototype("shop", Box::new(Shop { cap: 5.0 }))
                .deploy("buyer", Tick(0))
                .deploy("buyer", Tick(0))
                .deploy("shop", Tick(0)),
        );
        let mut sim = builder.build().unwrap();
        let mut obs = Counter::default();
        let summary = sim.run(&mut obs).unwrap();

        assert_eq!(obs.product, 2);
        assert_eq!(obs.material, 0);
        assert_eq!(summary.transactions, 2);
        assert!((got.get() - 5.0).abs() < 1e-9);

        let tx = rows.rows("Transactions");
        assert_eq!(tx.len(), 2);
        assert_eq!(tx[0].get("SenderId"), Some(&Value::UInt(2)));
        assert_eq!(tx[0].get("Commodity").and_then(Value::as_str), Some("widgets"));
        let total: f64 = tx.iter().filter_map(|d| d.get("Quantity")?.as_f64()).sum();
        assert!((total - 5.0).abs() < 1e-9);
    }
}
