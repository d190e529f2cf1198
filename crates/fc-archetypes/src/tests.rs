//! Scenario tests for the archetypes, run through full simulations.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use fc_core::{FcError, FcResult, ResourceId, SimInfo, Tick};
use fc_exchange::{ArcPref, RequestPortfolio, Trade, Trader, TraderCtx};
use fc_output::{MemBackend, MemHandle, Value};
use fc_resource::{CompMap, Composition, Material, Resource};
use fc_sim::{Agent, NoopObserver, SimBuilder, SimError, SimSummary};

use crate::*;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn fresh_uox() -> Arc<Composition> {
    let mut m = CompMap::new();
    m.insert(922350000, 0.04);
    m.insert(922380000, 0.96);
    Composition::from_mass(m).unwrap()
}

fn spent_uox() -> Arc<Composition> {
    let mut m = CompMap::new();
    m.insert(922350000, 0.01);
    m.insert(922380000, 0.94);
    m.insert(942390000, 0.01);
    m.insert(551370000, 0.04);
    Composition::from_mass(m).unwrap()
}

fn builder(duration: u64) -> (SimBuilder, MemHandle) {
    let mem = MemBackend::new();
    let rows = mem.handle();
    let b = SimBuilder::new(SimInfo::new(duration))
        .recipe("fresh_uox", fresh_uox())
        .recipe("spent_uox", spent_uox())
        .backend(Box::new(mem));
    (b, rows)
}

fn run(b: SimBuilder) -> Result<SimSummary, SimError> {
    b.build()?.run(&mut NoopObserver)
}

fn uox_reactor() -> ReactorConfig {
    ReactorConfig::single_fuel("uox", "fresh_uox", "waste", "spent_uox")
}

fn received_by(rows: &MemHandle, agent: u64) -> f64 {
    rows.rows("Transactions")
        .iter()
        .filter(|d| d.get("ReceiverId") == Some(&Value::UInt(agent)))
        .filter_map(|d| d.get("Quantity")?.as_f64())
        .sum()
}

// ── Reactor ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod reactor {
    use super::*;

    #[test]
    fn batch_cadence_trade_count() {
        let duration = 50;
        let mut cfg = uox_reactor();
        cfg.n_assem_core = 7;
        cfg.n_assem_batch = 3;
        cfg.cycle_time = 1;
        cfg.refuel_time = 0;

        let (b, rows) = builder(duration);
        let mut src = SourceConfig::new("uox");
        src.recipe = Some("fresh_uox".into());
        let summary = run(
            b.prototype("source", Box::new(Source::new(src)))
                .prototype("reactor", Box::new(Reactor::new(cfg)))
                .deploy("source", Tick(0))
                .deploy("reactor", Tick(0)),
        )
        .unwrap();

        let expected = 7 + 3 * (duration - 1);
        assert_eq!(rows.count("Transactions") as u64, expected);
        assert_eq!(summary.transactions, expected);
    }

    #[test]
    fn cycle_events_are_recorded() {
        let (b, rows) = builder(4);
        run(b
            .prototype("source", Box::new(Source::new(SourceConfig::new("uox"))))
            .prototype("reactor", Box::new(Reactor::new(uox_reactor())))
            .deploy("source", Tick(0))
            .deploy("reactor", Tick(0)))
        .unwrap();

        let events: Vec<String> = rows
            .rows("ReactorEvents")
            .iter()
            .filter_map(|d| d.get("Event")?.as_str().map(str::to_owned))
            .collect();
        assert_eq!(events[0], "CYCLE_START");
        assert!(events.iter().any(|e| e == "CYCLE_END"));
        assert!(events.iter().any(|e| e == "DISCHARGE"));
    }

    #[test]
    fn retirement_empties_then_decommissions() {
        let mut cfg = uox_reactor();
        cfg.lifetime = Some(5);
        let (b, rows) = builder(10);
        run(b
            .prototype("source", Box::new(Source::new(SourceConfig::new("uox"))))
            .prototype("reactor", Box::new(Reactor::new(cfg)))
            .prototype("sink", Box::new(Sink::new(SinkConfig::new(["waste"]))))
            .deploy("source", Tick(0))
            .deploy("reactor", Tick(0))
            .deploy("sink", Tick(0)))
        .unwrap();

        let exits = rows.rows("AgentExit");
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].get("AgentId"), Some(&Value::UInt(1)));
        assert_eq!(exits[0].get("ExitTime").and_then(Value::as_u64), Some(5));

        let retired = rows
            .rows("ReactorEvents")
            .iter()
            .filter(|d| d.get("Event").and_then(Value::as_str) == Some("RETIRED"))
            .count();
        assert_eq!(retired, 1);
        assert!((received_by(&rows, 2) - received_by(&rows, 1)).abs() < 1e-9);
        assert!((received_by(&rows, 2) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn mismatched_fuel_lists_fail_at_entry() {
        let mut cfg = uox_reactor();
        cfg.fuel_outrecipes.push("spent_uox".into());
        let (b, _) = builder(2);
        let err = run(b.prototype("reactor", Box::new(Reactor::new(cfg))).deploy("reactor", Tick(0))).unwrap_err();
        assert!(matches!(err, SimError::Fc(FcError::Config(_))));
    }

    #[test]
    fn unknown_recipe_is_key_error() {
        let cfg = ReactorConfig::single_fuel("uox", "mox", "waste", "spent_uox");
        let (b, _) = builder(2);
        let err = run(b.prototype("reactor", Box::new(Reactor::new(cfg))).deploy("reactor", Tick(0))).unwrap_err();
        assert!(matches!(err, SimError::Fc(FcError::Key(_))));
    }

    #[test]
    fn config_from_toml_uses_defaults() {
        let cfg: ReactorConfig = toml::from_str(
            r#"
            fuel_incommods  = ["uox"]
            fuel_inrecipes  = ["fresh_uox"]
            fuel_outcommods = ["waste"]
            fuel_outrecipes = ["spent_uox"]
            assem_size      = 29565.0
            n_assem_core    = 3
            n_assem_batch   = 1
            cycle_time      = 18
            "#,
        )
        .unwrap();
        assert_eq!(cfg.refuel_time, 0);
        assert_eq!(cfg.n_assem_fresh, 0);
        assert!(cfg.fuel_prefs.is_empty());
        assert_eq!(cfg.lifetime, None);
        assert!(!cfg.decom_transmute_all);
    }

    /// Requests spent fuel and only accepts offers containing Pu-240.
    #[derive(Clone)]
    struct PuBuyer {
        kept:     Rc<RefCell<Vec<ResourceId>>>,
        received: Rc<RefCell<Vec<Material>>>,
    }

    impl Agent for PuBuyer {
        fn spec(&self) -> &'static str {
            "PuBuyer"
        }

        fn clone_agent(&self) -> Box<dyn Agent> {
            Box::new(self.clone())
        }

        fn material_trader(&mut self) -> Option<&mut dyn Trader<Material>> {
            Some(self)
        }
    }

    impl Trader<Material> for PuBuyer {
        fn get_requests(&mut self, ctx: &TraderCtx<'_>) -> FcResult<Vec<RequestPortfolio<Material>>> {
            let mut port = RequestPortfolio::new();
            port.add_request(&Material::descriptor(2.0, Composition::vacuum()), ctx.agent, "waste", 1.0, false)?;
            Ok(vec![port])
        }

        fn adjust_prefs(&mut self, prefs: &mut [ArcPref<Material>], _ctx: &TraderCtx<'_>) {
            for a in prefs.iter_mut() {
                if a.bid.offer().comp().fraction(PU240) > 0.0 {
                    self.kept.borrow_mut().push(a.bid.source());
                } else {
                    a.pref = -1.0;
                }
            }
        }

        fn accept_trades(&mut self, responses: Vec<(Trade<Material>, Material)>, _ctx: &TraderCtx<'_>) -> FcResult<()> {
            self.received.borrow_mut().extend(responses.into_iter().map(|(_, m)| m));
            Ok(())
        }
    }

    const PU240: u32 = 942400000;

    #[test]
    fn delivers_the_assembly_that_was_offered() {
        let mut spent_b = CompMap::new();
        spent_b.insert(922380000, 0.9);
        spent_b.insert(PU240, 0.1);

        let mut cfg = uox_reactor();
        cfg.fuel_incommods.push("uoxb".into());
        cfg.fuel_inrecipes.push("fresh_uox".into());
        cfg.fuel_outcommods.push("waste".into());
        cfg.fuel_outrecipes.push("spent_b".into());
        cfg.fuel_prefs = vec![2.0, 1.0];
        cfg.n_assem_core = 2;
        cfg.n_assem_batch = 2;
        cfg.cycle_time = 1;

        let source = |commod: &str| {
            let mut c = SourceConfig::new(commod);
            c.recipe = Some("fresh_uox".into());
            c.inventory_size = 1.0;
            Box::new(Source::new(c))
        };
        let buyer = PuBuyer { kept: Rc::default(), received: Rc::default() };
        let (kept, received) = (Rc::clone(&buyer.kept), Rc::clone(&buyer.received));

        let (b, _rows) = builder(2);
        run(b
            .recipe("spent_b", Composition::from_mass(spent_b).unwrap())
            .prototype("src_a", source("uox"))
            .prototype("src_b", source("uoxb"))
            .prototype("reactor", Box::new(Reactor::new(cfg)))
            .prototype("buyer", Box::new(buyer))
            .deploy("src_a", Tick(0))
            .deploy("src_b", Tick(0))
            .deploy("reactor", Tick(0))
            .deploy("buyer", Tick(0)))
        .unwrap();

        // Both spent assemblies are offered; only fuel B's survives the buyer.
        let kept = kept.borrow();
        let received = received.borrow();
        assert_eq!(kept.len(), 1);
        assert!(kept[0].is_valid());
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].id(), kept[0]);
        assert!(received[0].comp().fraction(PU240) > 0.0);
    }
}

// ── Source and Sink ───────────────────────────────────────────────────────────

#[cfg(test)]
mod source_sink {
    use super::*;

    #[test]
    fn zero_throughput_trades_nothing() {
        let mut src = SourceConfig::new("uox");
        src.throughput = 0.0;
        let (b, rows) = builder(5);
        let summary = run(b
            .prototype("source", Box::new(Source::new(src)))
            .prototype("sink", Box::new(Sink::new(SinkConfig::new(["uox"]))))
            .deploy("source", Tick(0))
            .deploy("sink", Tick(0)))
        .unwrap();
        assert_eq!(summary.transactions, 0);
        assert_eq!(rows.count("Transactions"), 0);
    }

    #[test]
    fn throughput_limits_each_step() {
        let mut src = SourceConfig::new("uox");
        src.throughput = 2.5;
        let (b, rows) = builder(4);
        run(b
            .prototype("source", Box::new(Source::new(src)))
            .prototype("sink", Box::new(Sink::new(SinkConfig::new(["uox"]))))
            .deploy("source", Tick(0))
            .deploy("sink", Tick(0)))
        .unwrap();
        assert_eq!(rows.count("Transactions"), 4);
        assert!((received_by(&rows, 1) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn finite_inventory_runs_out() {
        let mut src = SourceConfig::new("uox");
        src.throughput = 2.0;
        src.inventory_size = 5.0;
        let (b, rows) = builder(6);
        run(b
            .prototype("source", Box::new(Source::new(src)))
            .prototype("sink", Box::new(Sink::new(SinkConfig::new(["uox"]))))
            .deploy("source", Tick(0))
            .deploy("sink", Tick(0)))
        .unwrap();
        assert_eq!(rows.count("Transactions"), 3);
        assert!((received_by(&rows, 1) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn sink_capacity_bounds_intake() {
        let mut sink = SinkConfig::new(["uox"]);
        sink.capacity = 3.0;
        let (b, rows) = builder(5);
        run(b
            .prototype("source", Box::new(Source::new(SourceConfig::new("uox"))))
            .prototype("sink", Box::new(Sink::new(sink)))
            .deploy("source", Tick(0))
            .deploy("sink", Tick(0)))
        .unwrap();
        assert_eq!(rows.count("Transactions"), 1);
        assert!((received_by(&rows, 1) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn preferred_commodity_is_taken_first() {
        let mut a = SourceConfig::new("a");
        a.throughput = 4.0;
        let mut c = SourceConfig::new("c");
        c.throughput = 4.0;
        let mut sink = SinkConfig::new(["a", "c"]);
        sink.in_commod_prefs = vec![1.0, 2.0];
        sink.capacity = 5.0;

        let (b, rows) = builder(1);
        run(b
            .prototype("a", Box::new(Source::new(a)))
            .prototype("c", Box::new(Source::new(c)))
            .prototype("sink", Box::new(Sink::new(sink)))
            .deploy("a", Tick(0))
            .deploy("c", Tick(0))
            .deploy("sink", Tick(0)))
        .unwrap();

        let tx = rows.rows("Transactions");
        assert_eq!(tx.len(), 2);
        let qty_of = |commod: &str| {
            tx.iter()
                .find(|d| d.get("Commodity").and_then(Value::as_str) == Some(commod))
                .and_then(|d| d.get("Quantity")?.as_f64())
        };
        assert_eq!(qty_of("c"), Some(4.0));
        assert!((qty_of("a").unwrap_or(0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sink_preference_length_mismatch() {
        let mut sink = SinkConfig::new(["a", "b"]);
        sink.in_commod_prefs = vec![1.0];
        let (b, _) = builder(1);
        let err = run(b.prototype("sink", Box::new(Sink::new(sink))).deploy("sink", Tick(0))).unwrap_err();
        assert!(matches!(err, SimError::Fc(FcError::Config(_))));
    }
}

// ── Mixer ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod mixer {
    use super::*;
    use std::collections::BTreeMap;

    fn stream(ratio: f64, commod: &str) -> MixerStream {
        MixerStream {
            ratio,
            buf_size: UNBOUNDED,
            commods:  BTreeMap::from([(commod.to_owned(), 1.0)]),
        }
    }

    #[test]
    fn ratios_are_renormalized() {
        let mut r = [2.0, 1.0, 5.0];
        assert!(normalize_ratios(&mut r));
        assert_eq!(r, [0.25, 0.125, 0.625]);
        assert!((r.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unit_ratios_are_untouched() {
        let mut r = [0.5, 0.5];
        assert!(!normalize_ratios(&mut r));
        assert_eq!(r, [0.5, 0.5]);
    }

    #[test]
    fn zero_ratios_become_uniform() {
        let mut r = [0.0; 4];
        assert!(normalize_ratios(&mut r));
        assert_eq!(r, [0.25; 4]);
    }

    #[test]
    fn blends_limited_by_scarcest_stream() {
        let mut a = SourceConfig::new("a");
        a.throughput = 2.0;
        a.recipe = Some("fresh_uox".into());
        let mut c = SourceConfig::new("c");
        c.throughput = 2.0;
        c.recipe = Some("spent_uox".into());
        let mix = MixerConfig {
            streams:      vec![stream(1.0, "a"), stream(3.0, "c")],
            out_commod:   "blend".into(),
            out_buf_size: UNBOUNDED,
            throughput:   UNBOUNDED,
            lifetime:     None,
        };

        let (b, rows) = builder(2);
        run(b
            .prototype("a", Box::new(Source::new(a)))
            .prototype("c", Box::new(Source::new(c)))
            .prototype("mixer", Box::new(Mixer::new(mix)))
            .prototype("sink", Box::new(Sink::new(SinkConfig::new(["blend"]))))
            .deploy("a", Tick(0))
            .deploy("c", Tick(0))
            .deploy("mixer", Tick(0))
            .deploy("sink", Tick(0)))
        .unwrap();

        // Step 0 fills both streams with 2; step 1 blends 2 / 0.75 of it.
        assert!((received_by(&rows, 3) - 8.0 / 3.0).abs() < 1e-6);
        assert!((received_by(&rows, 2) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn shared_commodity_across_streams_is_rejected() {
        let mix = MixerConfig {
            streams:      vec![stream(1.0, "a"), stream(1.0, "a")],
            out_commod:   "blend".into(),
            out_buf_size: UNBOUNDED,
            throughput:   UNBOUNDED,
            lifetime:     None,
        };
        let (b, _) = builder(1);
        let err = run(b.prototype("mixer", Box::new(Mixer::new(mix))).deploy("mixer", Tick(0))).unwrap_err();
        assert!(matches!(err, SimError::Fc(FcError::Config(_))));
    }
}
