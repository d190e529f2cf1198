//! once_through: a source → reactor → repository fuel cycle.
//!
//! Usage: `once_through [scenario.toml]`.  Without an argument the built-in
//! scenario below is run.  Log verbosity follows `RUST_LOG` (default `info`).

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context as _, Result};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fc_archetypes::{Reactor, ReactorConfig, Sink, SinkConfig, Source, SourceConfig};
use fc_core::{AgentId, SimInfo, Tick};
use fc_exchange::TradeRecord;
use fc_output::{MemBackend, TracingBackend};
use fc_resource::{CompMap, Composition, ResourceKind};
use fc_sim::{SimBuilder, SimObserver, SimSummary};

// ── Constants ─────────────────────────────────────────────────────────────────

const DEFAULT_DURATION: u64 = 120;
const REACTORS:         u64 = 2;
const REACTOR_STAGGER:  u64 = 6; // steps between reactor deployments

// ── Scenario ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Scenario {
    sim:        SimInfo,
    source:     SourceConfig,
    reactor:    ReactorConfig,
    repository: SinkConfig,
}

impl Scenario {
    fn builtin() -> Self {
        let mut source = SourceConfig::new("uox");
        source.recipe = Some("fresh_uox".into());

        let mut reactor = ReactorConfig::single_fuel("uox", "fresh_uox", "spent_uox", "spent_uox");
        reactor.assem_size = 29_565.0;
        reactor.n_assem_core = 3;
        reactor.n_assem_batch = 1;
        reactor.cycle_time = 18;
        reactor.refuel_time = 1;
        reactor.lifetime = Some(96);

        Self {
            sim: SimInfo::new(DEFAULT_DURATION),
            source,
            reactor,
            repository: SinkConfig::new(["spent_uox"]),
        }
    }

    fn load(path: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        let scenario: Scenario = toml::from_str(&text).with_context(|| format!("parsing {path}"))?;
        scenario.sim.validate()?;
        Ok(scenario)
    }
}

fn recipe(pairs: &[(u32, f64)]) -> Result<Arc<Composition>> {
    let mass: CompMap = pairs.iter().copied().collect();
    Ok(Composition::from_mass(mass)?)
}

// ── Observer ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct CycleObserver {
    fuel_moves:  usize,
    spent_moves: usize,
    entered:     Vec<(AgentId, String)>,
    exited:      Vec<AgentId>,
}

impl SimObserver for CycleObserver {
    fn on_agent_enter(&mut self, agent: AgentId, prototype: &str, _t: Tick) {
        self.entered.push((agent, prototype.to_owned()));
    }

    fn on_trades(&mut self, kind: ResourceKind, trades: &[TradeRecord]) {
        if kind != ResourceKind::Material {
            return;
        }
        for t in trades {
            if t.commodity == "uox" {
                self.fuel_moves += 1;
            } else {
                self.spent_moves += 1;
            }
        }
    }

    fn on_agent_exit(&mut self, agent: AgentId, _t: Tick) {
        self.exited.push(agent);
    }

    fn on_sim_end(&mut self, summary: &SimSummary) {
        info!(?summary, "run complete");
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Scenario.
    let scenario = match std::env::args().nth(1) {
        Some(path) => Scenario::load(&path)?,
        None => Scenario::builtin(),
    };
    println!("=== once_through: rust_fc fuel cycle ===");
    println!(
        "Duration: {} steps  |  Seed: {}  |  Solver: {:?}",
        scenario.sim.duration, scenario.sim.seed, scenario.sim.solver.kind
    );
    println!();

    // 2. Output: tracing for every row, memory for the summary below.
    let mem = MemBackend::new();
    let rows = mem.handle();

    // 3. Build.
    let mut builder = SimBuilder::new(scenario.sim.clone())
        .recipe("fresh_uox", recipe(&[(922350000, 0.04), (922380000, 0.96)])?)
        .recipe(
            "spent_uox",
            recipe(&[(922350000, 0.011), (922380000, 0.94), (942390000, 0.009), (551370000, 0.04)])?,
        )
        .prototype("enrichment", Box::new(Source::new(scenario.source)))
        .prototype("lwr", Box::new(Reactor::new(scenario.reactor)))
        .prototype("repository", Box::new(Sink::new(scenario.repository)))
        .backend(Box::new(mem))
        .backend(Box::new(TracingBackend::new()))
        .deploy("enrichment", Tick(0))
        .deploy("repository", Tick(0));
    for i in 0..REACTORS {
        builder = builder.deploy("lwr", Tick(i * REACTOR_STAGGER));
    }
    let mut sim = builder.build()?;

    // 4. Run.
    let mut obs = CycleObserver::default();
    let t0 = Instant::now();
    let summary = sim.run(&mut obs)?;
    let elapsed = t0.elapsed();

    // 5. Summary.
    println!("Simulation complete in {:.3} s", elapsed.as_secs_f64());
    println!("  steps           : {}", summary.steps);
    println!("  agents built    : {}", summary.agents_built);
    println!("  transactions    : {}", summary.transactions);
    println!("  fuel deliveries : {}", obs.fuel_moves);
    println!("  spent shipments : {}", obs.spent_moves);
    println!();

    println!("{:<10} {:<12} {:<8}", "Agent", "Prototype", "Exited");
    println!("{}", "-".repeat(32));
    for (id, proto) in &obs.entered {
        println!("{:<10} {:<12} {:<8}", id.0, proto, if obs.exited.contains(id) { "yes" } else { "no" });
    }
    println!();

    let stored: f64 = rows
        .rows("Transactions")
        .iter()
        .filter(|d| d.get("Commodity").and_then(|v| v.as_str()) == Some("spent_uox"))
        .filter_map(|d| d.get("Quantity")?.as_f64())
        .sum();
    println!("Spent fuel in repository: {stored:.1} kg");
    println!("Reactor events recorded : {}", rows.count("ReactorEvents"));

    Ok(())
}
