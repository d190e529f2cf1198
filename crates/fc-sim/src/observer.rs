//! Simulation observer trait for progress reporting and data collection.

use fc_core::{AgentId, Tick};
use fc_exchange::TradeRecord;
use fc_resource::ResourceKind;

use crate::sim::SimSummary;

/// Callbacks invoked by [`Sim::run`][crate::Sim::run] at key points in the
/// step loop.
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.
///
/// # Example: trade counter
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct TradeCounter(usize);
///
/// impl SimObserver for TradeCounter {
///     fn on_trades(&mut self, _kind: ResourceKind, trades: &[TradeRecord]) {
///         self.0 += trades.len();
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called at the very start of each step, before BuildPending.
    fn on_step_start(&mut self, _t: Tick) {}

    /// Called after an agent has entered and been registered.
    fn on_agent_enter(&mut self, _agent: AgentId, _prototype: &str, _t: Tick) {}

    /// Called once per exchange pass with the executed transactions.
    fn on_trades(&mut self, _kind: ResourceKind, _trades: &[TradeRecord]) {}

    /// Called after an agent has been decommissioned and removed.
    fn on_agent_exit(&mut self, _agent: AgentId, _t: Tick) {}

    /// Called at the end of each step, after DecommissionPending.
    fn on_step_end(&mut self, _t: Tick) {}

    /// Called once after the last step.
    fn on_sim_end(&mut self, _summary: &SimSummary) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
