//! Agent capability traits.
//!
//! An agent is a plain struct that implements [`Agent`] and opts into the
//! other capabilities it has by returning `Some(self)` from the matching
//! accessor:
//!
//! | Accessor            | Capability                     | Called during       |
//! |---------------------|--------------------------------|---------------------|
//! | `time_listener`     | [`TimeListener`]               | Tick, Tock          |
//! | `material_trader`   | `Trader<Material>`             | material exchange   |
//! | `product_trader`    | `Trader<Product>`              | product exchange    |
//!
//! Capabilities are probed once, when the agent enters the arena.

use fc_core::AgentId;
use fc_exchange::Trader;
use fc_resource::{Material, Product};

use crate::context::AgentCtx;
use crate::SimResult;

/// Lifecycle contract every simulated agent fulfils.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone)]
/// struct Idle;
///
/// impl Agent for Idle {
///     fn spec(&self) -> &'static str { "Idle" }
///     fn clone_agent(&self) -> Box<dyn Agent> { Box::new(self.clone()) }
/// }
/// ```
pub trait Agent {
    /// Archetype name (e.g. `"Reactor"`).
    fn spec(&self) -> &'static str;

    fn kind(&self) -> &'static str {
        "Facility"
    }

    /// A fresh, not-yet-entered copy of this agent's configuration.
    fn clone_agent(&self) -> Box<dyn Agent>;

    /// Called once when the agent is built, before it joins any phase.
    ///
    /// Validate configuration here: a `FcError::Config` aborts the build and
    /// the run.
    fn enter(&mut self, _ctx: &mut AgentCtx<'_>) -> SimResult<()> {
        Ok(())
    }

    /// Steps the agent stays alive, or `None` for the whole run.
    fn lifetime(&self) -> Option<u64> {
        None
    }

    /// Whether the agent may be removed now.  Checked at its scheduled
    /// decommission step; `false` retries on the following step.
    fn check_decommission_condition(&self) -> bool {
        true
    }

    /// Called right before the agent is removed.
    fn decommission(&mut self, _ctx: &mut AgentCtx<'_>) -> SimResult<()> {
        Ok(())
    }

    /// A child built with this agent as parent has entered.
    fn build_notify(&mut self, _child: AgentId) {}

    /// A child of this agent has been decommissioned.
    fn decom_notify(&mut self, _child: AgentId) {}

    fn time_listener(&mut self) -> Option<&mut dyn TimeListener> {
        None
    }

    fn material_trader(&mut self) -> Option<&mut dyn Trader<Material>> {
        None
    }

    fn product_trader(&mut self) -> Option<&mut dyn Trader<Product>> {
        None
    }
}

/// The two per-step callbacks around the exchange.
pub trait TimeListener {
    /// Before the exchange: update counters, prepare what to request and offer.
    fn tick(&mut self, ctx: &mut AgentCtx<'_>) -> SimResult<()>;

    /// After the exchange: consume deliveries, advance internal state, and
    /// schedule future builds or decommissions.
    fn tock(&mut self, ctx: &mut AgentCtx<'_>) -> SimResult<()>;
}
