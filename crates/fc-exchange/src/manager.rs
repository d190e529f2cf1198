//! `ExchangeManager`: one full exchange pass for one resource kind.
//!
//! # Pass
//!
//! 1. **Collect**: requests from every trader, then (only if any exist) bids
//!    from every trader against the requests grouped by commodity.
//! 2. **Adjust**: each requester may rewrite preferences on its arcs.
//! 3. **Partition** commodities into independently solvable groups.
//! 4. **Solve** every partition (in parallel with the `parallel` feature)
//!    and merge trades in partition order.
//! 5. **Execute**: verify, fulfil and deliver through `TradeExecutor`.
//!
//! The `ExchangeContext` built in step 1 is dropped at the end of the pass.

use std::marker::PhantomData;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use fc_core::{AgentId, FcError, FcResult, IdCounters, SolverConfig, Tick};
use fc_resource::Resource;

use crate::context::ExchangeContext;
use crate::executor::TradeExecutor;
use crate::partition::{partition, Partition};
use crate::solver::{make_solver, Solver};
use crate::trade::{Trade, TradeRecord};
use crate::trader::{TraderCtx, TraderRegistry};
use crate::translator::translate;

pub struct ExchangeManager<T: Resource> {
    solver:           Box<dyn Solver>,
    exclusive_orders: bool,
    eps:              f64,
    _kind:            PhantomData<fn() -> T>,
}

impl<T: Resource> ExchangeManager<T> {
    pub fn new(config: &SolverConfig, eps: f64) -> Self {
        Self::with_solver(make_solver(config, eps), config.exclusive_orders, eps)
    }

    pub fn with_solver(solver: Box<dyn Solver>, exclusive_orders: bool, eps: f64) -> Self {
        Self { solver, exclusive_orders, eps, _kind: PhantomData }
    }

    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    /// Run a complete pass and return the executed transactions.
    pub fn execute<R>(&self, registry: &mut R, time: Tick, ids: &IdCounters) -> FcResult<Vec<TradeRecord>>
    where
        R: TraderRegistry<T> + ?Sized,
    {
        let ctx = self.collect(registry, time, ids)?;
        if !ctx.has_requests() {
            return Ok(Vec::new());
        }
        let trades = self.solve(&ctx)?;
        let executor = TradeExecutor::new(trades);
        executor.verify(&ctx, self.eps)?;
        let records = executor.execute(registry, time, ids, self.eps)?;
        debug!(kind = %T::KIND, %time, trades = records.len(), "exchange pass complete");
        Ok(records)
    }

    /// Steps 1–2: gather portfolios and adjusted preferences.
    pub fn collect<R>(&self, registry: &mut R, time: Tick, ids: &IdCounters) -> FcResult<ExchangeContext<T>>
    where
        R: TraderRegistry<T> + ?Sized,
    {
        let mut ctx = ExchangeContext::new();
        let traders = registry.trader_ids();

        for &id in &traders {
            let Some(trader) = registry.trader_mut(id) else { continue };
            let tctx = TraderCtx { agent: id, time, ids };
            for p in trader.get_requests(&tctx)? {
                check_owner(p.requester(), id, "request")?;
                ctx.add_request_portfolio(p);
            }
        }
        if !ctx.has_requests() {
            return Ok(ctx);
        }

        for &id in &traders {
            let Some(trader) = registry.trader_mut(id) else { continue };
            let tctx = TraderCtx { agent: id, time, ids };
            for p in trader.get_bids(ctx.requests_by_commodity(), &tctx)? {
                check_owner(p.bidder(), id, "bid")?;
                ctx.add_bid_portfolio(p);
            }
        }

        for requester in ctx.requesters_with_arcs() {
            let (Some(trader), Some(prefs)) = (registry.trader_mut(requester), ctx.prefs_for_mut(requester))
            else {
                continue;
            };
            let tctx = TraderCtx { agent: requester, time, ids };
            trader.adjust_prefs(prefs, &tctx);
        }

        debug!(
            kind = %T::KIND,
            request_portfolios = ctx.request_portfolios().len(),
            bid_portfolios = ctx.bid_portfolios().len(),
            "exchange collected"
        );
        Ok(ctx)
    }

    /// Steps 3–4: partition, solve and merge.
    pub fn solve(&self, ctx: &ExchangeContext<T>) -> FcResult<Vec<Trade<T>>> {
        let parts = partition(ctx);

        #[cfg(feature = "parallel")]
        let solved: Vec<FcResult<Vec<Trade<T>>>> =
            parts.par_iter().map(|p| self.solve_partition(ctx, p)).collect();

        #[cfg(not(feature = "parallel"))]
        let solved: Vec<FcResult<Vec<Trade<T>>>> =
            parts.iter().map(|p| self.solve_partition(ctx, p)).collect();

        let mut trades = Vec::new();
        for part in solved {
            trades.extend(part?);
        }
        Ok(trades)
    }

    fn solve_partition(&self, ctx: &ExchangeContext<T>, part: &Partition) -> FcResult<Vec<Trade<T>>> {
        let mut xlate = translate(ctx, part, self.exclusive_orders, self.eps)?;
        let objective = self.solver.solve(&mut xlate.graph)?;
        debug!(
            solver = self.solver.name(),
            commodities = ?part.commodities,
            arcs = xlate.graph.arcs.len(),
            matches = xlate.graph.matches().len(),
            objective,
            "partition solved"
        );
        Ok(xlate.back_translate(self.eps))
    }
}

fn check_owner(owner: Option<AgentId>, caller: AgentId, what: &str) -> FcResult<()> {
    match owner {
        Some(o) if o != caller => Err(FcError::Key(format!(
            "{caller} returned a {what} portfolio belonging to {o}"
        ))),
        _ => Ok(()),
    }
}
