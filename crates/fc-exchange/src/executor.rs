//! `TradeExecutor`: turns solved trades into resource transfers.
//!
//! # Steps
//!
//! 1. **Verify** the trade set against every bid and portfolio constraint.
//!    Over-allocation here means a solver or bookkeeping bug and is an
//!    `FcError::Invariant`; nothing is transferred.
//! 2. **Fulfil**: group trades by supplier (ascending agent id) and ask each
//!    supplier for the concrete resources.  Every response must be a tracked
//!    resource of the traded quantity.
//! 3. **Deliver**: group responses by requester (ascending agent id) and hand
//!    them over.  Resources move by value, so each one has exactly one owner
//!    at every point.

use std::collections::BTreeMap;

use tracing::debug;

use fc_core::{AgentId, BidId, FcError, FcResult, IdCounters, PortfolioId, Tick};
use fc_resource::Resource;

use crate::constraint::CANNOT_SUPPLY;
use crate::context::ExchangeContext;
use crate::trade::{Trade, TradeRecord};
use crate::trader::{TraderCtx, TraderRegistry};

#[inline]
fn tol(eps: f64, cap: f64) -> f64 {
    eps * (1.0 + cap.abs())
}

pub struct TradeExecutor<T: Resource> {
    trades: Vec<Trade<T>>,
}

impl<T: Resource> TradeExecutor<T> {
    pub fn new(trades: Vec<Trade<T>>) -> Self {
        Self { trades }
    }

    pub fn trades(&self) -> &[Trade<T>] {
        &self.trades
    }

    /// Check per-bid and per-portfolio totals against declared capacities.
    pub fn verify(&self, ctx: &ExchangeContext<T>, eps: f64) -> FcResult<()> {
        let mut per_bid: BTreeMap<BidId, f64> = BTreeMap::new();
        let mut per_bid_port: BTreeMap<PortfolioId, Vec<f64>> = BTreeMap::new();
        let mut per_req_port: BTreeMap<PortfolioId, (f64, Vec<f64>)> = BTreeMap::new();

        for t in &self.trades {
            if !t.amt.is_finite() || t.amt < -eps {
                return Err(FcError::invariant(format!(
                    "trade on '{}' has invalid quantity {}",
                    t.commodity(),
                    t.amt
                )));
            }
            let offer = t.bid.offer();
            let offer_qty = offer.quantity();
            *per_bid.entry(t.bid.id()).or_default() += t.amt;

            let bp = ctx.bid_portfolio(t.bid.portfolio()).ok_or_else(|| {
                FcError::invariant(format!("trade references unregistered bid {}", t.bid.id()))
            })?;
            let used = per_bid_port
                .entry(bp.id)
                .or_insert_with(|| vec![0.0; bp.constraints.len()]);
            for (u, c) in used.iter_mut().zip(&bp.constraints) {
                *u += unit_cost(c.convert(offer, &t.request), offer_qty)? * t.amt;
            }

            let rp = ctx.request_portfolio(t.request.portfolio()).ok_or_else(|| {
                FcError::invariant(format!("trade references unregistered {}", t.request.id()))
            })?;
            let (total, used) = per_req_port
                .entry(rp.id)
                .or_insert_with(|| (0.0, vec![0.0; rp.constraints.len()]));
            *total += t.amt;
            for (u, c) in used.iter_mut().zip(&rp.constraints) {
                *u += unit_cost(c.convert(offer, &t.request), offer_qty)? * t.amt;
            }
        }

        for t in &self.trades {
            let matched = per_bid.get(&t.bid.id()).copied().unwrap_or(0.0);
            let offered = t.bid.offer().quantity();
            if matched > offered + tol(eps, offered) {
                return Err(FcError::invariant(format!(
                    "{} from {} offered {offered} but was matched {matched}",
                    t.bid.id(),
                    t.supplier()
                )));
            }
        }
        for (pid, used) in &per_bid_port {
            if let Some(bp) = ctx.bid_portfolio(*pid) {
                for (c, u) in bp.constraints.iter().zip(used) {
                    if c.is_active() && *u > c.capacity() + tol(eps, c.capacity()) {
                        return Err(FcError::invariant(format!(
                            "bid portfolio of {} on '{}' matched {u} over capacity {}",
                            bp.bidder,
                            bp.commodity,
                            c.capacity()
                        )));
                    }
                }
            }
        }
        for (pid, (total, used)) in &per_req_port {
            if let Some(rp) = ctx.request_portfolio(*pid) {
                if *total > rp.qty + tol(eps, rp.qty) {
                    return Err(FcError::invariant(format!(
                        "request portfolio of {} received {total} but asked for {}",
                        rp.requester, rp.qty
                    )));
                }
                for (c, u) in rp.constraints.iter().zip(used) {
                    if c.is_active() && *u > c.capacity() + tol(eps, c.capacity()) {
                        return Err(FcError::invariant(format!(
                            "request portfolio of {} matched {u} over capacity {}",
                            rp.requester,
                            c.capacity()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Fulfil and deliver every trade, returning one record per transfer.
    pub fn execute<R>(
        self,
        registry: &mut R,
        time:     Tick,
        ids:      &IdCounters,
        eps:      f64,
    ) -> FcResult<Vec<TradeRecord>>
    where
        R: TraderRegistry<T> + ?Sized,
    {
        let mut by_supplier: BTreeMap<AgentId, Vec<Trade<T>>> = BTreeMap::new();
        for t in self.trades {
            by_supplier.entry(t.supplier()).or_default().push(t);
        }

        let mut by_requester: BTreeMap<AgentId, Vec<(Trade<T>, T)>> = BTreeMap::new();
        let mut records = Vec::new();
        for (supplier, trades) in by_supplier {
            let trader = registry.trader_mut(supplier).ok_or_else(|| {
                FcError::invariant(format!("supplier {supplier} is not a registered trader"))
            })?;
            let ctx = TraderCtx { agent: supplier, time, ids };
            let responses = trader.get_trades(&trades, &ctx)?;
            if responses.len() != trades.len() {
                return Err(FcError::invariant(format!(
                    "{supplier} returned {} resources for {} trades",
                    responses.len(),
                    trades.len()
                )));
            }
            for (trade, res) in responses {
                if trade.supplier() != supplier {
                    return Err(FcError::invariant(format!(
                        "{supplier} answered a trade owed by {}",
                        trade.supplier()
                    )));
                }
                if !res.is_tracked() {
                    return Err(FcError::invariant(format!(
                        "{supplier} supplied an untracked resource"
                    )));
                }
                if (res.quantity() - trade.amt).abs() > tol(eps, trade.amt) {
                    return Err(FcError::invariant(format!(
                        "{supplier} supplied {} for a trade of {}",
                        res.quantity(),
                        trade.amt
                    )));
                }
                records.push(TradeRecord {
                    id:         ids.next_transaction(),
                    kind:       T::KIND,
                    sender:     supplier,
                    receiver:   trade.requester(),
                    resource:   res.id(),
                    commodity:  trade.commodity().to_owned(),
                    quantity:   res.quantity(),
                    preference: trade.preference,
                    time,
                });
                by_requester.entry(trade.requester()).or_default().push((trade, res));
            }
        }

        for (requester, responses) in by_requester {
            let trader = registry.trader_mut(requester).ok_or_else(|| {
                FcError::invariant(format!("requester {requester} is not a registered trader"))
            })?;
            let ctx = TraderCtx { agent: requester, time, ids };
            debug!(agent = %requester, n = responses.len(), "delivering trades");
            trader.accept_trades(responses, &ctx)?;
        }
        Ok(records)
    }
}

fn unit_cost(val: f64, offer_qty: f64) -> FcResult<f64> {
    if val.is_nan() || val < 0.0 || val >= CANNOT_SUPPLY {
        return Err(FcError::invariant(format!("traded arc has invalid conversion {val}")));
    }
    if offer_qty <= 0.0 {
        return Ok(0.0);
    }
    Ok(val / offer_qty)
}
