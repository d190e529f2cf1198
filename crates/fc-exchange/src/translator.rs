//! Translation between typed portfolios and the numeric `ExchangeGraph`.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{trace, warn};

use fc_core::tolerance::almost_eq;
use fc_core::{AgentId, BidId, FcError, FcResult, RequestId};
use fc_resource::Resource;

use crate::bid::Bid;
use crate::constraint::{CapacityConstraint, CANNOT_SUPPLY};
use crate::context::ExchangeContext;
use crate::graph::{ExchangeArc, ExchangeGraph};
use crate::partition::Partition;
use crate::request::Request;
use crate::trade::Trade;

/// A built graph plus what is needed to turn its matches back into trades.
#[derive(Debug)]
pub struct Translation<T: Resource> {
    pub graph: ExchangeGraph,
    arcs:      Vec<(Arc<Request<T>>, Arc<Bid<T>>)>,
}

impl<T: Resource> Translation<T> {
    /// Trades for every non-trivial match, in match order.
    pub fn back_translate(&self, eps: f64) -> Vec<Trade<T>> {
        self.graph
            .matches()
            .iter()
            .filter(|m| m.qty > eps)
            .map(|m| {
                let (request, bid) = &self.arcs[m.arc];
                Trade {
                    request:    Arc::clone(request),
                    bid:        Arc::clone(bid),
                    amt:        m.qty,
                    preference: self.graph.arcs[m.arc].pref,
                }
            })
            .collect()
    }
}

/// Active constraints of a portfolio, warning once for each skipped one.
fn active<'a, T: Resource>(
    constraints: &'a [CapacityConstraint<T>],
    side:        &str,
    owner:       AgentId,
) -> Vec<&'a CapacityConstraint<T>> {
    constraints
        .iter()
        .filter(|c| {
            if !c.is_active() {
                warn!(agent = %owner, side, capacity = c.capacity(),
                      "skipping capacity constraint with non-positive capacity");
            }
            c.is_active()
        })
        .collect()
}

/// Per-unit cost of `offer` against each constraint.  `None` when a
/// converter reports the pairing cannot be supplied.
fn unit_costs<T: Resource>(
    constraints: &[&CapacityConstraint<T>],
    offer:       &T,
    request:     &Request<T>,
) -> FcResult<Option<Vec<f64>>> {
    let qty = offer.quantity();
    let mut units = Vec::with_capacity(constraints.len());
    for c in constraints {
        let val = c.convert(offer, request);
        if val.is_nan() || val < 0.0 {
            return Err(FcError::invariant(format!(
                "converter returned {val} for {} on '{}'",
                request.id(),
                request.commodity()
            )));
        }
        if val >= CANNOT_SUPPLY {
            return Ok(None);
        }
        units.push(val / qty);
    }
    Ok(Some(units))
}

/// Quantity an arc must carry when either endpoint is exclusive.
///
/// | request   | bid       | value                                      |
/// |-----------|-----------|--------------------------------------------|
/// | exclusive | exclusive | `rq` if `rq == bq`, else 0                 |
/// | exclusive | flexible  | `rq` if the offer covers it, else 0        |
/// | flexible  | exclusive | `bq` if the request can absorb it, else 0  |
/// | flexible  | flexible  | 0 (arc is not exclusive)                   |
///
/// A value of 0 on an exclusive arc means the arc can never carry flow.
pub(crate) fn exclusive_value(u_ex: bool, v_ex: bool, rq: f64, bq: f64, eps: f64) -> f64 {
    match (u_ex, v_ex) {
        (true, true) if almost_eq(rq, bq, eps) => rq,
        (true, false) if bq + eps >= rq => rq,
        (false, true) if bq <= rq + eps => bq,
        _ => 0.0,
    }
}

/// Build the graph for one partition.
pub fn translate<T: Resource>(
    ctx:              &ExchangeContext<T>,
    part:             &Partition,
    exclusive_orders: bool,
    eps:              f64,
) -> FcResult<Translation<T>> {
    let mut graph = ExchangeGraph::new();
    let mut req_nodes: BTreeMap<RequestId, usize> = BTreeMap::new();
    let mut bid_nodes: BTreeMap<BidId, usize> = BTreeMap::new();
    let mut req_constraints = BTreeMap::new();
    let mut bid_constraints = BTreeMap::new();

    for &pi in &part.request_portfolios {
        let rp = &ctx.request_portfolios()[pi];
        let cons = active(&rp.constraints, "request", rp.requester);
        let group = graph.add_request_group(rp.qty, cons.iter().map(|c| c.capacity()).collect());
        let mut nodes = Vec::with_capacity(rp.requests.len());
        for r in &rp.requests {
            let n = graph.add_request_node(group, r.qty(), exclusive_orders && r.exclusive());
            req_nodes.insert(r.id(), n);
            nodes.push(n);
        }
        for m in &rp.mutual {
            graph.add_mutual_group(m.iter().map(|&i| nodes[i]).collect());
        }
        req_constraints.insert(rp.id, cons);
    }

    for &pi in &part.bid_portfolios {
        let bp = &ctx.bid_portfolios()[pi];
        let cons = active(&bp.constraints, "bid", bp.bidder);
        let group = graph.add_supply_group(cons.iter().map(|c| c.capacity()).collect());
        for b in &bp.bids {
            let n = graph.add_supply_node(group, b.offer().quantity(), exclusive_orders && b.exclusive());
            bid_nodes.insert(b.id(), n);
        }
        bid_constraints.insert(bp.id, cons);
    }

    let mut arcs = Vec::new();
    for a in ctx.arcs() {
        let (Some(&vnode), Some(&unode)) = (bid_nodes.get(&a.bid.id()), req_nodes.get(&a.request.id()))
        else {
            continue;
        };
        let offer = a.bid.offer();
        let qty = offer.quantity();
        if qty <= eps {
            trace!(bid = %a.bid.id(), "skipping empty offer");
            continue;
        }
        let empty = Vec::new();
        let u_cons = req_constraints.get(&a.request.portfolio()).unwrap_or(&empty);
        let v_cons = bid_constraints.get(&a.bid.portfolio()).unwrap_or(&empty);
        let (Some(u_unit), Some(v_unit)) = (
            unit_costs(u_cons, offer, &a.request)?,
            unit_costs(v_cons, offer, &a.request)?,
        ) else {
            trace!(bid = %a.bid.id(), request = %a.request.id(), "converter excluded arc");
            continue;
        };

        let u_ex = graph.request_nodes[unode].exclusive;
        let v_ex = graph.supply_nodes[vnode].exclusive;
        let rq = graph.request_nodes[unode].qty;
        let excl_val = exclusive_value(u_ex, v_ex, rq, qty, eps);
        graph.add_arc(ExchangeArc {
            unode,
            vnode,
            pref: a.pref,
            u_unit,
            v_unit,
            exclusive: u_ex || v_ex,
            excl_val,
        });
        arcs.push((Arc::clone(&a.request), Arc::clone(&a.bid)));
    }

    Ok(Translation { graph, arcs })
}
