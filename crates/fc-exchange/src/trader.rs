//! The `Trader` capability and the registry the exchange reaches agents through.

use std::collections::BTreeMap;
use std::sync::Arc;

use fc_core::{AgentId, FcResult, IdCounters, Tick};
use fc_resource::Resource;

use crate::bid::{Bid, BidPortfolio};
use crate::request::{Request, RequestPortfolio};
use crate::trade::Trade;

/// Requests registered this pass, grouped by commodity in name order.
pub type CommodityRequests<T> = BTreeMap<String, Vec<Arc<Request<T>>>>;

/// What a trader sees about the current exchange pass.
#[derive(Copy, Clone)]
pub struct TraderCtx<'a> {
    /// The trader being called.
    pub agent: AgentId,
    pub time:  Tick,
    /// Source of fresh resource ids for anything created while trading.
    pub ids:   &'a IdCounters,
}

/// One request–bid arc and its preference, offered to the requester for
/// adjustment before solving.
#[derive(Clone, Debug)]
pub struct ArcPref<T: Resource> {
    pub request: Arc<Request<T>>,
    pub bid:     Arc<Bid<T>>,
    /// Starts at the request's preference.  A negative value removes the arc.
    pub pref:    f64,
}

/// Capability of an agent that takes part in the exchange for resource `T`.
///
/// # Protocol
///
/// Each pass calls, in order: `get_requests` on every trader, `get_bids` on
/// every trader, `adjust_prefs` on every trader that requested, then
/// `get_trades` on suppliers and `accept_trades` on requesters.  Having
/// nothing to offer or want is expressed with empty vectors, never errors.
pub trait Trader<T: Resource> {
    fn get_requests(&mut self, _ctx: &TraderCtx<'_>) -> FcResult<Vec<RequestPortfolio<T>>> {
        Ok(Vec::new())
    }

    fn get_bids(
        &mut self,
        _requests: &CommodityRequests<T>,
        _ctx:      &TraderCtx<'_>,
    ) -> FcResult<Vec<BidPortfolio<T>>> {
        Ok(Vec::new())
    }

    /// Adjust preferences of the arcs into this trader's requests.
    ///
    /// Default: leave them unchanged.
    fn adjust_prefs(&mut self, _prefs: &mut [ArcPref<T>], _ctx: &TraderCtx<'_>) {}

    /// Produce a concrete resource for each trade this trader must supply.
    ///
    /// Must fail with `FcError::Invariant` if asked for more than it bid.
    fn get_trades(
        &mut self,
        _trades: &[Trade<T>],
        _ctx:    &TraderCtx<'_>,
    ) -> FcResult<Vec<(Trade<T>, T)>> {
        Ok(Vec::new())
    }

    /// Take delivery of resources for this trader's requests.
    fn accept_trades(&mut self, _responses: Vec<(Trade<T>, T)>, _ctx: &TraderCtx<'_>) -> FcResult<()> {
        Ok(())
    }
}

/// Where the exchange finds the traders for one resource kind.
pub trait TraderRegistry<T: Resource> {
    /// Every trader that takes part, in a deterministic order.
    fn trader_ids(&self) -> Vec<AgentId>;

    fn trader_mut(&mut self, id: AgentId) -> Option<&mut dyn Trader<T>>;
}

impl<T: Resource> TraderRegistry<T> for BTreeMap<AgentId, Box<dyn Trader<T>>> {
    fn trader_ids(&self) -> Vec<AgentId> {
        self.keys().copied().collect()
    }

    fn trader_mut(&mut self, id: AgentId) -> Option<&mut dyn Trader<T>> {
        let t: &mut dyn Trader<T> = self.get_mut(&id)?.as_mut();
        Some(t)
    }
}
