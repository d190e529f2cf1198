//! `ExchangeContext`: the transient state of one exchange pass.
//!
//! Created at the start of a pass, filled with portfolios and preferences,
//! handed to the translator and executor, then dropped.  Nothing in it
//! survives the pass.

use std::collections::BTreeMap;
use std::sync::Arc;

use fc_core::{AgentId, PortfolioId};
use fc_resource::Resource;

use crate::bid::{BidPortfolio, RegisteredBidPortfolio};
use crate::request::{RegisteredRequestPortfolio, RequestPortfolio};
use crate::trader::{ArcPref, CommodityRequests};

#[derive(Debug)]
pub struct ExchangeContext<T: Resource> {
    request_portfolios:    Vec<RegisteredRequestPortfolio<T>>,
    bid_portfolios:        Vec<RegisteredBidPortfolio<T>>,
    requests_by_commodity: CommodityRequests<T>,
    n_requests:            u32,
    n_bids:                u32,
    /// Arcs grouped by requester, each list in bid registration order.
    prefs:                 BTreeMap<AgentId, Vec<ArcPref<T>>>,
}

impl<T: Resource> Default for ExchangeContext<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> ExchangeContext<T> {
    pub fn new() -> Self {
        Self {
            request_portfolios:    Vec::new(),
            bid_portfolios:        Vec::new(),
            requests_by_commodity: BTreeMap::new(),
            n_requests:            0,
            n_bids:                0,
            prefs:                 BTreeMap::new(),
        }
    }

    /// Register a request portfolio, assigning portfolio and request ids.
    /// Empty portfolios are ignored.
    pub fn add_request_portfolio(&mut self, p: RequestPortfolio<T>) -> Option<PortfolioId> {
        if p.is_empty() {
            return None;
        }
        let id = PortfolioId(self.request_portfolios.len() as u32);
        let first = self.n_requests;
        self.n_requests += p.requests().len() as u32;
        let reg = p.into_registered(id, first);
        for r in &reg.requests {
            self.requests_by_commodity
                .entry(r.commodity().to_owned())
                .or_default()
                .push(Arc::clone(r));
        }
        self.request_portfolios.push(reg);
        Some(id)
    }

    /// Register a bid portfolio and seed the preference of each new arc from
    /// its request.  Empty portfolios are ignored.
    pub fn add_bid_portfolio(&mut self, p: BidPortfolio<T>) -> Option<PortfolioId> {
        if p.is_empty() {
            return None;
        }
        let id = PortfolioId(self.bid_portfolios.len() as u32);
        let first = self.n_bids;
        self.n_bids += p.bids().len() as u32;
        let reg = p.into_registered(id, first);
        for b in &reg.bids {
            let request = Arc::clone(b.request());
            let pref = request.preference();
            self.prefs
                .entry(request.requester())
                .or_default()
                .push(ArcPref { request, bid: Arc::clone(b), pref });
        }
        self.bid_portfolios.push(reg);
        Some(id)
    }

    pub fn request_portfolios(&self) -> &[RegisteredRequestPortfolio<T>] {
        &self.request_portfolios
    }

    pub fn bid_portfolios(&self) -> &[RegisteredBidPortfolio<T>] {
        &self.bid_portfolios
    }

    pub fn request_portfolio(&self, id: PortfolioId) -> Option<&RegisteredRequestPortfolio<T>> {
        self.request_portfolios.get(id.index())
    }

    pub fn bid_portfolio(&self, id: PortfolioId) -> Option<&RegisteredBidPortfolio<T>> {
        self.bid_portfolios.get(id.index())
    }

    pub fn requests_by_commodity(&self) -> &CommodityRequests<T> {
        &self.requests_by_commodity
    }

    pub fn has_requests(&self) -> bool {
        !self.request_portfolios.is_empty()
    }

    /// Requesters that have at least one arc, in id order.
    pub fn requesters_with_arcs(&self) -> Vec<AgentId> {
        self.prefs.keys().copied().collect()
    }

    /// Mutable access to one requester's arcs for preference adjustment.
    pub fn prefs_for_mut(&mut self, requester: AgentId) -> Option<&mut [ArcPref<T>]> {
        self.prefs.get_mut(&requester).map(|v| v.as_mut_slice())
    }

    /// All arcs with a non-negative preference, in bid registration order.
    pub fn arcs(&self) -> Vec<&ArcPref<T>> {
        let mut all: Vec<&ArcPref<T>> = self
            .prefs
            .values()
            .flatten()
            .filter(|a| a.pref >= 0.0)
            .collect();
        all.sort_by_key(|a| a.bid.id());
        all
    }
}
