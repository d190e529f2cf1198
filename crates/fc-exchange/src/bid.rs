//! Bids and bid portfolios.

use std::sync::Arc;

use fc_core::{AgentId, BidId, FcError, FcResult, PortfolioId, ResourceId};
use fc_resource::Resource;

use crate::constraint::CapacityConstraint;
use crate::request::Request;

/// An offer against one specific request.
#[derive(Clone, Debug)]
pub struct Bid<T: Resource> {
    pub(crate) id:        BidId,
    pub(crate) portfolio: PortfolioId,
    request:              Arc<Request<T>>,
    offer:                T,
    source:               ResourceId,
    bidder:               AgentId,
    exclusive:            bool,
}

impl<T: Resource> Bid<T> {
    pub fn id(&self) -> BidId {
        self.id
    }

    pub fn portfolio(&self) -> PortfolioId {
        self.portfolio
    }

    pub fn request(&self) -> &Arc<Request<T>> {
        &self.request
    }

    /// Untracked description of what would be supplied.
    pub fn offer(&self) -> &T {
        &self.offer
    }

    /// Id of the tracked resource the offer was copied from, or
    /// `ResourceId::INVALID` when the offer was built as a descriptor.
    pub fn source(&self) -> ResourceId {
        self.source
    }

    pub fn bidder(&self) -> AgentId {
        self.bidder
    }

    /// An exclusive bid must be taken whole or not at all.
    pub fn exclusive(&self) -> bool {
        self.exclusive
    }
}

// ── BidPortfolio ──────────────────────────────────────────────────────────────

/// All bids one supplier makes on one commodity in one exchange pass.
#[derive(Clone, Debug)]
pub struct BidPortfolio<T: Resource> {
    bidder:      Option<AgentId>,
    commodity:   Option<String>,
    bids:        Vec<Bid<T>>,
    constraints: Vec<CapacityConstraint<T>>,
}

impl<T: Resource> Default for BidPortfolio<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> BidPortfolio<T> {
    pub fn new() -> Self {
        Self { bidder: None, commodity: None, bids: Vec::new(), constraints: Vec::new() }
    }

    /// Add a bid on `request` and return its index within the portfolio.
    ///
    /// Fails with `FcError::Key` if the bidder differs from earlier bids or the
    /// request's commodity differs from the portfolio's.
    pub fn add_bid(
        &mut self,
        request:   &Arc<Request<T>>,
        offer:     &T,
        bidder:    AgentId,
        exclusive: bool,
    ) -> FcResult<usize> {
        match self.bidder {
            None => self.bidder = Some(bidder),
            Some(b) if b != bidder => {
                return Err(FcError::Key(format!("bid from {bidder} added to portfolio of {b}")));
            }
            Some(_) => {}
        }
        match &self.commodity {
            None => self.commodity = Some(request.commodity().to_owned()),
            Some(c) if c != request.commodity() => {
                return Err(FcError::Key(format!(
                    "bid on '{}' added to portfolio for '{c}'",
                    request.commodity()
                )));
            }
            Some(_) => {}
        }
        let qty = offer.quantity();
        if !qty.is_finite() || qty < 0.0 {
            return Err(FcError::Value(format!("bid offer quantity {qty} is invalid")));
        }
        self.bids.push(Bid {
            id: BidId::INVALID,
            portfolio: PortfolioId::INVALID,
            request: Arc::clone(request),
            offer: offer.untracked(),
            source: offer.id(),
            bidder,
            exclusive,
        });
        Ok(self.bids.len() - 1)
    }

    pub fn add_constraint(&mut self, c: CapacityConstraint<T>) {
        self.constraints.push(c);
    }

    pub fn bidder(&self) -> Option<AgentId> {
        self.bidder
    }

    pub fn commodity(&self) -> Option<&str> {
        self.commodity.as_deref()
    }

    pub fn bids(&self) -> &[Bid<T>] {
        &self.bids
    }

    pub fn constraints(&self) -> &[CapacityConstraint<T>] {
        &self.constraints
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }

    pub(crate) fn into_registered(self, id: PortfolioId, first: u32) -> RegisteredBidPortfolio<T> {
        let bidder = self.bidder.unwrap_or(AgentId::INVALID);
        let commodity = self.commodity.unwrap_or_default();
        let bids = self
            .bids
            .into_iter()
            .enumerate()
            .map(|(i, mut b)| {
                b.id = BidId(first + i as u32);
                b.portfolio = id;
                Arc::new(b)
            })
            .collect();
        RegisteredBidPortfolio { id, bidder, commodity, bids, constraints: self.constraints }
    }
}

#[derive(Debug)]
pub struct RegisteredBidPortfolio<T: Resource> {
    pub id:          PortfolioId,
    pub bidder:      AgentId,
    pub commodity:   String,
    pub bids:        Vec<Arc<Bid<T>>>,
    pub constraints: Vec<CapacityConstraint<T>>,
}
