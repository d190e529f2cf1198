//! Resolved trades and the transaction records they leave behind.

use std::sync::Arc;

use fc_core::{AgentId, ResourceId, Tick, TransactionId};
use fc_resource::{Resource, ResourceKind};

use crate::bid::Bid;
use crate::request::Request;

/// A matched `(request, bid, quantity)` triple.
#[derive(Clone, Debug)]
pub struct Trade<T: Resource> {
    pub request:    Arc<Request<T>>,
    pub bid:        Arc<Bid<T>>,
    pub amt:        f64,
    /// Preference of the arc after adjustment.
    pub preference: f64,
}

impl<T: Resource> Trade<T> {
    #[inline]
    pub fn supplier(&self) -> AgentId {
        self.bid.bidder()
    }

    #[inline]
    pub fn requester(&self) -> AgentId {
        self.request.requester()
    }

    #[inline]
    pub fn commodity(&self) -> &str {
        self.request.commodity()
    }
}

/// One executed trade, as written to the `Transactions` table.
#[derive(Clone, Debug, PartialEq)]
pub struct TradeRecord {
    pub id:         TransactionId,
    pub kind:       ResourceKind,
    pub sender:     AgentId,
    pub receiver:   AgentId,
    pub resource:   ResourceId,
    pub commodity:  String,
    pub quantity:   f64,
    pub preference: f64,
    pub time:       Tick,
}
