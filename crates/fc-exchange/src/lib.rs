//! `fc-exchange`: the dynamic resource exchange.
//!
//! Each time step, agents declare what they want (request portfolios) and
//! what they could supply against those wants (bid portfolios).  The exchange
//! turns them into a feasible, preference-maximising set of trades and moves
//! the resources.
//!
//! | Module         | Contents                                                     |
//! |----------------|--------------------------------------------------------------|
//! | [`request`]    | `Request`, `RequestPortfolio`                                |
//! | [`bid`]        | `Bid`, `BidPortfolio`                                        |
//! | [`constraint`] | `CapacityConstraint`, `Converter`, `CANNOT_SUPPLY`           |
//! | [`trade`]      | `Trade`, `TradeRecord`                                       |
//! | [`trader`]     | `Trader` capability, `TraderRegistry`, `ArcPref`             |
//! | [`context`]    | `ExchangeContext` (per-pass state)                           |
//! | [`graph`]      | `ExchangeGraph` and its verification                         |
//! | [`translator`] | portfolios → graph → trades                                  |
//! | [`partition`]  | commodity partitioning (union-find)                          |
//! | [`solver`]     | `Solver` trait, `GreedySolver`, `OptimizeSolver` (feature)   |
//! | [`executor`]   | `TradeExecutor` (verify, fulfil, deliver)                    |
//! | [`manager`]    | `ExchangeManager` (one full pass)                            |
//!
//! The crate is generic over `fc_resource::Resource`; materials and products
//! run as two independent exchanges with separate managers.

pub mod bid;
pub mod constraint;
pub mod context;
pub mod executor;
pub mod graph;
pub mod manager;
pub mod partition;
pub mod request;
pub mod solver;
pub mod trade;
pub mod trader;
pub mod translator;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use bid::{Bid, BidPortfolio};
pub use constraint::{CapacityConstraint, CoeffConverter, Converter, FnConverter, QtyConverter, CANNOT_SUPPLY};
pub use context::ExchangeContext;
pub use executor::TradeExecutor;
pub use graph::{ExchangeArc, ExchangeGraph, ExchangeNode, Match, NodeGroup};
pub use manager::ExchangeManager;
pub use partition::Partition;
pub use request::{Request, RequestPortfolio};
pub use solver::{make_solver, GreedySolver, Solver};
#[cfg(feature = "optimize")]
pub use solver::OptimizeSolver;
pub use trade::{Trade, TradeRecord};
pub use trader::{ArcPref, CommodityRequests, Trader, TraderCtx, TraderRegistry};
