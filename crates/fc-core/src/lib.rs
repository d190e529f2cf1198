//! `fc-core`: foundational types for the `rust_fc` fuel-cycle simulator.
//!
//! This crate is a dependency of every other `fc-*` crate.  It has no `fc-*`
//! dependencies and only a handful of external ones (`rand`, `thiserror`,
//! `serde`, `toml`).
//!
//! # What lives here
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`ids`]         | `AgentId`, `ResourceId`, `TransactionId`, `RequestId`, `BidId`, `PortfolioId`, `IdCounters` |
//! | [`time`]        | `Tick`, `SimClock`                                         |
//! | [`config`]      | `SimInfo`, `SolverConfig`, `SolverKind` (TOML loadable)    |
//! | [`tolerance`]   | `EPS`, `EPS_RSRC`, `Kahan` summation, comparison helpers   |
//! | [`rng`]         | `SimRng` (Context-owned, seeded)                           |
//! | [`error`]       | `FcError`, `FcResult`                                      |

pub mod config;
pub mod error;
pub mod ids;
pub mod rng;
pub mod time;
pub mod tolerance;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{SimInfo, SolverConfig, SolverKind};
pub use error::{FcError, FcResult};
pub use ids::{AgentId, BidId, IdCounters, PortfolioId, RequestId, ResourceId, TransactionId};
pub use rng::SimRng;
pub use time::{SimClock, Tick};
pub use tolerance::{EPS, EPS_RSRC};
