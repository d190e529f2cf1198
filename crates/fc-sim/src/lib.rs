//! `fc-sim`: the discrete-time scheduler of the rust_fc simulator.
//!
//! # Step loop
//!
//! ```text
//! for t in 0..info.duration:
//!   ① BuildPending        : instantiate prototypes queued for t
//!   ② Tick                : every TimeListener, ascending AgentId
//!   ③ Exchange            : material pass, then product pass
//!   ④ Tock                : every TimeListener, ascending AgentId
//!   ⑤ DecommissionPending : remove agents queued for t (or re-queue)
//! ```
//!
//! | Module        | Contents                                               |
//! |---------------|--------------------------------------------------------|
//! | [`agent`]     | `Agent`, `TimeListener` capability traits              |
//! | [`arena`]     | `AgentArena` (implements `TraderRegistry`)             |
//! | [`context`]   | `Context`, `AgentCtx`                                  |
//! | [`registry`]  | `PrototypeRegistry`, `RecipeRegistry`                  |
//! | [`scheduler`] | build and decommission queues, `kill_sim`              |
//! | [`sim`]       | `Sim`, `SimSummary`                                    |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                  |
//! |------------|---------------------------------------------------------|
//! | `parallel` | Solves exchange partitions on Rayon's thread pool.      |
//! | `optimize` | Compiles the MILP exchange solver.                      |

pub mod agent;
pub mod arena;
pub mod builder;
pub mod context;
pub mod error;
pub mod observer;
pub mod registry;
pub mod scheduler;
pub mod sim;

#[cfg(test)]
mod tests;

pub use agent::{Agent, TimeListener};
pub use arena::{AgentArena, AgentSlot};
pub use builder::SimBuilder;
pub use context::{AgentCtx, Context};
pub use error::{SimError, SimResult};
pub use observer::{NoopObserver, SimObserver};
pub use registry::{PrototypeRegistry, RecipeRegistry};
pub use scheduler::{BuildOrder, Scheduler};
pub use sim::{Sim, SimSummary};
