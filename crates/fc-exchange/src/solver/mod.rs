//! Exchange solvers.
//!
//! | Solver            | Availability        | Notes                                   |
//! |-------------------|---------------------|-----------------------------------------|
//! | [`GreedySolver`]   | always              | default; self-contained                 |
//! | `OptimizeSolver`  | `optimize` feature  | MILP via HiGHS; falls back to greedy    |

pub mod greedy;
#[cfg(feature = "optimize")]
pub mod optimize;

use fc_core::{FcResult, SolverConfig, SolverKind};

use crate::graph::ExchangeGraph;

pub use greedy::GreedySolver;
#[cfg(feature = "optimize")]
pub use optimize::OptimizeSolver;

/// Computes matches on an `ExchangeGraph`.
///
/// Implementations write their result with `ExchangeGraph::add_match` and
/// return the objective value.  A solver must leave the graph with a feasible
/// match set; `ExchangeGraph::verify` is the reference check.
pub trait Solver: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, graph: &mut ExchangeGraph) -> FcResult<f64>;
}

/// Build the solver selected by `config`.
pub fn make_solver(config: &SolverConfig, eps: f64) -> Box<dyn Solver> {
    match config.kind {
        SolverKind::Greedy => Box::new(GreedySolver::new(eps)),
        #[cfg(feature = "optimize")]
        SolverKind::Optimize => Box::new(OptimizeSolver::new(eps, config.time_limit_secs)),
        #[cfg(not(feature = "optimize"))]
        SolverKind::Optimize => {
            tracing::warn!("optimize solver not compiled in (enable the `optimize` feature); using greedy");
            Box::new(GreedySolver::new(eps))
        }
    }
}
