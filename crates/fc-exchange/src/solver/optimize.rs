//! Mixed-integer formulation solved by HiGHS through `good_lp`.
//!
//! # Formulation
//!
//! ```text
//!   maximise   Σ_a (1 + pref_a) · x_a
//!
//!   x_a ∈ [0, min(qty_u, qty_v)]             flow on arc a
//!   y_a ∈ {0, 1}, x_a = excl_a · y_a          exclusive arcs
//!   z_g ∈ {0, 1}, Σ_{a∈u} x_a = qty_u · z_g   every member u of mutual group g
//!
//!   Σ_{a∈n} x_a ≤ qty_n                       every node
//!   Σ_{a∈n} y_a ≤ 1                           every exclusive node
//!   Σ_{a∈G} x_a ≤ qty_G                       every request group
//!   Σ_{a∈G} unit_a,i · x_a ≤ cap_G,i          every finite group constraint
//! ```
//!
//! The solve is bounded by a wall-clock limit.  Any solver error, and any
//! returned solution that fails `ExchangeGraph::verify`, falls back to the
//! greedy solver for this graph.

use good_lp::solvers::highs::highs;
use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel, Variable};
use tracing::{debug, warn};

use fc_core::FcResult;

use crate::graph::ExchangeGraph;

use super::{GreedySolver, Solver};

#[derive(Clone, Debug)]
pub struct OptimizeSolver {
    eps:             f64,
    time_limit_secs: f64,
    fallback:        GreedySolver,
}

impl OptimizeSolver {
    pub fn new(eps: f64, time_limit_secs: f64) -> Self {
        Self { eps, time_limit_secs, fallback: GreedySolver::new(eps) }
    }

    fn sum(vars: impl Iterator<Item = Expression>) -> Expression {
        vars.sum()
    }

    fn solve_milp(&self, g: &mut ExchangeGraph) -> Result<f64, String> {
        if g.arcs.is_empty() {
            return Ok(0.0);
        }

        let mut vars = variables!();
        let mut x: Vec<Variable> = Vec::with_capacity(g.arcs.len());
        let mut y: Vec<Option<Variable>> = Vec::with_capacity(g.arcs.len());
        for a in &g.arcs {
            let ub = g.request_nodes[a.unode].qty.min(g.supply_nodes[a.vnode].qty).max(0.0);
            x.push(vars.add(variable().min(0.0).max(ub)));
            y.push(a.exclusive.then(|| vars.add(variable().binary())));
        }
        let z: Vec<Variable> = g.mutual_groups.iter().map(|_| vars.add(variable().binary())).collect();

        let objective = Self::sum(g.arcs.iter().zip(&x).map(|(a, &xv)| (1.0 + a.pref) * xv));
        let mut model = vars
            .maximise(objective)
            .using(highs)
            .set_verbose(false)
            .set_time_limit(self.time_limit_secs);

        // Exclusive arcs carry their exclusive value or nothing.
        for (ai, a) in g.arcs.iter().enumerate() {
            if let Some(yv) = y[ai] {
                let excl = a.excl_val;
                model = model.with(constraint!(x[ai] - excl * yv == 0.0));
            }
        }

        let mut u_arcs: Vec<Vec<usize>> = vec![Vec::new(); g.request_nodes.len()];
        let mut v_arcs: Vec<Vec<usize>> = vec![Vec::new(); g.supply_nodes.len()];
        for (ai, a) in g.arcs.iter().enumerate() {
            u_arcs[a.unode].push(ai);
            v_arcs[a.vnode].push(ai);
        }

        for (nodes, arcs_of) in [(&g.request_nodes, &u_arcs), (&g.supply_nodes, &v_arcs)] {
            for (n, node) in nodes.iter().enumerate() {
                let arcs = &arcs_of[n];
                if arcs.is_empty() {
                    continue;
                }
                let flow = Self::sum(arcs.iter().map(|&ai| Expression::from(x[ai])));
                model = model.with(constraint!(flow <= node.qty));
                if node.exclusive {
                    let picks = Self::sum(arcs.iter().filter_map(|&ai| y[ai]).map(Expression::from));
                    model = model.with(constraint!(picks <= 1.0));
                }
            }
        }

        for (gi, grp) in g.request_groups.iter().enumerate() {
            let arcs: Vec<usize> = grp.nodes.iter().flat_map(|&n| u_arcs[n].iter().copied()).collect();
            if arcs.is_empty() {
                continue;
            }
            if grp.qty.is_finite() {
                let flow = Self::sum(arcs.iter().map(|&ai| Expression::from(x[ai])));
                model = model.with(constraint!(flow <= grp.qty));
            }
            for (i, &cap) in grp.capacities.iter().enumerate().filter(|(_, c)| c.is_finite()) {
                let used = Self::sum(arcs.iter().map(|&ai| g.arcs[ai].u_unit[i] * x[ai]));
                model = model.with(constraint!(used <= cap));
            }
            debug!(group = gi, arcs = arcs.len(), "request group constraints added");
        }

        for grp in &g.supply_groups {
            let arcs: Vec<usize> = grp.nodes.iter().flat_map(|&n| v_arcs[n].iter().copied()).collect();
            if arcs.is_empty() {
                continue;
            }
            for (i, &cap) in grp.capacities.iter().enumerate().filter(|(_, c)| c.is_finite()) {
                let used = Self::sum(arcs.iter().map(|&ai| g.arcs[ai].v_unit[i] * x[ai]));
                model = model.with(constraint!(used <= cap));
            }
        }

        for (gi, members) in g.mutual_groups.iter().enumerate() {
            let zv = z[gi];
            for &n in members {
                let qty = g.request_nodes[n].qty;
                let flow = Self::sum(u_arcs[n].iter().map(|&ai| Expression::from(x[ai])));
                model = model.with(constraint!(flow - qty * zv == 0.0));
            }
        }

        let solution = model.solve().map_err(|e| e.to_string())?;

        g.clear_matches();
        let mut objective = 0.0;
        for ai in 0..g.arcs.len() {
            let qty = match y[ai] {
                Some(yv) if solution.value(yv) > 0.5 => g.arcs[ai].excl_val,
                Some(_) => 0.0,
                None => solution.value(x[ai]),
            };
            if qty > self.eps {
                objective += qty * (1.0 + g.arcs[ai].pref);
                g.add_match(ai, qty);
            }
        }
        Ok(objective)
    }
}

impl Solver for OptimizeSolver {
    fn name(&self) -> &'static str {
        "optimize"
    }

    fn solve(&self, g: &mut ExchangeGraph) -> FcResult<f64> {
        let outcome = self.solve_milp(g).and_then(|obj| g.verify(self.eps).map(|()| obj));
        match outcome {
            Ok(obj) => {
                debug!(matches = g.matches().len(), objective = obj, "optimize solve complete");
                Ok(obj)
            }
            Err(reason) => {
                warn!(%reason, "optimize solve failed; falling back to greedy");
                g.clear_matches();
                self.fallback.solve(g)
            }
        }
    }
}
