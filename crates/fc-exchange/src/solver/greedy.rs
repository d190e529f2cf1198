//! Greedy matching heuristic.
//!
//! # Algorithm
//!
//! 1. Sort arcs by descending preference.  The sort is stable, so equal
//!    preferences keep graph insertion order (bid registration order) and
//!    results are reproducible run to run.
//! 2. Walk the sorted arcs.  Each arc takes the largest quantity allowed by
//!    both endpoints: node remainder, request-group remainder, and every
//!    group constraint's remaining capacity divided by the arc's unit cost.
//! 3. An exclusive arc carries exactly its exclusive value or nothing.
//! 4. The first arc reaching a member of a mutual group triggers an attempt
//!    to fill every member of that group in full.  Matches made during the
//!    attempt are kept only if all members end up full; otherwise state and
//!    matches are rolled back and the group stays empty.

use tracing::{debug, trace};

use fc_core::FcResult;

use crate::graph::ExchangeGraph;

use super::Solver;

#[derive(Clone, Debug)]
pub struct GreedySolver {
    eps: f64,
}

impl GreedySolver {
    pub fn new(eps: f64) -> Self {
        Self { eps }
    }
}

impl Default for GreedySolver {
    fn default() -> Self {
        Self::new(fc_core::EPS)
    }
}

/// Remaining capacities while matching.  Cloned to snapshot a mutual-group
/// attempt.
#[derive(Clone)]
struct State {
    u_caps:       Vec<Vec<f64>>,
    v_caps:       Vec<Vec<f64>>,
    u_group_left: Vec<f64>,
    u_left:       Vec<f64>,
    v_left:       Vec<f64>,
    objective:    f64,
}

impl State {
    fn new(g: &ExchangeGraph) -> Self {
        Self {
            u_caps:       g.request_groups.iter().map(|grp| grp.capacities.clone()).collect(),
            v_caps:       g.supply_groups.iter().map(|grp| grp.capacities.clone()).collect(),
            u_group_left: g.request_groups.iter().map(|grp| grp.qty).collect(),
            u_left:       g.request_nodes.iter().map(|n| n.qty).collect(),
            v_left:       g.supply_nodes.iter().map(|n| n.qty).collect(),
            objective:    0.0,
        }
    }
}

fn constrained(left: f64, caps: &[f64], units: &[f64]) -> f64 {
    caps.iter()
        .zip(units)
        .filter(|&(_, &u)| u > 0.0)
        .fold(left, |cap, (&c, &u)| cap.min(c / u))
}

impl GreedySolver {
    /// Largest quantity the arc can carry right now.
    fn arc_capacity(&self, g: &ExchangeGraph, s: &State, ai: usize) -> f64 {
        let a = &g.arcs[ai];
        let ug = g.request_nodes[a.unode].group;
        let vg = g.supply_nodes[a.vnode].group;
        let ucap = constrained(s.u_left[a.unode].min(s.u_group_left[ug]), &s.u_caps[ug], &a.u_unit);
        let vcap = constrained(s.v_left[a.vnode], &s.v_caps[vg], &a.v_unit);
        ucap.min(vcap).max(0.0)
    }

    /// Match as much as possible on one arc.  Returns the quantity matched.
    fn try_arc(&self, g: &mut ExchangeGraph, s: &mut State, ai: usize) -> f64 {
        let mut qty = self.arc_capacity(g, s, ai);
        let a = &g.arcs[ai];
        if a.exclusive {
            qty = if qty + self.eps >= a.excl_val { a.excl_val } else { 0.0 };
        }
        if qty <= self.eps {
            return 0.0;
        }

        let ug = g.request_nodes[a.unode].group;
        let vg = g.supply_nodes[a.vnode].group;
        s.u_left[a.unode] -= qty;
        s.v_left[a.vnode] -= qty;
        s.u_group_left[ug] -= qty;
        for (cap, unit) in s.u_caps[ug].iter_mut().zip(&a.u_unit) {
            *cap -= qty * unit;
        }
        for (cap, unit) in s.v_caps[vg].iter_mut().zip(&a.v_unit) {
            *cap -= qty * unit;
        }
        s.objective += qty * (1.0 + a.pref);
        trace!(arc = ai, qty, pref = a.pref, "greedy match");
        g.add_match(ai, qty);
        qty
    }

    /// Fill every member of mutual group `gi` or roll back to nothing.
    fn satisfy_group(&self, g: &mut ExchangeGraph, s: &mut State, gi: usize) {
        let snapshot = s.clone();
        let n_matches = g.matches().len();
        let members = g.mutual_groups[gi].clone();

        for &n in &members {
            let mut arcs = g.node_arcs[n].clone();
            arcs.sort_by(|&a, &b| g.arcs[b].pref.total_cmp(&g.arcs[a].pref));
            for ai in arcs {
                if s.u_left[n] <= self.eps {
                    break;
                }
                self.try_arc(g, s, ai);
            }
            let need = g.request_nodes[n].qty;
            if s.u_left[n] > self.eps * (1.0 + need) {
                debug!(group = gi, node = n, short = s.u_left[n], "mutual group unsatisfiable; rolled back");
                *s = snapshot;
                g.truncate_matches(n_matches);
                return;
            }
        }
        trace!(group = gi, members = members.len(), "mutual group committed");
    }
}

impl Solver for GreedySolver {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn solve(&self, g: &mut ExchangeGraph) -> FcResult<f64> {
        g.clear_matches();
        let mut s = State::new(g);

        let mut order: Vec<usize> = (0..g.arcs.len()).collect();
        order.sort_by(|&a, &b| g.arcs[b].pref.total_cmp(&g.arcs[a].pref));

        let mut node_group: Vec<Option<usize>> = vec![None; g.request_nodes.len()];
        for (gi, members) in g.mutual_groups.iter().enumerate() {
            for &n in members {
                node_group[n] = Some(gi);
            }
        }
        let mut group_done = vec![false; g.mutual_groups.len()];

        for ai in order {
            match node_group[g.arcs[ai].unode] {
                Some(gi) if !group_done[gi] => {
                    group_done[gi] = true;
                    self.satisfy_group(g, &mut s, gi);
                }
                Some(_) => {}
                None => {
                    self.try_arc(g, &mut s, ai);
                }
            }
        }

        debug!(arcs = g.arcs.len(), matches = g.matches().len(), objective = s.objective,
               "greedy solve complete");
        Ok(s.objective)
    }
}
