//! `ExchangeGraph`: the resource-agnostic bipartite matching problem.
//!
//! # Layout
//!
//! ```text
//!   request groups (one per RequestPortfolio)      supply groups (one per BidPortfolio)
//!   ┌──────────────────────┐                       ┌──────────────────────┐
//!   │ qty, capacities[i]   │                       │ capacities[j]        │
//!   │  u0  u1  u2 ...      │ ──── arcs (u, v) ──── │  v0  v1 ...          │
//!   └──────────────────────┘                       └──────────────────────┘
//! ```
//!
//! Every arc carries one unit capacity per constraint of each endpoint's
//! group: matching `q` on the arc consumes `q · unit[i]` of constraint `i`.
//! Nodes, groups and arcs are stored in flat `Vec`s and referred to by index.

/// A request (`u`) or bid (`v`) node.
#[derive(Clone, Debug)]
pub struct ExchangeNode {
    pub group:     usize,
    pub qty:       f64,
    pub exclusive: bool,
}

/// The nodes of one portfolio and its active constraint capacities.
#[derive(Clone, Debug)]
pub struct NodeGroup {
    /// Total the group may match.  `INFINITY` for supply groups.
    pub qty:        f64,
    pub capacities: Vec<f64>,
    pub nodes:      Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct ExchangeArc {
    pub unode:     usize,
    pub vnode:     usize,
    pub pref:      f64,
    /// Per-unit cost against each request-group constraint.
    pub u_unit:    Vec<f64>,
    /// Per-unit cost against each supply-group constraint.
    pub v_unit:    Vec<f64>,
    pub exclusive: bool,
    /// Quantity an exclusive arc must carry if it carries anything.
    pub excl_val:  f64,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Match {
    pub arc: usize,
    pub qty: f64,
}

#[derive(Clone, Debug, Default)]
pub struct ExchangeGraph {
    pub request_nodes:  Vec<ExchangeNode>,
    pub supply_nodes:   Vec<ExchangeNode>,
    pub request_groups: Vec<NodeGroup>,
    pub supply_groups:  Vec<NodeGroup>,
    pub arcs:           Vec<ExchangeArc>,
    /// All-or-nothing sets of request nodes.
    pub mutual_groups:  Vec<Vec<usize>>,
    /// Request node → indices of its arcs, in insertion order.
    pub node_arcs:      Vec<Vec<usize>>,
    matches:            Vec<Match>,
}

impl ExchangeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_request_group(&mut self, qty: f64, capacities: Vec<f64>) -> usize {
        self.request_groups.push(NodeGroup { qty, capacities, nodes: Vec::new() });
        self.request_groups.len() - 1
    }

    pub fn add_supply_group(&mut self, capacities: Vec<f64>) -> usize {
        self.supply_groups.push(NodeGroup { qty: f64::INFINITY, capacities, nodes: Vec::new() });
        self.supply_groups.len() - 1
    }

    pub fn add_request_node(&mut self, group: usize, qty: f64, exclusive: bool) -> usize {
        let idx = self.request_nodes.len();
        self.request_nodes.push(ExchangeNode { group, qty, exclusive });
        self.request_groups[group].nodes.push(idx);
        self.node_arcs.push(Vec::new());
        idx
    }

    pub fn add_supply_node(&mut self, group: usize, qty: f64, exclusive: bool) -> usize {
        let idx = self.supply_nodes.len();
        self.supply_nodes.push(ExchangeNode { group, qty, exclusive });
        self.supply_groups[group].nodes.push(idx);
        idx
    }

    pub fn add_arc(&mut self, arc: ExchangeArc) -> usize {
        let idx = self.arcs.len();
        self.node_arcs[arc.unode].push(idx);
        self.arcs.push(arc);
        idx
    }

    pub fn add_mutual_group(&mut self, nodes: Vec<usize>) {
        if nodes.len() > 1 {
            self.mutual_groups.push(nodes);
        }
    }

    pub fn add_match(&mut self, arc: usize, qty: f64) {
        self.matches.push(Match { arc, qty });
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn clear_matches(&mut self) {
        self.matches.clear();
    }

    pub(crate) fn truncate_matches(&mut self, len: usize) {
        self.matches.truncate(len);
    }

    /// Check the current matches against every node, group, exclusivity and
    /// mutual-group rule.  Returns a description of the first violation.
    pub fn verify(&self, eps: f64) -> Result<(), String> {
        let tol = |cap: f64| eps * (1.0 + cap.abs());
        let mut u_qty = vec![0.0; self.request_nodes.len()];
        let mut v_qty = vec![0.0; self.supply_nodes.len()];
        let mut u_arcs = vec![0usize; self.request_nodes.len()];
        let mut v_arcs = vec![0usize; self.supply_nodes.len()];
        let mut u_used: Vec<Vec<f64>> =
            self.request_groups.iter().map(|g| vec![0.0; g.capacities.len()]).collect();
        let mut v_used: Vec<Vec<f64>> =
            self.supply_groups.iter().map(|g| vec![0.0; g.capacities.len()]).collect();

        for m in &self.matches {
            let a = self.arcs.get(m.arc).ok_or_else(|| format!("match on unknown arc {}", m.arc))?;
            if !m.qty.is_finite() || m.qty < -eps {
                return Err(format!("arc {} matched invalid quantity {}", m.arc, m.qty));
            }
            if a.exclusive && m.qty > eps && (m.qty - a.excl_val).abs() > tol(a.excl_val) {
                return Err(format!(
                    "exclusive arc {} matched {} instead of {}",
                    m.arc, m.qty, a.excl_val
                ));
            }
            u_qty[a.unode] += m.qty;
            v_qty[a.vnode] += m.qty;
            if m.qty > eps {
                u_arcs[a.unode] += 1;
                v_arcs[a.vnode] += 1;
            }
            let ug = self.request_nodes[a.unode].group;
            for (used, unit) in u_used[ug].iter_mut().zip(&a.u_unit) {
                *used += unit * m.qty;
            }
            let vg = self.supply_nodes[a.vnode].group;
            for (used, unit) in v_used[vg].iter_mut().zip(&a.v_unit) {
                *used += unit * m.qty;
            }
        }

        for (i, n) in self.request_nodes.iter().enumerate() {
            if u_qty[i] > n.qty + tol(n.qty) {
                return Err(format!("request node {i} matched {} > {}", u_qty[i], n.qty));
            }
            if n.exclusive && u_arcs[i] > 1 {
                return Err(format!("exclusive request node {i} matched by {} bids", u_arcs[i]));
            }
        }
        for (i, n) in self.supply_nodes.iter().enumerate() {
            if v_qty[i] > n.qty + tol(n.qty) {
                return Err(format!("bid node {i} matched {} > {}", v_qty[i], n.qty));
            }
            if n.exclusive && v_arcs[i] > 1 {
                return Err(format!("exclusive bid node {i} split across {} requests", v_arcs[i]));
            }
        }
        for (gi, g) in self.request_groups.iter().enumerate() {
            let total: f64 = g.nodes.iter().map(|&n| u_qty[n]).sum();
            if total > g.qty + tol(g.qty) {
                return Err(format!("request group {gi} matched {total} > {}", g.qty));
            }
            check_caps("request", gi, &g.capacities, &u_used[gi], &tol)?;
        }
        for (gi, g) in self.supply_groups.iter().enumerate() {
            check_caps("supply", gi, &g.capacities, &v_used[gi], &tol)?;
        }
        for (gi, members) in self.mutual_groups.iter().enumerate() {
            let full = members
                .iter()
                .all(|&n| u_qty[n] >= self.request_nodes[n].qty - tol(self.request_nodes[n].qty));
            let empty = members.iter().all(|&n| u_qty[n] <= eps);
            if !(full || empty) {
                return Err(format!("mutual group {gi} partially matched"));
            }
        }
        Ok(())
    }
}

fn check_caps(
    side:  &str,
    group: usize,
    caps:  &[f64],
    used:  &[f64],
    tol:   &dyn Fn(f64) -> f64,
) -> Result<(), String> {
    for (i, (&cap, &u)) in caps.iter().zip(used).enumerate() {
        if cap.is_finite() && u > cap + tol(cap) {
            return Err(format!("{side} group {group} constraint {i}: {u} > capacity {cap}"));
        }
    }
    Ok(())
}
