//! Split one exchange pass into independently solvable commodity partitions.
//!
//! Commodities are joined when a single request portfolio spans them (its
//! constraints couple the matching on both).  Bid portfolios are always
//! single-commodity.  Partitions are returned ordered by their smallest
//! commodity name so downstream merging is deterministic.

use std::collections::BTreeMap;

use fc_resource::Resource;

use crate::context::ExchangeContext;

/// The portfolios that must be solved together.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Partition {
    pub commodities:        Vec<String>,
    pub request_portfolios: Vec<usize>,
    pub bid_portfolios:     Vec<usize>,
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Smaller index wins so roots follow commodity name order.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

pub fn partition<T: Resource>(ctx: &ExchangeContext<T>) -> Vec<Partition> {
    let index: BTreeMap<&str, usize> = ctx
        .requests_by_commodity()
        .keys()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();
    let names: Vec<&str> = index.keys().copied().collect();
    let mut uf = UnionFind::new(names.len());

    for rp in ctx.request_portfolios() {
        let mut commods = rp.requests.iter().filter_map(|r| index.get(r.commodity()).copied());
        if let Some(first) = commods.next() {
            for other in commods {
                uf.union(first, other);
            }
        }
    }

    let mut by_root: BTreeMap<usize, Partition> = BTreeMap::new();
    for (i, name) in names.iter().enumerate() {
        let root = uf.find(i);
        by_root.entry(root).or_default().commodities.push((*name).to_owned());
    }
    for (pi, rp) in ctx.request_portfolios().iter().enumerate() {
        if let Some(&c) = rp.requests.first().and_then(|r| index.get(r.commodity())) {
            let root = uf.find(c);
            by_root.entry(root).or_default().request_portfolios.push(pi);
        }
    }
    for (pi, bp) in ctx.bid_portfolios().iter().enumerate() {
        if let Some(&c) = index.get(bp.commodity.as_str()) {
            let root = uf.find(c);
            by_root.entry(root).or_default().bid_portfolios.push(pi);
        }
    }
    by_root.into_values().collect()
}
