//! Immutable material compositions.
//!
//! A `Composition` is a normalised map from nuclide id to mass fraction.  It
//! is created once, wrapped in an `Arc`, and shared by every material that
//! carries it; splitting a material never copies its composition.  Nuclide
//! physics (decay, atomic masses) is out of scope, so compositions are
//! treated as opaque, comparable, mixable values.

use std::collections::BTreeMap;
use std::sync::Arc;

use fc_core::{FcError, FcResult};
use fc_core::tolerance::kahan_sum;

/// Nuclide identifier in `ZZZAAAMMMM` form (e.g. `922350000` for U-235).
pub type Nuc = u32;

/// Nuclide → mass (or mass fraction).
pub type CompMap = BTreeMap<Nuc, f64>;

/// A normalised mass-fraction composition.
#[derive(Clone, Debug, PartialEq)]
pub struct Composition {
    mass: CompMap,
}

impl Composition {
    /// Build from un-normalised masses.
    ///
    /// Zero entries are dropped.  Negative, non-finite, or all-zero input is a
    /// `Value` error.
    pub fn from_mass(mass: CompMap) -> FcResult<Arc<Composition>> {
        if let Some((nuc, v)) = mass.iter().find(|(_, v)| !v.is_finite() || **v < 0.0) {
            return Err(FcError::Value(format!("nuclide {nuc} has invalid mass {v}")));
        }
        let total = kahan_sum(mass.values().copied());
        if !(total > 0.0) {
            return Err(FcError::Value("composition has zero total mass".into()));
        }
        let mass = mass
            .into_iter()
            .filter(|(_, v)| *v > 0.0)
            .map(|(n, v)| (n, v / total))
            .collect();
        Ok(Arc::new(Composition { mass }))
    }

    /// The empty composition, used by materials of zero quantity.
    pub fn vacuum() -> Arc<Composition> {
        Arc::new(Composition { mass: CompMap::new() })
    }

    /// Mass fractions, summing to 1 (or empty).
    pub fn mass(&self) -> &CompMap {
        &self.mass
    }

    /// Mass fraction of a single nuclide.
    pub fn fraction(&self, nuc: Nuc) -> f64 {
        self.mass.get(&nuc).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.mass.is_empty()
    }

    /// Mass-weighted mix of `qa` of `a` with `qb` of `b`.
    pub fn mix(a: &Composition, qa: f64, b: &Composition, qb: f64) -> FcResult<Arc<Composition>> {
        let mut out = CompMap::new();
        for (n, f) in &a.mass {
            *out.entry(*n).or_insert(0.0) += f * qa;
        }
        for (n, f) in &b.mass {
            *out.entry(*n).or_insert(0.0) += f * qb;
        }
        if out.values().all(|v| *v == 0.0) {
            return Ok(Composition::vacuum());
        }
        Composition::from_mass(out)
    }

    /// `true` if every nuclide fraction differs by at most `eps`.
    pub fn almost_eq(&self, other: &Composition, eps: f64) -> bool {
        self.mass
            .keys()
            .chain(other.mass.keys())
            .all(|n| (self.fraction(*n) - other.fraction(*n)).abs() <= eps)
    }
}
