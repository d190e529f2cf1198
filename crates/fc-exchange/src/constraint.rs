//! Capacity constraints and the converters that weight them.
//!
//! A constraint bounds the total matched quantity of one portfolio:
//!
//!   Σ_arcs  convert(offer, request) / offer.quantity() · matched_qty  ≤  capacity
//!
//! With the default [`QtyConverter`] the unit cost is 1 and the constraint is
//! a plain bound on matched mass.

use std::fmt;
use std::sync::Arc;

use fc_resource::Resource;

use crate::request::Request;

/// Returned by a converter that cannot supply the pairing at any cost.
///
/// Any conversion at or above this value removes the arc from the graph.
pub const CANNOT_SUPPLY: f64 = f64::MAX;

/// Maps a candidate offer to its cost in constraint units.
pub trait Converter<T: Resource>: Send + Sync + fmt::Debug {
    /// Cost of the *whole* `offer` when matched against `request`.
    fn convert(&self, offer: &T, request: &Request<T>) -> f64;
}

/// Identity conversion: cost equals quantity.
#[derive(Copy, Clone, Debug, Default)]
pub struct QtyConverter;

impl<T: Resource> Converter<T> for QtyConverter {
    fn convert(&self, offer: &T, _request: &Request<T>) -> f64 {
        offer.quantity()
    }
}

/// Per-request coefficients, indexed by the request's position in its
/// portfolio.  Backs `RequestPortfolio::add_default_constraint`.
#[derive(Clone, Debug)]
pub struct CoeffConverter {
    coeffs: Vec<f64>,
}

impl CoeffConverter {
    pub fn new(coeffs: Vec<f64>) -> Self {
        Self { coeffs }
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }
}

impl<T: Resource> Converter<T> for CoeffConverter {
    fn convert(&self, offer: &T, request: &Request<T>) -> f64 {
        let c = self.coeffs.get(request.index()).copied().unwrap_or(1.0);
        offer.quantity() * c
    }
}

/// Adapts a closure into a [`Converter`].
pub struct FnConverter<F>(pub F);

impl<F> fmt::Debug for FnConverter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnConverter")
    }
}

impl<T, F> Converter<T> for FnConverter<F>
where
    T: Resource,
    F: Fn(&T, &Request<T>) -> f64 + Send + Sync,
{
    fn convert(&self, offer: &T, request: &Request<T>) -> f64 {
        (self.0)(offer, request)
    }
}

// ── CapacityConstraint ────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct CapacityConstraint<T: Resource> {
    capacity:  f64,
    converter: Arc<dyn Converter<T>>,
}

impl<T: Resource> Clone for CapacityConstraint<T> {
    fn clone(&self) -> Self {
        Self { capacity: self.capacity, converter: Arc::clone(&self.converter) }
    }
}

impl<T: Resource> CapacityConstraint<T> {
    /// A plain quantity bound.
    pub fn new(capacity: f64) -> Self {
        Self { capacity, converter: Arc::new(QtyConverter) }
    }

    pub fn with_converter(capacity: f64, converter: Arc<dyn Converter<T>>) -> Self {
        Self { capacity, converter }
    }

    #[inline]
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// `false` for constraints that impose no limit: capacity ≤ 0 (skipped
    /// with a policy warning) or NaN.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.capacity > 0.0
    }

    #[inline]
    pub fn convert(&self, offer: &T, request: &Request<T>) -> f64 {
        self.converter.convert(offer, request)
    }
}
