//! Floating-point tolerances and compensated summation.
//!
//! Resource quantities are `f64` and accumulate rounding error as material is
//! split and merged.  Every capacity comparison in the simulator goes through
//! these helpers so the tolerance is applied consistently.

/// Generic tolerance for solver arithmetic.
pub const EPS: f64 = 1e-6;

/// Tolerance on resource quantities (kg, units of product, ...).
pub const EPS_RSRC: f64 = 1e-6;

/// `true` if `x` is below `-eps`.
#[inline]
pub fn is_negative(x: f64, eps: f64) -> bool {
    x < -eps
}

/// `true` if `a` and `b` differ by at most `eps`.
#[inline]
pub fn almost_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

/// `true` if `x` is a usable quantity: finite and not below `-eps`.
#[inline]
pub fn is_valid_qty(x: f64, eps: f64) -> bool {
    x.is_finite() && !is_negative(x, eps)
}

/// Kahan–Babuška compensated summation.
///
/// ```
/// use fc_core::tolerance::Kahan;
///
/// let mut k = Kahan::default();
/// for _ in 0..10 {
///     k.add(0.1);
/// }
/// assert!((k.sum() - 1.0).abs() < 1e-15);
/// ```
#[derive(Copy, Clone, Debug, Default)]
pub struct Kahan {
    sum:  f64,
    comp: f64,
}

impl Kahan {
    #[inline]
    pub fn add(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.comp += (self.sum - t) + x;
        } else {
            self.comp += (x - t) + self.sum;
        }
        self.sum = t;
    }

    #[inline]
    pub fn sum(&self) -> f64 {
        self.sum + self.comp
    }
}

/// Compensated sum of an iterator of quantities.
pub fn kahan_sum<I: IntoIterator<Item = f64>>(xs: I) -> f64 {
    let mut k = Kahan::default();
    for x in xs {
        k.add(x);
    }
    k.sum()
}
