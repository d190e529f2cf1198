//! The `Resource` trait and its two concrete kinds.
//!
//! | Kind       | Quantity unit | Identity of "what"              |
//! |------------|---------------|---------------------------------|
//! | `Material` | kg            | shared `Arc<Composition>`       |
//! | `Product`  | units         | free-form quality tag (`String`) |
//!
//! Tracked resources carry a `ResourceId` drawn from the Context-owned
//! `IdCounters`.  Untracked copies (`Resource::untracked`) carry
//! `ResourceId::INVALID` and exist only as request targets and bid offers;
//! they never enter a `ResourceBuf` owned by an agent.

use std::fmt;
use std::sync::Arc;

use fc_core::tolerance::{is_negative, EPS_RSRC};
use fc_core::{FcError, FcResult, IdCounters, ResourceId};

use crate::composition::Composition;

/// Which exchange universe a resource type trades in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Material,
    Product,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Material => f.write_str("Material"),
            ResourceKind::Product => f.write_str("Product"),
        }
    }
}

/// Behaviour shared by every tradeable resource.
pub trait Resource: Clone + fmt::Debug + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn id(&self) -> ResourceId;

    fn quantity(&self) -> f64;

    fn units(&self) -> &'static str;

    /// Split `qty` off into a new tracked object with a fresh id.
    ///
    /// Fails with `Value` if `qty` is negative or exceeds the held quantity by
    /// more than `EPS_RSRC`.
    fn extract(&mut self, qty: f64, ids: &IdCounters) -> FcResult<Self>;

    /// Merge `other` into `self`.  `other` is consumed.
    fn absorb(&mut self, other: Self) -> FcResult<()>;

    /// A copy with `ResourceId::INVALID`, used to describe rather than hold.
    fn untracked(&self) -> Self;

    #[inline]
    fn is_tracked(&self) -> bool {
        self.id().is_valid()
    }
}

fn check_extract(held: f64, qty: f64) -> FcResult<()> {
    if !qty.is_finite() || is_negative(qty, EPS_RSRC) {
        return Err(FcError::Value(format!("cannot extract invalid quantity {qty}")));
    }
    if qty - held > EPS_RSRC {
        return Err(FcError::Value(format!(
            "extraction quantity {qty} larger than held quantity {held}"
        )));
    }
    Ok(())
}

// ── Material ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Material {
    id:   ResourceId,
    qty:  f64,
    comp: Arc<Composition>,
}

impl Material {
    /// Create a new tracked material.
    pub fn create(ids: &IdCounters, qty: f64, comp: Arc<Composition>) -> FcResult<Material> {
        if !qty.is_finite() || qty < 0.0 {
            return Err(FcError::Value(format!("material quantity must be non-negative, got {qty}")));
        }
        Ok(Material { id: ids.next_resource(), qty, comp })
    }

    /// An untracked descriptor of `qty` kg of `comp`.
    pub fn descriptor(qty: f64, comp: Arc<Composition>) -> Material {
        Material { id: ResourceId::INVALID, qty, comp }
    }

    pub fn comp(&self) -> &Arc<Composition> {
        &self.comp
    }

    /// Split `qty` kg off, keeping the same composition.
    pub fn extract_qty(&mut self, qty: f64, ids: &IdCounters) -> FcResult<Material> {
        check_extract(self.qty, qty)?;
        let qty = qty.min(self.qty);
        self.qty = (self.qty - qty).max(0.0);
        Ok(Material { id: ids.next_resource(), qty, comp: Arc::clone(&self.comp) })
    }

    /// Replace the composition without changing the quantity.
    pub fn transmute(&mut self, comp: Arc<Composition>) {
        self.comp = comp;
    }
}

impl Resource for Material {
    const KIND: ResourceKind = ResourceKind::Material;

    fn id(&self) -> ResourceId {
        self.id
    }

    fn quantity(&self) -> f64 {
        self.qty
    }

    fn units(&self) -> &'static str {
        "kg"
    }

    fn extract(&mut self, qty: f64, ids: &IdCounters) -> FcResult<Self> {
        self.extract_qty(qty, ids)
    }

    fn absorb(&mut self, other: Self) -> FcResult<()> {
        if other.qty <= 0.0 {
            return Ok(());
        }
        if self.qty <= 0.0 {
            self.comp = other.comp;
        } else if !Arc::ptr_eq(&self.comp, &other.comp) {
            self.comp = Composition::mix(&self.comp, self.qty, &other.comp, other.qty)?;
        }
        self.qty += other.qty;
        Ok(())
    }

    fn untracked(&self) -> Self {
        Material::descriptor(self.qty, Arc::clone(&self.comp))
    }
}

// ── Product ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Product {
    id:      ResourceId,
    qty:     f64,
    quality: String,
}

impl Product {
    pub fn create(ids: &IdCounters, qty: f64, quality: impl Into<String>) -> FcResult<Product> {
        if !qty.is_finite() || qty < 0.0 {
            return Err(FcError::Value(format!("product quantity must be non-negative, got {qty}")));
        }
        Ok(Product { id: ids.next_resource(), qty, quality: quality.into() })
    }

    pub fn descriptor(qty: f64, quality: impl Into<String>) -> Product {
        Product { id: ResourceId::INVALID, qty, quality: quality.into() }
    }

    pub fn quality(&self) -> &str {
        &self.quality
    }
}

impl Resource for Product {
    const KIND: ResourceKind = ResourceKind::Product;

    fn id(&self) -> ResourceId {
        self.id
    }

    fn quantity(&self) -> f64 {
        self.qty
    }

    fn units(&self) -> &'static str {
        "NONE"
    }

    fn extract(&mut self, qty: f64, ids: &IdCounters) -> FcResult<Self> {
        check_extract(self.qty, qty)?;
        let qty = qty.min(self.qty);
        self.qty = (self.qty - qty).max(0.0);
        Ok(Product { id: ids.next_resource(), qty, quality: self.quality.clone() })
    }

    fn absorb(&mut self, other: Self) -> FcResult<()> {
        if other.quality != self.quality {
            return Err(FcError::Value(format!(
                "cannot absorb product of quality '{}' into '{}'",
                other.quality, self.quality
            )));
        }
        self.qty += other.qty;
        Ok(())
    }

    fn untracked(&self) -> Self {
        Product::descriptor(self.qty, self.quality.clone())
    }
}
