//! `ResourceBuf`: an agent-owned, capacity-bounded, ordered resource store.
//!
//! # Contracts
//!
//! - `quantity() <= capacity() + EPS_RSRC` after every operation.  A push
//!   that would break this fails with `FcError::Capacity` and leaves the
//!   buffer untouched.
//! - A tracked resource id is present at most once (`FcError::Key`).
//! - Popping more than is held fails with `FcError::Value`.
//! - Quantity is a compensated (Kahan) sum of the held objects so repeated
//!   split/merge cycles do not drift.
//!
//! # Ordering
//!
//! Objects are kept in push order.  `PopOrder::Fifo` (the default) hands out
//! the oldest object first; `PopOrder::Lifo` the newest.  `pop_back` always
//! removes the most recently pushed object regardless of the configured
//! order.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use fc_core::tolerance::{kahan_sum, EPS_RSRC};
use fc_core::{FcError, FcResult, IdCounters, ResourceId};

use crate::resource::Resource;

/// Which end of the buffer `pop`, `peek` and the quantity pops draw from.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PopOrder {
    #[default]
    Fifo,
    Lifo,
}

#[derive(Clone, Debug)]
pub struct ResourceBuf<T: Resource> {
    items:    VecDeque<T>,
    present:  FxHashSet<ResourceId>,
    capacity: f64,
    qty:      f64,
    order:    PopOrder,
}

impl<T: Resource> Default for ResourceBuf<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> ResourceBuf<T> {
    /// An unbounded FIFO buffer.
    pub fn new() -> Self {
        Self {
            items:    VecDeque::new(),
            present:  FxHashSet::default(),
            capacity: f64::INFINITY,
            qty:      0.0,
            order:    PopOrder::Fifo,
        }
    }

    pub fn with_capacity(capacity: f64) -> Self {
        Self { capacity, ..Self::new() }
    }

    pub fn with_order(mut self, order: PopOrder) -> Self {
        self.order = order;
        self
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Change the capacity.  Fails if it would drop below the held quantity.
    pub fn set_capacity(&mut self, capacity: f64) -> FcResult<()> {
        if self.qty - capacity > EPS_RSRC {
            return Err(FcError::Value(format!(
                "new capacity {capacity} lower than existing quantity {}",
                self.qty
            )));
        }
        self.capacity = capacity;
        Ok(())
    }

    #[inline]
    pub fn quantity(&self) -> f64 {
        self.qty
    }

    /// Remaining room, never negative.
    #[inline]
    pub fn space(&self) -> f64 {
        (self.capacity - self.qty).max(0.0)
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn order(&self) -> PopOrder {
        self.order
    }

    /// Held objects in push order (oldest first).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// The object `pop` would return next, without removing it.
    pub fn peek(&self) -> FcResult<&T> {
        let next = match self.order {
            PopOrder::Fifo => self.items.front(),
            PopOrder::Lifo => self.items.back(),
        };
        next.ok_or_else(|| FcError::Value("cannot peek at resource from an empty buffer".into()))
    }

    // ── Push ──────────────────────────────────────────────────────────────

    pub fn push(&mut self, r: T) -> FcResult<()> {
        let space = self.space();
        if r.quantity() - space > EPS_RSRC {
            return Err(FcError::Capacity { qty: r.quantity(), space });
        }
        if r.is_tracked() && self.present.contains(&r.id()) {
            return Err(FcError::Key(format!("duplicate push of {}", r.id())));
        }
        if r.is_tracked() {
            self.present.insert(r.id());
        }
        self.items.push_back(r);
        self.update_qty();
        Ok(())
    }

    /// Push every resource or none of them.
    pub fn push_all(&mut self, rs: Vec<T>) -> FcResult<()> {
        let total = kahan_sum(rs.iter().map(|r| r.quantity()));
        let space = self.space();
        if total - space > EPS_RSRC {
            return Err(FcError::Capacity { qty: total, space });
        }
        let mut incoming = FxHashSet::default();
        for r in rs.iter().filter(|r| r.is_tracked()) {
            if self.present.contains(&r.id()) || !incoming.insert(r.id()) {
                return Err(FcError::Key(format!("duplicate push of {}", r.id())));
            }
        }
        self.present.extend(incoming);
        self.items.extend(rs);
        self.update_qty();
        Ok(())
    }

    // ── Pop ───────────────────────────────────────────────────────────────

    /// Remove and return the next object.
    pub fn pop(&mut self) -> FcResult<T> {
        let r = self
            .take_next()
            .ok_or_else(|| FcError::Value("cannot pop resource from an empty buffer".into()))?;
        self.update_qty();
        Ok(r)
    }

    /// Remove and return the most recently pushed object.
    pub fn pop_back(&mut self) -> FcResult<T> {
        let r = self
            .items
            .pop_back()
            .ok_or_else(|| FcError::Value("cannot pop resource from an empty buffer".into()))?;
        self.present.remove(&r.id());
        self.update_qty();
        Ok(r)
    }

    /// Remove exactly `n` objects, in pop order.
    pub fn pop_n(&mut self, n: usize) -> FcResult<Vec<T>> {
        if n > self.items.len() {
            return Err(FcError::Value(format!(
                "remove count {n} larger than buffer count {}",
                self.items.len()
            )));
        }
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            if let Some(r) = self.take_next() {
                out.push(r);
            }
        }
        self.update_qty();
        Ok(out)
    }

    /// Remove exactly `qty`, splitting the last object touched if needed.
    ///
    /// The split remainder keeps its place in the buffer; the extracted part
    /// gets a fresh id from `ids`.
    pub fn pop_qty(&mut self, qty: f64, ids: &IdCounters) -> FcResult<Vec<T>> {
        if qty - self.qty > EPS_RSRC {
            return Err(FcError::Value(format!(
                "removal quantity {qty} larger than buffer quantity {}",
                self.qty
            )));
        }
        let mut out = Vec::new();
        let mut left = qty;
        while left > EPS_RSRC {
            let Some(mut r) = self.take_next() else { break };
            let held = r.quantity();
            if held - left > EPS_RSRC {
                let part = r.extract(left, ids)?;
                self.put_back(r);
                out.push(part);
                left = 0.0;
            } else {
                out.push(r);
                left -= held;
            }
        }
        self.update_qty();
        Ok(out)
    }

    /// Like `pop_qty`, but tolerant: asking for anything within `eps` of the
    /// held quantity (or above it by at most `eps`) empties the buffer whole.
    pub fn pop_qty_eps(&mut self, qty: f64, eps: f64, ids: &IdCounters) -> FcResult<Vec<T>> {
        if qty > self.qty + eps {
            return Err(FcError::Value(format!(
                "removal quantity {qty} larger than buffer quantity {}",
                self.qty
            )));
        }
        if qty >= self.qty - eps {
            return self.pop_n(self.items.len());
        }
        self.pop_qty(qty, ids)
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn take_next(&mut self) -> Option<T> {
        let r = match self.order {
            PopOrder::Fifo => self.items.pop_front(),
            PopOrder::Lifo => self.items.pop_back(),
        }?;
        self.present.remove(&r.id());
        Some(r)
    }

    fn put_back(&mut self, r: T) {
        if r.is_tracked() {
            self.present.insert(r.id());
        }
        match self.order {
            PopOrder::Fifo => self.items.push_front(r),
            PopOrder::Lifo => self.items.push_back(r),
        }
    }

    fn update_qty(&mut self) {
        self.qty = kahan_sum(self.items.iter().map(|r| r.quantity()));
    }
}
