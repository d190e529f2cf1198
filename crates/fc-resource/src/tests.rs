//! Unit tests for fc-resource.

#[cfg(test)]
mod helpers {
    use std::sync::Arc;

    use fc_core::IdCounters;

    use crate::{CompMap, Composition, Material};

    pub fn uox() -> Arc<Composition> {
        let mut m = CompMap::new();
        m.insert(922350000, 4.0);
        m.insert(922380000, 96.0);
        Composition::from_mass(m).unwrap()
    }

    pub fn pu() -> Arc<Composition> {
        let mut m = CompMap::new();
        m.insert(942390000, 1.0);
        Composition::from_mass(m).unwrap()
    }

    pub fn mat(ids: &IdCounters, qty: f64) -> Material {
        Material::create(ids, qty, uox()).unwrap()
    }
}

#[cfg(test)]
mod composition {
    use super::helpers::*;
    use crate::{CompMap, Composition};
    use fc_core::FcError;

    #[test]
    fn normalises_to_fractions() {
        let c = uox();
        assert!((c.fraction(922350000) - 0.04).abs() < 1e-12);
        assert!((c.fraction(922380000) - 0.96).abs() < 1e-12);
        assert_eq!(c.fraction(10010000), 0.0);
    }

    #[test]
    fn negative_mass_is_value_error() {
        let mut m = CompMap::new();
        m.insert(922350000, -1.0);
        assert!(matches!(Composition::from_mass(m), Err(FcError::Value(_))));
        assert!(Composition::from_mass(CompMap::new()).is_err());
    }

    #[test]
    fn mix_is_mass_weighted() {
        let c = Composition::mix(&uox(), 50.0, &pu(), 50.0).unwrap();
        assert!((c.fraction(942390000) - 0.5).abs() < 1e-12);
        assert!((c.fraction(922350000) - 0.02).abs() < 1e-12);
    }
}

#[cfg(test)]
mod material {
    use std::sync::Arc;

    use super::helpers::*;
    use crate::{Material, Product, Resource};
    use fc_core::{FcError, IdCounters};

    #[test]
    fn extract_splits_with_fresh_id() {
        let ids = IdCounters::new();
        let mut m = mat(&ids, 10.0);
        let part = m.extract_qty(4.0, &ids).unwrap();
        assert_eq!(part.quantity(), 4.0);
        assert_eq!(m.quantity(), 6.0);
        assert_ne!(part.id(), m.id());
        assert!(Arc::ptr_eq(part.comp(), m.comp()));
    }

    #[test]
    fn over_extract_is_value_error() {
        let ids = IdCounters::new();
        let mut m = mat(&ids, 1.0);
        assert!(matches!(m.extract_qty(2.0, &ids), Err(FcError::Value(_))));
        assert_eq!(m.quantity(), 1.0);
    }

    #[test]
    fn absorb_mixes_composition() {
        let ids = IdCounters::new();
        let mut a = mat(&ids, 50.0);
        let b = Material::create(&ids, 50.0, pu()).unwrap();
        a.absorb(b).unwrap();
        assert_eq!(a.quantity(), 100.0);
        assert!((a.comp().fraction(942390000) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn transmute_keeps_quantity() {
        let ids = IdCounters::new();
        let mut a = mat(&ids, 3.0);
        a.transmute(pu());
        assert_eq!(a.quantity(), 3.0);
        assert_eq!(a.comp().fraction(942390000), 1.0);
    }

    #[test]
    fn untracked_copy_has_invalid_id() {
        let ids = IdCounters::new();
        let a = mat(&ids, 3.0);
        let d = a.untracked();
        assert!(a.is_tracked());
        assert!(!d.is_tracked());
        assert_eq!(d.quantity(), 3.0);
    }

    #[test]
    fn product_absorb_requires_same_quality() {
        let ids = IdCounters::new();
        let mut p = Product::create(&ids, 2.0, "power").unwrap();
        p.absorb(Product::create(&ids, 1.0, "power").unwrap()).unwrap();
        assert_eq!(p.quantity(), 3.0);
        let other = Product::create(&ids, 1.0, "steam").unwrap();
        assert!(matches!(p.absorb(other), Err(FcError::Value(_))));
    }
}

#[cfg(test)]
mod buf {
    use super::helpers::*;
    use crate::{Material, PopOrder, Resource, ResourceBuf};
    use fc_core::{FcError, IdCounters, SimRng};

    #[test]
    fn starts_unbounded_and_empty() {
        let b: ResourceBuf<Material> = ResourceBuf::new();
        assert_eq!(b.capacity(), f64::INFINITY);
        assert_eq!(b.quantity(), 0.0);
        assert!(b.is_empty());
        assert!(b.peek().is_err());
    }

    #[test]
    fn push_over_capacity_fails_untouched() {
        let ids = IdCounters::new();
        let mut b = ResourceBuf::with_capacity(10.0);
        b.push(mat(&ids, 6.0)).unwrap();
        let err = b.push(mat(&ids, 5.0)).unwrap_err();
        assert!(matches!(err, FcError::Capacity { .. }));
        assert_eq!(b.count(), 1);
        assert_eq!(b.quantity(), 6.0);
        assert!((b.space() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn push_within_eps_of_capacity_is_allowed() {
        let ids = IdCounters::new();
        let mut b = ResourceBuf::with_capacity(10.0);
        b.push(mat(&ids, 10.0 + 1e-9)).unwrap();
        assert_eq!(b.space(), 0.0);
    }

    #[test]
    fn duplicate_push_is_key_error() {
        let ids = IdCounters::new();
        let mut b = ResourceBuf::new();
        let m = mat(&ids, 1.0);
        b.push(m.clone()).unwrap();
        assert!(matches!(b.push(m), Err(FcError::Key(_))));
    }

    #[test]
    fn push_all_is_all_or_nothing() {
        let ids = IdCounters::new();
        let mut b = ResourceBuf::with_capacity(5.0);
        let err = b.push_all(vec![mat(&ids, 3.0), mat(&ids, 3.0)]).unwrap_err();
        assert!(matches!(err, FcError::Capacity { .. }));
        assert!(b.is_empty());

        let m = mat(&ids, 1.0);
        assert!(b.push_all(vec![m.clone(), m]).is_err());
        assert!(b.is_empty());

        b.push_all(vec![mat(&ids, 2.0), mat(&ids, 3.0)]).unwrap();
        assert_eq!(b.count(), 2);
        assert_eq!(b.quantity(), 5.0);
    }

    #[test]
    fn fifo_and_lifo_order() {
        let ids = IdCounters::new();
        let first = mat(&ids, 1.0);
        let second = mat(&ids, 2.0);

        let mut fifo = ResourceBuf::new();
        fifo.push_all(vec![first.clone(), second.clone()]).unwrap();
        assert_eq!(fifo.peek().unwrap().id(), first.id());
        assert_eq!(fifo.pop().unwrap().id(), first.id());

        let mut lifo = ResourceBuf::new().with_order(PopOrder::Lifo);
        lifo.push_all(vec![first.clone(), second.clone()]).unwrap();
        assert_eq!(lifo.peek().unwrap().id(), second.id());
        assert_eq!(lifo.pop().unwrap().id(), second.id());
    }

    #[test]
    fn pop_back_takes_newest() {
        let ids = IdCounters::new();
        let mut b = ResourceBuf::new();
        let first = mat(&ids, 1.0);
        let second = mat(&ids, 2.0);
        b.push_all(vec![first, second.clone()]).unwrap();
        assert_eq!(b.pop_back().unwrap().id(), second.id());
        assert_eq!(b.quantity(), 1.0);
    }

    #[test]
    fn pop_n_bounds() {
        let ids = IdCounters::new();
        let mut b = ResourceBuf::new();
        b.push_all(vec![mat(&ids, 1.0), mat(&ids, 2.0)]).unwrap();
        assert!(matches!(b.pop_n(3), Err(FcError::Value(_))));
        assert_eq!(b.pop_n(2).unwrap().len(), 2);
        assert!(b.is_empty());
    }

    #[test]
    fn pop_qty_splits_last_object() {
        let ids = IdCounters::new();
        let mut b = ResourceBuf::new();
        let a = mat(&ids, 5.0);
        let c = mat(&ids, 5.0);
        let c_id = c.id();
        b.push_all(vec![a, c]).unwrap();

        let out = b.pop_qty(7.0, &ids).unwrap();
        assert_eq!(out.len(), 2);
        assert!((out[1].quantity() - 2.0).abs() < 1e-12);
        assert_eq!(b.count(), 1);
        assert!((b.quantity() - 3.0).abs() < 1e-12);
        // The remainder keeps its identity and can still be popped.
        assert_eq!(b.peek().unwrap().id(), c_id);
        assert!(b.pop_qty(10.0, &ids).is_err());
    }

    #[test]
    fn pop_qty_eps_takes_everything_when_close() {
        let ids = IdCounters::new();
        let mut b = ResourceBuf::new();
        b.push(mat(&ids, 10.0)).unwrap();
        let out = b.pop_qty_eps(10.0 - 1e-9, 1e-6, &ids).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].quantity(), 10.0);
        assert!(b.is_empty());
    }

    #[test]
    fn set_capacity_below_quantity_fails() {
        let ids = IdCounters::new();
        let mut b = ResourceBuf::new();
        b.push(mat(&ids, 4.0)).unwrap();
        assert!(matches!(b.set_capacity(3.0), Err(FcError::Value(_))));
        b.set_capacity(4.0).unwrap();
        assert_eq!(b.space(), 0.0);
    }

    #[test]
    fn round_trip_restores_quantity() {
        let ids = IdCounters::new();
        let mut b = ResourceBuf::with_capacity(100.0);
        b.push_all(vec![mat(&ids, 1.5), mat(&ids, 2.25)]).unwrap();
        let before = b.quantity();
        b.push(mat(&ids, 3.0)).unwrap();
        let all = b.pop_n(b.count()).unwrap();
        b.push_all(all).unwrap();
        assert!((b.quantity() - (before + 3.0)).abs() < 1e-9);
        assert_eq!(b.count(), 3);
    }

    #[test]
    fn quantity_never_exceeds_capacity() {
        let ids = IdCounters::new();
        let mut rng = SimRng::new(3);
        let mut b = ResourceBuf::with_capacity(25.0);
        for _ in 0..500 {
            if rng.random_01() < 0.6 {
                let _ = b.push(mat(&ids, rng.uniform_real(0.1, 8.0)));
            } else if !b.is_empty() {
                let q = rng.uniform_real(0.0, b.quantity());
                b.pop_qty(q, &ids).unwrap();
            }
            assert!(b.quantity() <= b.capacity() + 1e-6);
            assert!(b.quantity() >= 0.0);
        }
    }
}
