//! Strongly typed identifier wrappers and the Context-owned id counters.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.  Ordered maps keyed by these ids give
//! the deterministic iteration order the tick loop relies on.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID": the inner type's maximum.
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline(always)]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Identity of a live (or decommissioned) agent.  Never reused in a run.
    pub struct AgentId(u32);
}

typed_id! {
    /// Identity of a tracked resource object.  Untracked descriptors (request
    /// targets, bid offers) carry `ResourceId::INVALID`.
    pub struct ResourceId(u64);
}

typed_id! {
    /// Identity of one recorded trade.
    pub struct TransactionId(u64);
}

typed_id! {
    /// Index of a request within one exchange pass.  Assigned when its
    /// portfolio is registered with the exchange context.
    pub struct RequestId(u32);
}

typed_id! {
    /// Index of a bid within one exchange pass.
    pub struct BidId(u32);
}

typed_id! {
    /// Index of a request or bid portfolio within one exchange pass.
    pub struct PortfolioId(u32);
}

// ── IdCounters ────────────────────────────────────────────────────────────────

/// Monotonic id generators owned by the simulation `Context`.
///
/// Counters are atomics so a shared `&IdCounters` can hand out ids from inside
/// trader callbacks without a mutable borrow of the whole context.  Call
/// [`reset`](Self::reset) when starting a fresh run so ids are reproducible.
#[derive(Debug, Default)]
pub struct IdCounters {
    next_agent:       AtomicU32,
    next_resource:    AtomicU64,
    next_transaction: AtomicU64,
}

impl IdCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn next_agent(&self) -> AgentId {
        AgentId(self.next_agent.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn next_resource(&self) -> ResourceId {
        ResourceId(self.next_resource.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn next_transaction(&self) -> TransactionId {
        TransactionId(self.next_transaction.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of agents ever created in this run.
    pub fn agents_created(&self) -> u32 {
        self.next_agent.load(Ordering::Relaxed)
    }

    /// Restart every counter at zero.
    pub fn reset(&self) {
        self.next_agent.store(0, Ordering::Relaxed);
        self.next_resource.store(0, Ordering::Relaxed);
        self.next_transaction.store(0, Ordering::Relaxed);
    }
}
