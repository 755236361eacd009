//! Demand accounting.
//!
//! Demand is cumulative and additive: every `request(n)` adds `n` to what the
//! consumer permits the source to deliver. [`Demand::UNBOUNDED`] is a
//! saturating terminal value; once reached, further additions keep it there.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};

/// A positive demand count.
///
/// Zero demand is not representable: [`Demand::new`] rejects it with
/// [`ErrorKind::IllegalDemand`](crate::error::ErrorKind::IllegalDemand).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Demand(u64);

impl Demand {
    /// Unlimited demand.
    pub const UNBOUNDED: Self = Self(u64::MAX);

    /// Demand for a single item.
    pub const ONE: Self = Self(1);

    /// Creates a demand of `n` items, failing when `n` is zero.
    pub fn new(n: u64) -> Result<Self> {
        if n == 0 {
            return Err(Error::illegal_demand(n));
        }
        Ok(Self(n))
    }

    /// Returns the raw count.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns true if this is unlimited demand.
    #[must_use]
    pub const fn is_unbounded(self) -> bool {
        self.0 == u64::MAX
    }

    /// Adds two demands, saturating at [`Demand::UNBOUNDED`].
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(add_cap(self.0, other.0))
    }
}

impl TryFrom<u64> for Demand {
    type Error = Error;

    fn try_from(n: u64) -> Result<Self> {
        Self::new(n)
    }
}

impl From<Demand> for u64 {
    fn from(d: Demand) -> Self {
        d.0
    }
}

impl fmt::Display for Demand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            write!(f, "unbounded")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Adds two raw demand counts, saturating at `u64::MAX`.
#[must_use]
pub const fn add_cap(a: u64, b: u64) -> u64 {
    a.saturating_add(b)
}

/// An atomic demand accumulator.
///
/// Accumulates demand with saturating addition and hands the whole
/// accumulated amount over in one step with [`take`](Self::take).
#[derive(Debug, Default)]
pub struct DemandCounter {
    requested: AtomicU64,
}

impl DemandCounter {
    /// Creates an empty counter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            requested: AtomicU64::new(0),
        }
    }

    /// Adds `n` and returns the previous value.
    pub fn add(&self, n: Demand) -> u64 {
        let mut current = self.requested.load(Ordering::Acquire);
        loop {
            if current == u64::MAX {
                return current;
            }
            let next = add_cap(current, n.get());
            match self.requested.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return current,
                Err(actual) => current = actual,
            }
        }
    }

    /// Takes the accumulated demand, leaving zero behind.
    pub fn take(&self) -> Option<Demand> {
        match self.requested.swap(0, Ordering::AcqRel) {
            0 => None,
            n => Some(Demand(n)),
        }
    }

    /// Consumes `n` delivered items from the counter, unless unbounded.
    ///
    /// Returns the remaining demand.
    pub fn produced(&self, n: u64) -> u64 {
        let mut current = self.requested.load(Ordering::Acquire);
        loop {
            if current == u64::MAX {
                return current;
            }
            let next = current.saturating_sub(n);
            match self.requested.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    /// Returns the current accumulated demand.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.requested.load(Ordering::Acquire)
    }
}
