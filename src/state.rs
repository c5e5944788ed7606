// src/state.rs
use crate::model::structure::ParsedCrystal;
use crate::physics::lattice::LatticeVectors;
use crate::physics::structure_factor::StructureFactors;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Version tag of the installed crystal. Results computed against an older
/// generation are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

/// Everything derived from one successful parse. Immutable once built.
#[derive(Debug)]
pub struct Crystal {
    pub source: String,
    pub parsed: ParsedCrystal,
    pub lattice: LatticeVectors,
    pub structure_factors: StructureFactors,
}

/// Read-only handle on the crystal a computation started from.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub generation: Generation,
    pub crystal: Arc<Crystal>,
}

#[derive(Debug, Default)]
pub struct Session {
    current: Option<Arc<Crystal>>,
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current crystal wholesale and bump the generation.
    pub fn install(&mut self, crystal: Crystal) -> Generation {
        self.generation += 1;
        self.current = Some(Arc::new(crystal));
        Generation(self.generation)
    }

    pub fn generation(&self) -> Generation {
        Generation(self.generation)
    }

    pub fn crystal(&self) -> Option<&Arc<Crystal>> {
        self.current.as_ref()
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.current.as_ref().map(|crystal| Snapshot {
            generation: self.generation(),
            crystal: Arc::clone(crystal),
        })
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.current.is_some() && generation == self.generation()
    }
}

/// Keeps only the most recent value and releases it once no newer value has
/// arrived for `interval`, or once the oldest unreleased push is `interval` old.
#[derive(Debug)]
pub struct Debouncer<T> {
    interval: Duration,
    pending: Option<Pending<T>>,
}

#[derive(Debug)]
struct Pending<T> {
    value: T,
    last: Instant,
    first: Instant,
}

impl<T> Debouncer<T> {
    pub fn new(interval: Duration) -> Self {
        Self { interval, pending: None }
    }

    pub fn push(&mut self, value: T, now: Instant) {
        let first = self.pending.as_ref().map_or(now, |p| p.first);
        self.pending = Some(Pending { value, last: now, first });
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = self.pending.as_ref().is_some_and(|p| {
            now.saturating_duration_since(p.last) >= self.interval
                || now.saturating_duration_since(p.first) >= self.interval
        });
        if due {
            self.flush()
        } else {
            None
        }
    }

    /// Release the pending value immediately.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }
}
