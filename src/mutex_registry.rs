//! Named per-output-family mutexes.
//!
//! `BlockFile` serializes writes to one shared stream through the mutex it
//! already wraps around that stream; nothing else is needed there. The
//! ordered emitter (C10) and the distribution recorder (C11), by contrast,
//! coordinate a critical section (a scan over several chromosomes, or a
//! shutdown write) that is logically one family-wide operation rather than
//! a single stream write, so they share one named lock apiece instead of
//! each allocating its own.

use std::sync::Mutex;

/// One of the output families that may need a coordinating lock beyond
/// what `BlockFile`'s own stream mutex provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    BedGraph,
    Density,
    Distribution,
}

/// A fixed set of named mutexes, one per [`Family`], initialized once at
/// startup. Acquiring the guard for a family that is never contended (e.g.
/// a single-threaded run) costs one uncontended lock, not a branch.
#[derive(Default)]
pub struct MutexRegistry {
    bedgraph: Mutex<()>,
    density: Mutex<()>,
    distribution: Mutex<()>,
}

impl MutexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the named family's mutex; the guard's lifetime is the
    /// critical section.
    pub fn lock(&self, family: Family) -> std::sync::MutexGuard<'_, ()> {
        let mutex = match family {
            Family::BedGraph => &self.bedgraph,
            Family::Density => &self.density,
            Family::Distribution => &self.distribution,
        };
        mutex.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_families_do_not_block_each_other() {
        let reg = MutexRegistry::new();
        let _g1 = reg.lock(Family::BedGraph);
        let _g2 = reg.lock(Family::Density);
    }
}
