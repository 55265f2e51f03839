//! Ordered emission protocol for per-chromosome accumulators (C10).
//!
//! Chromosomes finish on worker threads in arbitrary order, but bedgraph
//! and wiggle output must list them in canonical order. Each chromosome's
//! accumulator is held here until it, and every chromosome before it in
//! canonical order, has closed — mirroring the `closed`/`saved` scan in
//! the original `WigOutFile::CloseChromData`, which walks the map from its
//! first entry up to and including the chromosome just closed, stopping
//! at the first not-yet-closed predecessor.

use crate::genome::ChromId;
use crate::mutex_registry::{Family, MutexRegistry};

struct Slot<T> {
    data: Option<T>,
    closed: bool,
    saved: bool,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            data: None,
            closed: false,
            saved: false,
        }
    }
}

/// Holds one accumulator per chromosome (indexed by canonical [`ChromId`])
/// and releases them to a sink in canonical order as they close.
pub struct OrderedEmitter<T> {
    slots: Vec<Slot<T>>,
}

impl<T> OrderedEmitter<T> {
    /// `chrom_count` must match the number of chromosomes in the run's
    /// `ChromSizes` table, since slots are indexed directly by `ChromId`.
    pub fn new(chrom_count: usize) -> Self {
        let mut slots = Vec::with_capacity(chrom_count);
        slots.resize_with(chrom_count, Slot::default);
        Self { slots }
    }

    /// Installs the accumulator for a chromosome a worker just opened.
    pub fn open(&mut self, id: ChromId, data: T) {
        self.slots[id.0 as usize].data = Some(data);
    }

    /// Gives mutable access to an open chromosome's accumulator (for
    /// in-progress accumulation before it closes).
    pub fn get_mut(&mut self, id: ChromId) -> Option<&mut T> {
        self.slots[id.0 as usize].data.as_mut()
    }

    /// Marks `id` closed and, under the given family's mutex, drains every
    /// chromosome from the first entry up to and including `id` that is
    /// closed and not yet saved, calling `emit` once per drained
    /// chromosome in canonical order. Stops at the first closed-but-
    /// unsaved gap is impossible by construction; it stops at the first
    /// chromosome that is not yet closed.
    pub fn close_chrom(
        &mut self,
        id: ChromId,
        registry: &MutexRegistry,
        family: Family,
        mut emit: impl FnMut(ChromId, T),
    ) {
        let _guard = registry.lock(family);
        self.slots[id.0 as usize].closed = true;
        for i in 0..=id.0 as usize {
            let slot = &mut self.slots[i];
            if slot.saved {
                continue;
            }
            if !slot.closed {
                break;
            }
            if let Some(data) = slot.data.take() {
                emit(ChromId(i as u32), data);
            }
            slot.saved = true;
        }
    }

    pub fn is_fully_saved(&self) -> bool {
        self.slots.iter().all(|s| s.saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_in_canonical_order_regardless_of_close_order() {
        let mut emitter: OrderedEmitter<&'static str> = OrderedEmitter::new(3);
        emitter.open(ChromId(0), "chr1");
        emitter.open(ChromId(1), "chr2");
        emitter.open(ChromId(2), "chr3");

        let registry = MutexRegistry::new();
        let mut emitted = Vec::new();

        // chr2 (id 1) finishes first but nothing is emitted yet: chr1 is
        // not closed.
        emitter.close_chrom(ChromId(1), &registry, Family::BedGraph, |id, d| {
            emitted.push((id, d))
        });
        assert!(emitted.is_empty());

        // chr1 closes: both chr1 and the already-closed chr2 drain.
        emitter.close_chrom(ChromId(0), &registry, Family::BedGraph, |id, d| {
            emitted.push((id, d))
        });
        assert_eq!(emitted, vec![(ChromId(0), "chr1"), (ChromId(1), "chr2")]);

        emitted.clear();
        emitter.close_chrom(ChromId(2), &registry, Family::BedGraph, |id, d| {
            emitted.push((id, d))
        });
        assert_eq!(emitted, vec![(ChromId(2), "chr3")]);
        assert!(emitter.is_fully_saved());
    }

    #[test]
    fn each_chromosome_emits_exactly_once() {
        let mut emitter: OrderedEmitter<u32> = OrderedEmitter::new(2);
        emitter.open(ChromId(0), 10);
        emitter.open(ChromId(1), 20);
        let registry = MutexRegistry::new();
        let mut calls = 0;
        emitter.close_chrom(ChromId(0), &registry, Family::Density, |_, _| calls += 1);
        emitter.close_chrom(ChromId(1), &registry, Family::Density, |_, _| calls += 1);
        assert_eq!(calls, 2);
    }
}
