//! Fragment- and read-length distribution recorder (C11).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::mutex_registry::{Family, MutexRegistry};

/// Which generative family produced the lengths being recorded, used only
/// to choose the descriptor line written at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    FragmentLognormal,
    ReadNormal,
    ConstantLength,
}

impl DistributionKind {
    fn descriptor(self) -> &'static str {
        match self {
            DistributionKind::FragmentLognormal => "# lognormal fragment length distribution",
            DistributionKind::ReadNormal => "# normal read length distribution",
            DistributionKind::ConstantLength => "# constant length distribution",
        }
    }
}

/// Accumulates fragment-length and read-length histograms and writes them
/// out at shutdown. Write failures at shutdown are warned, not raised —
/// destructors must not propagate an error (§7): the actual I/O result is
/// caught and reported with `eprintln!` instead of panicking.
pub struct DistributionRecorder {
    frag_path: Option<PathBuf>,
    read_path: Option<PathBuf>,
    frag_kind: DistributionKind,
    read_kind: DistributionKind,
    frag_lengths: BTreeMap<u32, u64>,
    read_lengths: BTreeMap<u32, u64>,
    registry: Arc<MutexRegistry>,
}

impl DistributionRecorder {
    pub fn new(
        frag_path: Option<PathBuf>,
        read_path: Option<PathBuf>,
        frag_kind: DistributionKind,
        read_kind: DistributionKind,
        registry: Arc<MutexRegistry>,
    ) -> Self {
        Self {
            frag_path,
            read_path,
            frag_kind,
            read_kind,
            frag_lengths: BTreeMap::new(),
            read_lengths: BTreeMap::new(),
            registry,
        }
    }

    /// Records one accepted fragment/read pair.
    pub fn add(&mut self, frag_len: u32, read_len: u32) {
        if self.frag_path.is_some() {
            *self.frag_lengths.entry(frag_len).or_insert(0) += 1;
        }
        if self.read_path.is_some() {
            *self.read_lengths.entry(read_len).or_insert(0) += 1;
        }
    }

    fn write_histogram(path: &PathBuf, kind: DistributionKind, hist: &BTreeMap<u32, u64>) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);
        writeln!(w, "{}", kind.descriptor())?;
        for (len, count) in hist {
            writeln!(w, "{len}\t{count}")?;
        }
        w.flush()
    }

    /// Writes both enabled histograms now (rather than waiting for drop),
    /// so callers can observe and propagate a write error if they choose
    /// to; `Drop` calls this too but discards the result into a warning.
    pub fn flush(&self) -> std::io::Result<()> {
        let _guard = self.registry.lock(Family::Distribution);
        if let Some(path) = &self.frag_path {
            Self::write_histogram(path, self.frag_kind, &self.frag_lengths)?;
        }
        if let Some(path) = &self.read_path {
            Self::write_histogram(path, self.read_kind, &self.read_lengths)?;
        }
        Ok(())
    }
}

impl Drop for DistributionRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            eprintln!("warning: failed to write distribution report: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn records_and_flushes_both_histograms() {
        let dir = tempdir().unwrap();
        let frag_path = dir.path().join("out.fdist");
        let read_path = dir.path().join("out.rdist");
        let mut rec = DistributionRecorder::new(
            Some(frag_path.clone()),
            Some(read_path.clone()),
            DistributionKind::FragmentLognormal,
            DistributionKind::ConstantLength,
            Arc::new(MutexRegistry::new()),
        );
        rec.add(200, 50);
        rec.add(200, 50);
        rec.add(250, 50);
        rec.flush().unwrap();

        let frag_content = std::fs::read_to_string(&frag_path).unwrap();
        assert!(frag_content.contains("200\t2"));
        assert!(frag_content.contains("250\t1"));

        let read_content = std::fs::read_to_string(&read_path).unwrap();
        assert!(read_content.contains("50\t3"));
    }

    #[test]
    fn disabled_paths_record_nothing() {
        let mut rec = DistributionRecorder::new(
            None,
            None,
            DistributionKind::FragmentLognormal,
            DistributionKind::ConstantLength,
            Arc::new(MutexRegistry::new()),
        );
        rec.add(100, 50);
        assert!(rec.frag_lengths.is_empty());
        assert!(rec.read_lengths.is_empty());
    }
}
