//! Chromosome size table with canonical ordering.
//!
//! Parses `.genome`-style files (tab-delimited: chrom\tsize), and assigns
//! every chromosome a stable [`ChromId`] in *canonical* order (numeric ascending,
//! then X, Y, M) rather than file order, and tracks an "effective length"
//! (length minus undefined regions) used by the partitioner.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{OutputError, Result};

/// Stable per-run chromosome identifier. Indexes into [`ChromSizes`]'s
/// canonical order, not file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChromId(pub u32);

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    length: u64,
    undefined: u64,
}

/// Ranks a chromosome name for canonical ordering: numbered chromosomes
/// ascending, then X, Y, M, then anything else by name.
fn canonical_rank(name: &str) -> (u8, u64, &str) {
    let stripped = name.strip_prefix("chr").unwrap_or(name);
    if let Ok(n) = stripped.parse::<u64>() {
        return (0, n, name);
    }
    match stripped {
        "X" => (1, 0, name),
        "Y" => (2, 0, name),
        "M" | "MT" => (3, 0, name),
        _ => (4, 0, name),
    }
}

/// Chromosome sizes for one run, exposed in canonical order.
#[derive(Debug, Clone, Default)]
pub struct ChromSizes {
    entries: Vec<Entry>,
    by_name: HashMap<String, ChromId>,
}

impl ChromSizes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load chromosome sizes from a tab-delimited file (chrom\tsize).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|source| OutputError::OpenFailure {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut table = Self::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split('\t');
            let chrom = fields.next().ok_or_else(|| OutputError::Parse {
                line: line_num + 1,
                message: "missing chromosome column".to_string(),
            })?;
            let size_str = fields.next().ok_or_else(|| OutputError::Parse {
                line: line_num + 1,
                message: "missing size column".to_string(),
            })?;
            let size: u64 = size_str.parse().map_err(|_| OutputError::Parse {
                line: line_num + 1,
                message: format!("invalid chromosome size: {size_str}"),
            })?;
            table.insert(chrom.to_string(), size);
        }

        table.sort_canonical();
        Ok(table)
    }

    /// Insert or update a chromosome's length. Canonical order is
    /// recomputed lazily by `sort_canonical`; call it once all entries are
    /// known (`from_file` does this automatically).
    pub fn insert(&mut self, chrom: String, length: u64) {
        if let Some(&id) = self.by_name.get(&chrom) {
            self.entries[id.0 as usize].length = length;
            return;
        }
        let id = ChromId(self.entries.len() as u32);
        self.by_name.insert(chrom.clone(), id);
        self.entries.push(Entry {
            name: chrom,
            length,
            undefined: 0,
        });
    }

    /// Record `extra` bases of undefined ('N') sequence for a chromosome,
    /// reducing its effective length.
    pub fn add_undefined(&mut self, chrom: &str, extra: u64) {
        if let Some(&id) = self.by_name.get(chrom) {
            self.entries[id.0 as usize].undefined += extra;
        }
    }

    fn sort_canonical(&mut self) {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by(|&a, &b| {
            canonical_rank(&self.entries[a].name).cmp(&canonical_rank(&self.entries[b].name))
        });
        let reordered: Vec<Entry> = order.iter().map(|&i| self.entries[i].clone()).collect();
        self.entries = reordered;
        self.by_name.clear();
        for (idx, e) in self.entries.iter().enumerate() {
            self.by_name.insert(e.name.clone(), ChromId(idx as u32));
        }
    }

    pub fn id_of(&self, chrom: &str) -> Option<ChromId> {
        self.by_name.get(chrom).copied()
    }

    pub fn name_of(&self, id: ChromId) -> Option<&str> {
        self.entries.get(id.0 as usize).map(|e| e.name.as_str())
    }

    pub fn length(&self, id: ChromId) -> Option<u64> {
        self.entries.get(id.0 as usize).map(|e| e.length)
    }

    /// Length minus recorded undefined ('N') regions.
    pub fn effective_length(&self, id: ChromId) -> Option<u64> {
        self.entries
            .get(id.0 as usize)
            .map(|e| e.length.saturating_sub(e.undefined))
    }

    pub fn chrom_size(&self, chrom: &str) -> Option<u64> {
        self.id_of(chrom).and_then(|id| self.length(id))
    }

    pub fn has_chrom(&self, chrom: &str) -> bool {
        self.by_name.contains_key(chrom)
    }

    /// Chromosome names in canonical order.
    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// `(ChromId, effective_length)` pairs in canonical order, the input
    /// the partitioner (C13) consumes directly.
    pub fn effective_lengths(&self) -> Vec<(ChromId, u64)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (ChromId(i as u32), e.length.saturating_sub(e.undefined)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
