//! Per-base quality pattern used by FASTQ and SAM output.

use std::fs;
use std::path::Path;

use crate::error::{OutputError, Result};

const DEFAULT_QUALITY: u8 = b'I'; // Phred 40 in Sanger/Illumina 1.8+ encoding

/// A reusable quality string. If no pattern file is supplied the buffer is
/// a constant-character fill; otherwise the given pattern is replayed,
/// with any tail beyond the pattern's length padded with the default
/// character.
#[derive(Debug, Clone)]
pub struct QualityPattern {
    pattern: Vec<u8>,
}

impl QualityPattern {
    /// Builds a constant-fill pattern (no external quality file given).
    pub fn constant() -> Self {
        Self {
            pattern: Vec::new(),
        }
    }

    /// Loads a single quality line from `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| OutputError::OpenFailure {
            path: path.to_path_buf(),
            source,
        })?;
        let line = content.lines().next().unwrap_or("").trim();
        if line.is_empty() {
            return Err(OutputError::EmptyFile {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            pattern: line.as_bytes().to_vec(),
        })
    }

    /// Fills `dst` (exactly `dst.len()` bytes) with quality characters: the
    /// stored pattern repeated/truncated as needed, or the default
    /// constant when no pattern was loaded; any uncovered tail is padded
    /// with the default character.
    pub fn fill(&self, dst: &mut [u8]) {
        if self.pattern.is_empty() {
            dst.fill(DEFAULT_QUALITY);
            return;
        }
        let n = dst.len().min(self.pattern.len());
        dst[..n].copy_from_slice(&self.pattern[..n]);
        if dst.len() > n {
            dst[n..].fill(DEFAULT_QUALITY);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn constant_pattern_fills_default_character() {
        let q = QualityPattern::constant();
        let mut buf = [0u8; 5];
        q.fill(&mut buf);
        assert_eq!(&buf, b"IIIII");
    }

    #[test]
    fn file_pattern_pads_tail_with_default() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "AABB").unwrap();
        let q = QualityPattern::from_file(file.path()).unwrap();
        let mut buf = [0u8; 6];
        q.fill(&mut buf);
        assert_eq!(&buf, b"AABBII");
    }

    #[test]
    fn file_pattern_truncates_when_longer_than_dst() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "AABBCCDD").unwrap();
        let q = QualityPattern::from_file(file.path()).unwrap();
        let mut buf = [0u8; 4];
        q.fill(&mut buf);
        assert_eq!(&buf, b"AABB");
    }
}
