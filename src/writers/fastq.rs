//! FASTQ writer (C5).
//!
//! The fixed-length path pre-builds a template once — `\n<SEQ>\n+\n<QUAL>\n`
//! starting at a fixed anchor offset — and on every record only patches
//! the SEQ/QUAL byte ranges and backward-inserts the (variable-width)
//! `@name` header immediately before the anchor. The variable-length path
//! rebuilds the whole record by forward composition since `rlen` differs
//! per read.

use crate::blockfile::BlockFile;
use crate::error::Result;
use crate::linebuf::LineBuffer;

const HEADER_ROOM: usize = 256;

enum Mode {
    Fixed {
        anchor: usize,
        seq_offset: usize,
        qual_offset: usize,
        record_end: usize,
        rlen: usize,
    },
    Variable,
}

pub struct FastqWriter {
    block: BlockFile,
    buf: LineBuffer,
    mode: Mode,
    mate_suffix: &'static str,
}

impl FastqWriter {
    /// `fixed_rlen`: `Some(n)` selects the patch-in-place fast path for
    /// reads that are always exactly `n` bases; `None` selects the
    /// variable-length rebuild-from-scratch path.
    pub fn new(block: BlockFile, fixed_rlen: Option<u16>, mate_suffix: &'static str) -> Self {
        match fixed_rlen {
            Some(rlen) => {
                let rlen = rlen as usize;
                let anchor = HEADER_ROOM;
                let capacity = anchor + rlen * 2 + 8;
                let mut buf = LineBuffer::new(capacity, b'\n');
                buf.set_offset(anchor);
                buf.add_char(b'\n', false);
                let seq_offset = buf.current_offset();
                buf.add_chars(&vec![b'N'; rlen], false);
                buf.add_char(b'\n', false);
                buf.add_char(b'+', false);
                buf.add_char(b'\n', false);
                let qual_offset = buf.current_offset();
                buf.add_chars(&vec![b'I'; rlen], false);
                buf.add_char(b'\n', false);
                let record_end = buf.current_offset();
                Self {
                    block,
                    buf,
                    mode: Mode::Fixed {
                        anchor,
                        seq_offset,
                        qual_offset,
                        record_end,
                        rlen,
                    },
                    mate_suffix,
                }
            }
            None => Self {
                block,
                buf: LineBuffer::new(512, b'\n'),
                mode: Mode::Variable,
                mate_suffix,
            },
        }
    }

    pub fn write_record(&mut self, name: &str, seq: &[u8], qual: &[u8]) -> Result<()> {
        match self.mode {
            Mode::Fixed {
                anchor,
                seq_offset,
                qual_offset,
                record_end,
                rlen,
            } => {
                debug_assert_eq!(seq.len(), rlen);
                debug_assert_eq!(qual.len(), rlen);
                self.buf.patch_at(seq_offset, seq);
                self.buf.patch_at(qual_offset, qual);
                self.buf.set_offset(anchor);
                self.buf.add_str_back(self.mate_suffix, false);
                self.buf.add_str_back(name, false);
                self.buf.add_char_back(b'@', false);
                let header_start = self.buf.current_offset();
                let record = self.buf.slice(header_start, record_end).to_vec();
                self.block.write_record(&record, false)
            }
            Mode::Variable => {
                self.buf.set_offset(0);
                self.buf.add_char(b'@', false);
                self.buf.add_str(name, false);
                self.buf.add_str(self.mate_suffix, false);
                self.buf.add_str(" length=", false);
                self.buf.add_int(seq.len() as u32, false);
                self.buf.add_char(b'\n', false);
                self.buf.add_chars(seq, false);
                self.buf.add_char(b'\n', false);
                self.buf.add_char(b'+', false);
                self.buf.add_char(b'\n', false);
                self.buf.add_chars(qual, false);
                self.buf.add_char(b'\n', false);
                let end = self.buf.current_offset();
                let record = self.buf.slice(0, end).to_vec();
                self.block.write_record(&record, false)
            }
        }
    }

    pub fn close(&mut self) -> Result<()> {
        self.block.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn fixed_path_patches_seq_and_qual() {
        let tmp = NamedTempFile::new().unwrap();
        let block = BlockFile::create(tmp.path(), false).unwrap();
        let mut w = FastqWriter::new(block, Some(4), "");
        w.write_record("sim:chr1:100.1", b"ACGT", b"IIII").unwrap();
        w.close().unwrap();
        let content = std::fs::read_to_string(tmp.path()).unwrap();
        assert_eq!(content, "@sim:chr1:100.1\nACGT\n+\nIIII\n");
    }

    #[test]
    fn fixed_path_with_mate_suffix() {
        let tmp = NamedTempFile::new().unwrap();
        let block = BlockFile::create(tmp.path(), false).unwrap();
        let mut w = FastqWriter::new(block, Some(4), "/1");
        w.write_record("sim:chr1:500-600.1", b"AAAA", b"IIII")
            .unwrap();
        w.close().unwrap();
        let content = std::fs::read_to_string(tmp.path()).unwrap();
        assert_eq!(content, "@sim:chr1:500-600.1/1\nAAAA\n+\nIIII\n");
    }

    #[test]
    fn variable_path_includes_length_tag() {
        let tmp = NamedTempFile::new().unwrap();
        let block = BlockFile::create(tmp.path(), false).unwrap();
        let mut w = FastqWriter::new(block, None, "");
        w.write_record("sim:chr1:100.1", b"ACG", b"III").unwrap();
        w.close().unwrap();
        let content = std::fs::read_to_string(tmp.path()).unwrap();
        assert_eq!(content, "@sim:chr1:100.1 length=3\nACG\n+\nIII\n");
    }
}
