//! BED alignment writer (C6).

use crate::blockfile::BlockFile;
use crate::error::Result;
use crate::fragment::Strand;
use crate::linebuf::LineBuffer;

/// Writes one BED record per read: `chrom start end name score strand`.
/// `set_chrom` patches the chromosome column once; each record restarts
/// composition right after it, avoiding re-writing the chromosome string
/// per read.
pub struct BedWriter {
    block: BlockFile,
    buf: LineBuffer,
    chrom_end: usize,
    map_quality: u8,
}

impl BedWriter {
    pub fn new(block: BlockFile, map_quality: u8) -> Self {
        Self {
            block,
            buf: LineBuffer::new(256, b'\t'),
            chrom_end: 0,
            map_quality,
        }
    }

    pub fn set_chrom(&mut self, chrom: &str) {
        self.buf.set_offset(0);
        self.buf.add_str(chrom, true);
        self.chrom_end = self.buf.current_offset();
    }

    pub fn write_record(&mut self, start: u32, end: u32, name: &str, strand: Strand) -> Result<()> {
        self.buf.set_offset(self.chrom_end);
        self.buf.add_int(start, true);
        self.buf.add_int(end, true);
        self.buf.add_str(name, true);
        self.buf.add_int(self.map_quality, true);
        self.buf.add_char(strand.to_string().as_bytes()[0], false);
        let end_offset = self.buf.current_offset();
        let record = self.buf.slice(0, end_offset).to_vec();
        self.block.write_record(&record, true)
    }

    pub fn close(&mut self) -> Result<()> {
        self.block.close()
    }
}
