//! SAM alignment writer (C7).
//!
//! Per-record assembly patches a fixed-width `SEQ\tQUAL\n` tail (for
//! fixed-length reads) and backward-inserts the preceding columns in a
//! single right-to-left pass: `TLEN`, `PNEXT`, `RNEXT`, the pre-built
//! `MAPQ\tCIGAR` pair, `POS`, `RNAME`, `FLAG`, `QNAME`. `MAPQ`+`CIGAR` are
//! combined into one pre-built string because both are constant for a
//! fixed `rlen`/`map_quality` run, saving a call per record; `FLAG` is
//! chosen from a 2-entry constant table rather than formatted.

use crate::blockfile::BlockFile;
use crate::error::Result;
use crate::genome::ChromSizes;
use crate::linebuf::LineBuffer;

/// SE flags are 0 (forward) / 16 (reverse); PE flags are 99 (mate 1,
/// forward) / 147 (mate 2, reverse) — the only orientation this simulator
/// produces for a proper pair.
fn flag_str(paired: bool, reverse: bool) -> &'static str {
    match (paired, reverse) {
        (false, false) => "0",
        (false, true) => "16",
        (true, false) => "99",
        (true, true) => "147",
    }
}

pub struct SamWriter {
    block: BlockFile,
    buf: LineBuffer,
    anchor: usize,
    seq_offset: usize,
    record_end: usize,
    rlen: usize,
    fld_5_6: String,
    paired: bool,
}

impl SamWriter {
    pub fn new(block: BlockFile, map_quality: u8, rlen: u16, paired: bool) -> Self {
        let rlen_usize = rlen as usize;
        let anchor = 256;
        let capacity = anchor + rlen_usize * 2 + 16;
        let mut buf = LineBuffer::new(capacity, b'\t');
        buf.set_offset(anchor);
        let seq_offset = buf.current_offset();
        buf.add_chars(&vec![b'N'; rlen_usize], true);
        buf.add_chars(&vec![b'I'; rlen_usize], false);
        buf.add_char(b'\n', false);
        let record_end = buf.current_offset();
        let fld_5_6 = format!("{map_quality}\t{rlen}M");
        Self {
            block,
            buf,
            anchor,
            seq_offset,
            record_end,
            rlen: rlen_usize,
            fld_5_6,
            paired,
        }
    }

    /// Writes `@HD`, one `@SQ` per chromosome in canonical order, and
    /// `@PG`.
    pub fn write_header(&mut self, chrom_sizes: &ChromSizes, tool: &str, version: &str, cmdline: &str) -> Result<()> {
        self.block
            .write_record(b"@HD\tVN:1.0\tSO:unsorted", true)?;
        for name in chrom_sizes.chromosomes() {
            let len = chrom_sizes.chrom_size(name).unwrap_or(0);
            let line = format!("@SQ\tSN:{name}\tLN:{len}");
            self.block.write_record(line.as_bytes(), true)?;
        }
        let line = format!("@PG\tID:{tool}\tPN:{tool}\tVN:{version}\tCL:\"{cmdline}\"");
        self.block.write_record(line.as_bytes(), true)
    }

    /// Writes one alignment record. `pos`/`pnext` are 0-based internal
    /// positions; this call applies the single 1-based conversion
    /// (`+1`) uniformly for SE and PE.
    #[allow(clippy::too_many_arguments)]
    pub fn write_record(
        &mut self,
        qname: &str,
        rname: &str,
        pos: u32,
        reverse: bool,
        seq: &[u8],
        qual: &[u8],
        rnext: &str,
        pnext: Option<u32>,
        tlen: i64,
    ) -> Result<()> {
        debug_assert_eq!(seq.len(), self.rlen);
        debug_assert_eq!(qual.len(), self.rlen);
        self.buf.patch_at(self.seq_offset, seq);
        self.buf
            .patch_at(self.seq_offset + self.rlen + 1, qual);

        self.buf.set_offset(self.anchor);
        self.buf.add_int_back(tlen, true);
        match pnext {
            Some(p) => self.buf.add_int_back(p + 1, true),
            None => self.buf.add_char_back(b'0', true),
        }
        self.buf.add_str_back(rnext, true);
        self.buf.add_str_back(&self.fld_5_6, true);
        self.buf.add_int_back(pos + 1, true);
        self.buf.add_str_back(rname, true);
        self.buf.add_str_back(flag_str(self.paired, reverse), true);
        self.buf.add_str_back(qname, true);
        let header_start = self.buf.current_offset();

        let record = self.buf.slice(header_start, self.record_end).to_vec();
        self.block.write_record(&record, false)
    }

    pub fn close(&mut self) -> Result<()> {
        self.block.close()
    }
}
