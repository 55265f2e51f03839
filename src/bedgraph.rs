//! Ordered bedgraph coverage emission, combining C8 (coverage maps) with
//! the C10 ordered-release protocol.

use crate::coverage::CoverageMap;
use crate::error::Result;
use crate::genome::ChromId;
use crate::linebuf::LineBuffer;
use crate::mutex_registry::{Family, MutexRegistry};
use crate::ordered_emitter::OrderedEmitter;
use crate::blockfile::BlockFile;

pub struct BedGraphEmitter {
    block: BlockFile,
    emitter: OrderedEmitter<(String, CoverageMap)>,
}

impl BedGraphEmitter {
    pub fn new(mut block: BlockFile, chrom_count: usize, cmdline: &str, description: &str) -> Result<Self> {
        let header1 = format!("# {cmdline}");
        block.write_record(header1.as_bytes(), true)?;
        let filename = block
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let header2 = format!(
            "track type=bedGraph name=\"{filename}\" description=\"{description}\" color=50,130,190 autoScale=on",
        );
        block.write_record(header2.as_bytes(), true)?;
        Ok(Self {
            block,
            emitter: OrderedEmitter::new(chrom_count),
        })
    }

    pub fn open_chrom(&mut self, id: ChromId, name: &str) {
        self.emitter.open(id, (name.to_string(), CoverageMap::new()));
    }

    pub fn add_interval(&mut self, id: ChromId, start: u32, end: u32) {
        if let Some((_, cov)) = self.emitter.get_mut(id) {
            cov.add_interval(start, end);
        }
    }

    pub fn close_chrom(&mut self, id: ChromId, registry: &MutexRegistry) -> Result<()> {
        let mut pending_error = None;
        let block = &mut self.block;
        self.emitter
            .close_chrom(id, registry, Family::BedGraph, |_, (name, cov)| {
                let mut buf = LineBuffer::new(64, b'\t');
                for (start, end, depth) in cov.runs() {
                    buf.set_offset(0);
                    buf.add_str(&name, true);
                    buf.add_int(start, true);
                    buf.add_int(end, true);
                    buf.add_int(depth, false);
                    let offset = buf.current_offset();
                    if let Err(e) = block.write_record(buf.slice(0, offset), true) {
                        pending_error = Some(e);
                    }
                }
            });
        match pending_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn close(&mut self) -> Result<()> {
        self.block.close()
    }
}
