//! Ordered wiggle (variableStep) density emission, combining C9 (density
//! maps) with the C10 ordered-release protocol.

use crate::blockfile::BlockFile;
use crate::density::DensityMap;
use crate::error::Result;
use crate::genome::ChromId;
use crate::linebuf::LineBuffer;
use crate::mutex_registry::{Family, MutexRegistry};
use crate::ordered_emitter::OrderedEmitter;

pub struct WiggleEmitter {
    block: BlockFile,
    emitter: OrderedEmitter<(String, DensityMap)>,
}

impl WiggleEmitter {
    pub fn new(mut block: BlockFile, chrom_count: usize, cmdline: &str, description: &str) -> Result<Self> {
        let header1 = format!("# {cmdline}");
        block.write_record(header1.as_bytes(), true)?;
        let filename = block
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let header2 = format!(
            "track type=wiggle_0 name=\"{filename}\" description=\"{description}\" color=50,130,190 autoScale=on",
        );
        block.write_record(header2.as_bytes(), true)?;
        Ok(Self {
            block,
            emitter: OrderedEmitter::new(chrom_count),
        })
    }

    pub fn open_chrom(&mut self, id: ChromId, name: &str) {
        self.emitter.open(id, (name.to_string(), DensityMap::new()));
    }

    pub fn add_point(&mut self, id: ChromId, pos: u32) {
        if let Some((_, dens)) = self.emitter.get_mut(id) {
            dens.add(pos);
        }
    }

    pub fn close_chrom(&mut self, id: ChromId, registry: &MutexRegistry) -> Result<()> {
        let mut pending_error = None;
        let block = &mut self.block;
        self.emitter
            .close_chrom(id, registry, Family::Density, |_, (name, dens)| {
                if dens.is_empty() {
                    return;
                }
                let decl = format!("variableStep chrom={name} span=1");
                if let Err(e) = block.write_record(decl.as_bytes(), true) {
                    pending_error = Some(e);
                    return;
                }
                let mut buf = LineBuffer::new(32, b' ');
                for (pos, count) in dens.entries() {
                    buf.set_offset(0);
                    buf.add_int(pos, true);
                    buf.add_int(count, false);
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
