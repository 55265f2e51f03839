//! Composite output (C12): owns one instance of every enabled writer and
//! fans a single `add_read` call out to all of them.

use std::sync::{Arc, Mutex};

use rand::rngs::SmallRng;
use rand_distr::{Distribution, Normal};

use crate::bedgraph::BedGraphEmitter;
use crate::blockfile::BlockFile;
use crate::config::{OutputConfig, ReadLengthMode};
use crate::distribution::DistributionRecorder;
use crate::error::{AddReadOutcome, Result};
use crate::fragment::{reverse_complement_into, Strand};
use crate::genome::ChromId;
use crate::mutex_registry::MutexRegistry;
use crate::ncheck::check_n_limit;
use crate::quality::QualityPattern;
use crate::readname::ReadNameGenerator;
use crate::wiggle::WiggleEmitter;
use crate::writers::{BedWriter, FastqWriter, SamWriter};

/// Anything that can hand back the reference sequence for a chromosome
/// span. `None` signals the span fell outside the chromosome.
pub trait RefSeq {
    fn seq(&self, pos: u32, len: u16) -> Option<&[u8]>;
}

/// Which target `add_read` currently dispatches record writers to. A
/// single bit, toggled by the caller between fragments (e.g. to simulate
/// an input/control track alongside the real one); accumulators
/// (bedgraph/density/distribution) are unaffected by this mode and
/// always see every accepted fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GMode {
    #[default]
    Test,
    Control,
}

/// Record writers for the control ("_input") twin, mirroring the primary
/// set's FASTQ/BED/SAM targets.
#[derive(Default)]
pub struct ControlWriters {
    pub fastq1: Option<FastqWriter>,
    pub fastq2: Option<FastqWriter>,
    pub bed: Option<BedWriter>,
    pub sam: Option<SamWriter>,
}

/// Per-thread composite output. `bedgraph`/`fragment_density`/
/// `read_density` point at structures shared across every thread clone
/// (behind a mutex, since the ordered-emission scan needs exclusive
/// access to the whole chromosome table); the record writers
/// (FASTQ/BED/SAM) are private per thread, each holding its own
/// [`BlockFile`] clone that shares the underlying stream with the primer.
pub struct CompositeOutput {
    config: OutputConfig,
    quality: QualityPattern,
    read_name: ReadNameGenerator,
    rng: SmallRng,

    fastq1: Option<FastqWriter>,
    fastq2: Option<FastqWriter>,
    bed: Option<BedWriter>,
    sam: Option<SamWriter>,

    bedgraph: Option<Arc<Mutex<BedGraphEmitter>>>,
    /// Strand-separated bedgraphs (positive, negative), populated only
    /// when `config.strand_split_bedgraph` is set. SE only, mirroring the
    /// ground-truth constraint that strand separation and paired-end mode
    /// are mutually exclusive.
    bedgraph_strands: Option<(Arc<Mutex<BedGraphEmitter>>, Arc<Mutex<BedGraphEmitter>>)>,
    fragment_density: Option<Arc<Mutex<WiggleEmitter>>>,
    read_density: Option<Arc<Mutex<WiggleEmitter>>>,
    distribution: Option<Arc<Mutex<DistributionRecorder>>>,

    /// Control ("_input") twin of the record writers above, present only
    /// when `config.control_twin` is set. Selected via `gmode`.
    control: Option<ControlWriters>,
    gmode: GMode,

    mutex_registry: Arc<MutexRegistry>,
    current_chrom: Option<ChromId>,
    current_chrom_name: String,
}

impl CompositeOutput {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: OutputConfig,
        quality: QualityPattern,
        read_name: ReadNameGenerator,
        rng: SmallRng,
        fastq1: Option<FastqWriter>,
        fastq2: Option<FastqWriter>,
        bed: Option<BedWriter>,
        sam: Option<SamWriter>,
        bedgraph: Option<Arc<Mutex<BedGraphEmitter>>>,
        bedgraph_strands: Option<(Arc<Mutex<BedGraphEmitter>>, Arc<Mutex<BedGraphEmitter>>)>,
        fragment_density: Option<Arc<Mutex<WiggleEmitter>>>,
        read_density: Option<Arc<Mutex<WiggleEmitter>>>,
        distribution: Option<Arc<Mutex<DistributionRecorder>>>,
        control: Option<ControlWriters>,
        mutex_registry: Arc<MutexRegistry>,
    ) -> Self {
        Self {
            config,
            quality,
            read_name,
            rng,
            fastq1,
            fastq2,
            bed,
            sam,
            bedgraph,
            bedgraph_strands,
            fragment_density,
            read_density,
            distribution,
            control,
            gmode: GMode::Test,
            mutex_registry,
            current_chrom: None,
            current_chrom_name: String::new(),
        }
    }

    /// Switches which writer set (`Test` or `Control`) subsequent
    /// `add_read` calls dispatch records to. A no-op if no control twin
    /// was configured.
    pub fn set_gmode(&mut self, mode: GMode) {
        self.gmode = mode;
    }

    fn writer_refs(
        &mut self,
    ) -> (
        Option<&mut FastqWriter>,
        Option<&mut FastqWriter>,
        Option<&mut BedWriter>,
        Option<&mut SamWriter>,
    ) {
        match (self.gmode, self.control.as_mut()) {
            (GMode::Control, Some(c)) => (c.fastq1.as_mut(), c.fastq2.as_mut(), c.bed.as_mut(), c.sam.as_mut()),
            _ => (self.fastq1.as_mut(), self.fastq2.as_mut(), self.bed.as_mut(), self.sam.as_mut()),
        }
    }

    pub fn begin_chromosome(&mut self, id: ChromId, name: &str) {
        self.current_chrom = Some(id);
        self.current_chrom_name = name.to_string();
        self.read_name.set_chrom(name.strip_prefix("chr").unwrap_or(name));
        if let Some(bed) = self.bed.as_mut() {
            bed.set_chrom(name);
        }
        if let Some(bg) = &self.bedgraph {
            bg.lock().unwrap().open_chrom(id, name);
        }
        if let Some((pos, neg)) = &self.bedgraph_strands {
            pos.lock().unwrap().open_chrom(id, name);
            neg.lock().unwrap().open_chrom(id, name);
        }
        if let Some(fd) = &self.fragment_density {
            fd.lock().unwrap().open_chrom(id, name);
        }
        if let Some(rd) = &self.read_density {
            rd.lock().unwrap().open_chrom(id, name);
        }
    }

    pub fn end_chromosome(&mut self) -> Result<()> {
        let Some(id) = self.current_chrom.take() else {
            return Ok(());
        };
        if let Some(bg) = &self.bedgraph {
            bg.lock().unwrap().close_chrom(id, &self.mutex_registry)?;
        }
        if let Some((pos, neg)) = &self.bedgraph_strands {
            pos.lock().unwrap().close_chrom(id, &self.mutex_registry)?;
            neg.lock().unwrap().close_chrom(id, &self.mutex_registry)?;
        }
        if let Some(fd) = &self.fragment_density {
            fd.lock().unwrap().close_chrom(id, &self.mutex_registry)?;
        }
        if let Some(rd) = &self.read_density {
            rd.lock().unwrap().close_chrom(id, &self.mutex_registry)?;
        }
        Ok(())
    }

    fn sample_read_len(&mut self, frag_len: u32) -> u16 {
        match self.config.read_length {
            ReadLengthMode::Fixed(n) => n,
            ReadLengthMode::Variable { mean, sd, min, max } => {
                let normal = Normal::new(mean, sd).unwrap_or_else(|_| Normal::new(mean, 1.0).unwrap());
                let sampled = normal.sample(&mut self.rng).round().max(0.0) as u32;
                let upper = (max as u32).min(frag_len);
                sampled.clamp(min as u32, upper.max(min as u32)) as u16
            }
        }
    }

    /// Adds one fragment, deriving and dispatching its read(s) to every
    /// enabled output.
    pub fn add_read(&mut self, refseq: &dyn RefSeq, start: u32, frag_len: u32, reverse: bool) -> Result<AddReadOutcome> {
        let rlen = self.sample_read_len(frag_len);
        let end = start + frag_len;

        if self.config.paired_end {
            self.add_read_pe(refseq, start, end, rlen)
        } else {
            self.add_read_se(refseq, start, end, rlen, reverse)
        }
    }

    fn add_read_se(&mut self, refseq: &dyn RefSeq, start: u32, end: u32, rlen: u16, reverse: bool) -> Result<AddReadOutcome> {
        let pos = if reverse {
            end.saturating_sub(rlen as u32)
        } else {
            start
        };
        let seq = refseq.seq(pos, rlen);
        let outcome = check_n_limit(seq, self.config.n_limit);
        if !outcome.is_accepted() {
            return Ok(outcome);
        }
        let seq = seq.unwrap();

        let chrom = self.current_chrom.expect("add_read called outside begin/end_chromosome");
        if let Some(bg) = &self.bedgraph {
            bg.lock().unwrap().add_interval(chrom, start, end);
        }
        if let Some((pos_bg, neg_bg)) = &self.bedgraph_strands {
            let strand_bg = if reverse { neg_bg } else { pos_bg };
            strand_bg.lock().unwrap().add_interval(chrom, start, end);
        }
        let center = start + (end - start) / 2;
        if let Some(fd) = &self.fragment_density {
            fd.lock().unwrap().add_point(chrom, center);
        }

        if let Some(rd) = &self.read_density {
            let anchor = if reverse { pos + rlen as u32 } else { pos };
            rd.lock().unwrap().add_point(chrom, anchor);
        }
        if let Some(dist) = &self.distribution {
            dist.lock().unwrap().add(end - start, rlen as u32);
        }

        if !self.config.formats.any_record_writer() {
            return Ok(AddReadOutcome::Accepted);
        }

        let name = self.read_name.next_name(start, end).to_string();
        let strand = if reverse { Strand::Reverse } else { Strand::Forward };

        let mut complemented = Vec::new();
        let out_seq: &[u8] = if reverse {
            complemented.resize(seq.len(), 0);
            reverse_complement_into(seq, &mut complemented);
            &complemented
        } else {
            seq
        };

        let mut qual = vec![0u8; rlen as usize];
        self.quality.fill(&mut qual);

        let chrom_name = self.current_chrom_name.clone();
        let (fastq1, _, bed, sam) = self.writer_refs();
        if let Some(fastq) = fastq1 {
            fastq.write_record(&name, out_seq, &qual)?;
        }
        if let Some(bed) = bed {
            bed.write_record(pos, pos + rlen as u32, &name, strand)?;
        }
        if let Some(sam) = sam {
            sam.write_record(&name, &chrom_name, pos, reverse, out_seq, &qual, "*", None, 0)?;
        }

        Ok(AddReadOutcome::Accepted)
    }

    fn add_read_pe(&mut self, refseq: &dyn RefSeq, start: u32, end: u32, rlen: u16) -> Result<AddReadOutcome> {
        let fwd_pos = start;
        let rev_pos = end.saturating_sub(rlen as u32);
        let fwd_seq = refseq.seq(fwd_pos, rlen);
        let rev_seq = refseq.seq(rev_pos, rlen);

        let fwd_outcome = check_n_limit(fwd_seq, self.config.n_limit);
        if !fwd_outcome.is_accepted() {
            return Ok(fwd_outcome);
        }
        let rev_outcome = check_n_limit(rev_seq, self.config.n_limit);
        if !rev_outcome.is_accepted() {
            return Ok(rev_outcome);
        }
        let fwd_seq = fwd_seq.unwrap();
        let rev_seq = rev_seq.unwrap();

        let chrom = self.current_chrom.expect("add_read called outside begin/end_chromosome");
        if let Some(bg) = &self.bedgraph {
            bg.lock().unwrap().add_interval(chrom, start, end);
        }
        let center = start + (end - start) / 2;
        if let Some(fd) = &self.fragment_density {
            fd.lock().unwrap().add_point(chrom, center);
        }

        if let Some(rd) = &self.read_density {
            let mut rd = rd.lock().unwrap();
            rd.add_point(chrom, fwd_pos);
            rd.add_point(chrom, rev_pos + rlen as u32);
        }
        if let Some(dist) = &self.distribution {
            dist.lock().unwrap().add(end - start, rlen as u32);
        }

        if !self.config.formats.any_record_writer() {
            return Ok(AddReadOutcome::Accepted);
        }

        let name = self.read_name.next_name(start, end).to_string();
        let mut qual = vec![0u8; rlen as usize];
        self.quality.fill(&mut qual);

        let mut rev_complemented = vec![0u8; rev_seq.len()];
        reverse_complement_into(rev_seq, &mut rev_complemented);

        let frag_len = (end - start) as i64;
        let chrom_name = self.current_chrom_name.clone();
        let (fastq1, fastq2, bed, sam) = self.writer_refs();

        if let Some(fastq1) = fastq1 {
            fastq1.write_record(&name, fwd_seq, &qual)?;
        }
        if let Some(fastq2) = fastq2 {
            fastq2.write_record(&name, &rev_complemented, &qual)?;
        }
        if let Some(bed) = bed {
            bed.write_record(fwd_pos, fwd_pos + rlen as u32, &name, Strand::Forward)?;
            bed.write_record(rev_pos, rev_pos + rlen as u32, &name, Strand::Reverse)?;
        }
        if let Some(sam) = sam {
            sam.write_record(
                &name,
                &chrom_name,
                fwd_pos,
                false,
                fwd_seq,
                &qual,
                "=",
                Some(rev_pos),
                frag_len,
            )?;
            sam.write_record(
                &name,
                &chrom_name,
                rev_pos,
                true,
                &rev_complemented,
                &qual,
                "=",
                Some(fwd_pos),
                -frag_len,
            )?;
        }

        Ok(AddReadOutcome::Accepted)
    }

    pub fn close(&mut self) -> Result<()> {
        if let Some(w) = self.fastq1.as_mut() {
            w.close()?;
        }
        if let Some(w) = self.fastq2.as_mut() {
            w.close()?;
        }
        if let Some(w) = self.bed.as_mut() {
            w.close()?;
        }
        if let Some(w) = self.sam.as_mut() {
            w.close()?;
        }
        if let Some(c) = self.control.as_mut() {
            if let Some(w) = c.fastq1.as_mut() {
                w.close()?;
            }
            if let Some(w) = c.fastq2.as_mut() {
                w.close()?;
            }
            if let Some(w) = c.bed.as_mut() {
                w.close()?;
            }
            if let Some(w) = c.sam.as_mut() {
                w.close()?;
            }
        }
        Ok(())
    }
}

/// Dummy in-memory reference used by the demo binary and integration
/// tests: a single repeated base, long enough to cover any requested
/// span.
pub struct ConstantRefSeq {
    bases: Vec<u8>,
}

impl ConstantRefSeq {
    pub fn new(base: u8, len: usize) -> Self {
        Self {
            bases: vec![base; len],
        }
    }
}

impl RefSeq for ConstantRefSeq {
    fn seq(&self, pos: u32, len: u16) -> Option<&[u8]> {
        let start = pos as usize;
        let end = start + len as usize;
        self.bases.get(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readname::ReadNameMode;
    use rand::SeedableRng;
    use tempfile::tempdir;

    fn base_config(dir: &std::path::Path, paired: bool) -> OutputConfig {
        OutputConfig {
            base_name: dir.join("run1"),
            formats: crate::config::OutputFormats {
                bed: true,
                ..Default::default()
            },
            paired_end: paired,
            zipped: false,
            map_quality: 40,
            cmdline: "sim --seed 1".into(),
            tool_name: "sim".into(),
            tool_version: "0.1".into(),
            quality_pattern_file: None,
            read_name: ReadNameMode::SePosition,
            read_length: ReadLengthMode::Fixed(50),
            strand_split_bedgraph: false,
            n_limit: None,
            control_twin: false,
            thread_count: 1,
        }
    }

    #[test]
    fn se_bed_only_scenario_from_spec() {
        let dir = tempdir().unwrap();
        let config = base_config(dir.path(), false);
        let bed_path = config.artifact_path("bed");
        let block = BlockFile::create(&bed_path, false).unwrap();
        let bed = BedWriter::new(block, config.map_quality);
        let quality = QualityPattern::constant();
        let read_name = ReadNameGenerator::new("sim", ReadNameMode::SePosition);
        let rng = SmallRng::seed_from_u64(1);

        let mut composite = CompositeOutput::new(
            config,
            quality,
            read_name,
            rng,
            None,
            None,
            Some(bed),
            None,
            None,
            None,
            None,
            None,
            None,
            None,
            Arc::new(MutexRegistry::new()),
        );

        composite.begin_chromosome(ChromId(0), "chr1");
        let refseq = ConstantRefSeq::new(b'A', 1000);
        let outcome = composite.add_read(&refseq, 100, 50, false).unwrap();
        assert!(outcome.is_accepted());
        composite.end_chromosome().unwrap();
        composite.close().unwrap();

        let content = std::fs::read_to_string(&bed_path).unwrap();
        assert_eq!(content, "chr1\t100\t150\tsim:chr1:100.1\t40\t+\n");
    }

    #[test]
    fn rejected_fragment_leaves_bedgraph_and_density_untouched() {
        let dir = tempdir().unwrap();
        let mut config = base_config(dir.path(), false);
        config.n_limit = Some(0);
        let genome_len = 1;

        let bg_path = config.artifact_path("bedgraph");
        let bg_block = BlockFile::create(&bg_path, false).unwrap();
        let bedgraph = Arc::new(Mutex::new(
            crate::bedgraph::BedGraphEmitter::new(bg_block, genome_len, &config.cmdline, "sim actual coverage").unwrap(),
        ));
        let fd_path = config.artifact_path("fdens");
        let fd_block = BlockFile::create(&fd_path, false).unwrap();
        let fragment_density = Arc::new(Mutex::new(
            crate::wiggle::WiggleEmitter::new(fd_block, genome_len, &config.cmdline, "sim frag density").unwrap(),
        ));

        let quality = QualityPattern::constant();
        let read_name = ReadNameGenerator::new("sim", ReadNameMode::SePosition);
        let rng = SmallRng::seed_from_u64(1);

        let mut composite = CompositeOutput::new(
            config,
            quality,
            read_name,
            rng,
            None,
            None,
            None,
            None,
            Some(bedgraph.clone()),
            None,
            Some(fragment_density.clone()),
            None,
            None,
            None,
            Arc::new(MutexRegistry::new()),
        );

        composite.begin_chromosome(ChromId(0), "chr1");
        // Every base is 'N', so any nonzero n_limit check rejects the read.
        let refseq = ConstantRefSeq::new(b'N', 1000);
        let outcome = composite.add_read(&refseq, 100, 50, false).unwrap();
        assert_eq!(outcome, crate::error::AddReadOutcome::NLimitExceeded);
        composite.end_chromosome().unwrap();
        composite.close().unwrap();

        bedgraph.lock().unwrap().close().unwrap();
        fragment_density.lock().unwrap().close().unwrap();

        let bg_content = std::fs::read_to_string(&bg_path).unwrap();
        assert!(
            !bg_content.lines().any(|l| !l.starts_with('#') && !l.starts_with("track")),
            "rejected fragment must not appear in bedgraph coverage"
        );
        let fd_content = std::fs::read_to_string(&fd_path).unwrap();
        assert!(
            !fd_content.contains("variableStep"),
            "rejected fragment must not open any density chromosome block"
        );
    }
}
