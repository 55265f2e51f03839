// Clippy allows
#![allow(clippy::too_many_arguments)]

//! chipsim-demo: synthetic driver for the output engine.
//!
//! Wires a clap CLI, a genome file, and an in-memory constant reference
//! sequence through [`chipsim_output::composite::CompositeOutput`], one
//! instance per worker thread, partitioned by chromosome the way the
//! simulator itself would. Fragment lengths are drawn from a log-normal
//! distribution and positions uniformly at random — there is no real
//! sequencing model here, only enough synthetic input to exercise every
//! output format end to end.

use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};

use clap::Parser;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal};

use chipsim_output::bedgraph::BedGraphEmitter;
use chipsim_output::blockfile::BlockFile;
use chipsim_output::composite::{CompositeOutput, ConstantRefSeq, ControlWriters, GMode};
use chipsim_output::config::{OutputConfig, OutputFormats, ReadLengthMode};
use chipsim_output::distribution::{DistributionKind, DistributionRecorder};
use chipsim_output::error::Result;
use chipsim_output::genome::ChromSizes;
use chipsim_output::mutex_registry::MutexRegistry;
use chipsim_output::partition::partition;
use chipsim_output::quality::QualityPattern;
use chipsim_output::readname::{ReadNameGenerator, ReadNameMode};
use chipsim_output::wiggle::WiggleEmitter;
use chipsim_output::writers::{BedWriter, FastqWriter, SamWriter};

#[derive(Parser)]
#[command(name = "chipsim-demo")]
#[command(author = "Manish Kumar Bobbili")]
#[command(version)]
#[command(about = "Synthetic multi-threaded driver for the ChIP-seq output engine", long_about = None)]
struct Cli {
    /// Tab-delimited chromosome-size file (chrom\tsize)
    #[arg(short = 'g', long)]
    genome: PathBuf,

    /// Output path prefix
    #[arg(short = 'o', long, default_value = "sim_out")]
    out: PathBuf,

    /// Total fragments to simulate, distributed across chromosomes by
    /// effective length
    #[arg(long, default_value_t = 10_000)]
    fragments: u64,

    /// Worker threads (one chromosome subset per thread)
    #[arg(short = 't', long, default_value_t = 4)]
    threads: usize,

    /// RNG seed
    #[arg(long, default_value_t = 1)]
    seed: u64,

    #[arg(long)]
    fastq: bool,
    #[arg(long)]
    bed: bool,
    #[arg(long)]
    sam: bool,
    #[arg(long)]
    bedgraph: bool,
    /// Also emit strand-separated bedgraphs (B_pos.bg/B_neg.bg) alongside
    /// the combined one. SE only; ignored under --paired-end.
    #[arg(long)]
    bedgraph_strand_split: bool,
    #[arg(long)]
    fragment_density: bool,
    #[arg(long)]
    read_density: bool,
    #[arg(long)]
    fragment_distribution: bool,
    #[arg(long)]
    read_distribution: bool,

    #[arg(long)]
    paired_end: bool,
    #[arg(long)]
    zipped: bool,
    #[arg(long, default_value_t = 40)]
    map_quality: u8,

    /// Fixed read length. Omit together with --read-mean/--read-sd to
    /// sample variable-length reads instead (incompatible with --sam).
    #[arg(long)]
    read_length: Option<u16>,
    #[arg(long, default_value_t = 36.0)]
    read_mean: f64,
    #[arg(long, default_value_t = 4.0)]
    read_sd: f64,
    #[arg(long, default_value_t = 20)]
    read_min: u16,
    #[arg(long, default_value_t = 100)]
    read_max: u16,

    /// Mean/sd of the log-normal fragment-length distribution
    #[arg(long, default_value_t = 200.0)]
    frag_mean: f64,
    #[arg(long, default_value_t = 0.25)]
    frag_sd: f64,

    /// Maximum tolerated 'N' bases per read; unset means no limit
    #[arg(long)]
    n_limit: Option<u32>,

    /// Also emit a control ("_input") twin of every record writer
    /// (FASTQ/BED/SAM), mirroring the same genome walk. Accumulators
    /// (bedgraph/density/distribution) stay shared and see both tracks.
    #[arg(long)]
    control: bool,
    /// Fraction of fragments routed to the control twin instead of the
    /// primary track when --control is set.
    #[arg(long, default_value_t = 0.5)]
    control_fraction: f64,
}

fn build_config(cli: &Cli, cmdline: String) -> std::result::Result<OutputConfig, String> {
    let read_length = match cli.read_length {
        Some(n) => ReadLengthMode::Fixed(n),
        None => ReadLengthMode::Variable {
            mean: cli.read_mean,
            sd: cli.read_sd,
            min: cli.read_min,
            max: cli.read_max,
        },
    };
    if cli.sam && read_length.fixed_len().is_none() {
        return Err("--sam requires a fixed --read-length".to_string());
    }
    Ok(OutputConfig {
        base_name: cli.out.clone(),
        formats: OutputFormats {
            fastq: cli.fastq,
            bed: cli.bed,
            sam: cli.sam,
            bedgraph: cli.bedgraph,
            fragment_density: cli.fragment_density,
            read_density: cli.read_density,
            fragment_distribution: cli.fragment_distribution,
            read_distribution: cli.read_distribution,
        },
        paired_end: cli.paired_end,
        zipped: cli.zipped,
        map_quality: cli.map_quality,
        cmdline,
        tool_name: "chipsim".to_string(),
        tool_version: chipsim_output::VERSION.to_string(),
        quality_pattern_file: None,
        read_name: if cli.paired_end {
            ReadNameMode::PePosition
        } else {
            ReadNameMode::SePosition
        },
        read_length,
        strand_split_bedgraph: cli.bedgraph_strand_split && !cli.paired_end,
        n_limit: cli.n_limit,
        control_twin: false,
        thread_count: cli.threads.max(1),
    })
}

/// Owns every construction-time resource a single worker thread needs;
/// built on the main thread so `std::thread::scope` only has to move
/// already-initialized values into each closure.
struct ThreadResources {
    indices: Vec<usize>,
    fastq1: Option<FastqWriter>,
    fastq2: Option<FastqWriter>,
    bed: Option<BedWriter>,
    sam: Option<SamWriter>,
    control: Option<ControlWriters>,
    rng: SmallRng,
    read_name: ReadNameGenerator,
}

fn main() {
    let cli = Cli::parse();
    let cmdline = std::env::args().collect::<Vec<_>>().join(" ");
    if let Err(e) = run(cli, cmdline) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli, cmdline: String) -> Result<()> {
    let config = build_config(&cli, cmdline.clone()).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    let genome = ChromSizes::from_file(&cli.genome)?;
    if genome.is_empty() {
        eprintln!("error: genome file {} has no chromosomes", cli.genome.display());
        process::exit(1);
    }

    let rlen_for_templates = config.read_length.fixed_len().unwrap_or(cli.read_max);
    let quality = QualityPattern::constant();
    let read_name_root = ReadNameGenerator::new(config.tool_name.clone(), config.read_name);
    let mutex_registry = Arc::new(MutexRegistry::new());

    let mut fastq1_primer = config
        .formats
        .fastq
        .then(|| BlockFile::create(config.suffixed_path(if config.paired_end { "1" } else { "" }, "fq"), config.zipped))
        .transpose()?;
    let mut fastq2_primer = (config.formats.fastq && config.paired_end)
        .then(|| BlockFile::create(config.suffixed_path("2", "fq"), config.zipped))
        .transpose()?;
    let mut bed_primer = config
        .formats
        .bed
        .then(|| BlockFile::create(config.artifact_path("bed"), config.zipped))
        .transpose()?;
    let mut sam_primer = config
        .formats
        .sam
        .then(|| BlockFile::create(config.artifact_path("sam"), config.zipped))
        .transpose()?;

    if let Some(primer) = sam_primer.as_mut() {
        let mut header_writer = SamWriter::new(primer.clone_for_thread(0), config.map_quality, rlen_for_templates, config.paired_end);
        header_writer.write_header(&genome, &config.tool_name, &config.tool_version, &cmdline)?;
        header_writer.close()?;
    }

    let mut control_config = config.clone();
    control_config.control_twin = true;
    let mut fastq1_ctrl_primer = (cli.control && config.formats.fastq)
        .then(|| {
            BlockFile::create(
                control_config.suffixed_path(if config.paired_end { "1" } else { "" }, "fq"),
                config.zipped,
            )
        })
        .transpose()?;
    let mut fastq2_ctrl_primer = (cli.control && config.formats.fastq && config.paired_end)
        .then(|| BlockFile::create(control_config.suffixed_path("2", "fq"), config.zipped))
        .transpose()?;
    let mut bed_ctrl_primer = (cli.control && config.formats.bed)
        .then(|| BlockFile::create(control_config.artifact_path("bed"), config.zipped))
        .transpose()?;
    let mut sam_ctrl_primer = (cli.control && config.formats.sam)
        .then(|| BlockFile::create(control_config.artifact_path("sam"), config.zipped))
        .transpose()?;

    if let Some(primer) = sam_ctrl_primer.as_mut() {
        let mut header_writer = SamWriter::new(primer.clone_for_thread(0), config.map_quality, rlen_for_templates, config.paired_end);
        header_writer.write_header(&genome, &config.tool_name, &config.tool_version, &cmdline)?;
        header_writer.close()?;
    }

    let bedgraph = config
        .formats
        .bedgraph
        .then(|| -> Result<_> {
            let block = BlockFile::create(config.artifact_path("bg"), config.zipped)?;
            Ok(Arc::new(Mutex::new(BedGraphEmitter::new(
                block,
                genome.len(),
                &cmdline,
                &format!("{} actual coverage", config.tool_name),
            )?)))
        })
        .transpose()?;
    let bedgraph_strands = (config.formats.bedgraph && config.strand_split_bedgraph)
        .then(|| -> Result<_> {
            let pos_block = BlockFile::create(config.suffixed_path("pos", "bg"), config.zipped)?;
            let pos = Arc::new(Mutex::new(BedGraphEmitter::new(
                pos_block,
                genome.len(),
                &cmdline,
                &format!("{} actual coverage: positive strand", config.tool_name),
            )?));
            let neg_block = BlockFile::create(config.suffixed_path("neg", "bg"), config.zipped)?;
            let neg = Arc::new(Mutex::new(BedGraphEmitter::new(
                neg_block,
                genome.len(),
                &cmdline,
                &format!("{} actual coverage: negative strand", config.tool_name),
            )?));
            Ok((pos, neg))
        })
        .transpose()?;
    let fragment_density = config
        .formats
        .fragment_density
        .then(|| -> Result<_> {
            let block = BlockFile::create(config.artifact_path("fdens"), config.zipped)?;
            Ok(Arc::new(Mutex::new(WiggleEmitter::new(
                block,
                genome.len(),
                &cmdline,
                &format!("{} frag density", config.tool_name),
            )?)))
        })
        .transpose()?;
    let read_density = config
        .formats
        .read_density
        .then(|| -> Result<_> {
            let block = BlockFile::create(config.artifact_path("rdens"), config.zipped)?;
            Ok(Arc::new(Mutex::new(WiggleEmitter::new(
                block,
                genome.len(),
                &cmdline,
                &format!("{} read density", config.tool_name),
            )?)))
        })
        .transpose()?;
    let distribution = (config.formats.fragment_distribution || config.formats.read_distribution).then(|| {
        let frag_path = config.formats.fragment_distribution.then(|| config.artifact_path("fdist"));
        let read_path = config.formats.read_distribution.then(|| config.artifact_path("rdist"));
        let read_kind = if config.read_length.fixed_len().is_some() {
            DistributionKind::ConstantLength
        } else {
            DistributionKind::ReadNormal
        };
        Arc::new(Mutex::new(DistributionRecorder::new(
            frag_path,
            read_path,
            DistributionKind::FragmentLognormal,
            read_kind,
            Arc::clone(&mutex_registry),
        )))
    });

    let effective = genome.effective_lengths();
    let weights: Vec<u64> = effective.iter().map(|&(_, len)| len.max(1)).collect();
    let assignment = partition(&weights, config.thread_count);
    let total_effective: u64 = weights.iter().sum::<u64>().max(1);

    let resources: Vec<ThreadResources> = assignment
        .subsets
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.indices.is_empty())
        .map(|(i, subset)| ThreadResources {
            indices: subset.indices.clone(),
            fastq1: fastq1_primer.as_ref().map(|p| {
                FastqWriter::new(
                    p.clone_for_thread(i),
                    config.read_length.fixed_len(),
                    if config.paired_end { "/1" } else { "" },
                )
            }),
            fastq2: fastq2_primer
                .as_ref()
                .map(|p| FastqWriter::new(p.clone_for_thread(i), config.read_length.fixed_len(), "/2")),
            bed: bed_primer.as_ref().map(|p| BedWriter::new(p.clone_for_thread(i), config.map_quality)),
            sam: sam_primer
                .as_ref()
                .map(|p| SamWriter::new(p.clone_for_thread(i), config.map_quality, rlen_for_templates, config.paired_end)),
            control: cli.control.then(|| ControlWriters {
                fastq1: fastq1_ctrl_primer.as_ref().map(|p| {
                    FastqWriter::new(
                        p.clone_for_thread(i),
                        config.read_length.fixed_len(),
                        if config.paired_end { "/1" } else { "" },
                    )
                }),
                fastq2: fastq2_ctrl_primer
                    .as_ref()
                    .map(|p| FastqWriter::new(p.clone_for_thread(i), config.read_length.fixed_len(), "/2")),
                bed: bed_ctrl_primer.as_ref().map(|p| BedWriter::new(p.clone_for_thread(i), config.map_quality)),
                sam: sam_ctrl_primer
                    .as_ref()
                    .map(|p| SamWriter::new(p.clone_for_thread(i), config.map_quality, rlen_for_templates, config.paired_end)),
            }),
            rng: SmallRng::seed_from_u64(cli.seed.wrapping_add(i as u64 + 1)),
            read_name: read_name_root.clone_shared(),
        })
        .collect();

    let results: Vec<Result<()>> = std::thread::scope(|scope| {
        let handles: Vec<_> = resources
            .into_iter()
            .map(|res| {
                let genome = &genome;
                let config = &config;
                let effective = &effective;
                let quality = quality.clone();
                let bedgraph = bedgraph.clone();
                let bedgraph_strands = bedgraph_strands.clone();
                let fragment_density = fragment_density.clone();
                let read_density = read_density.clone();
                let distribution = distribution.clone();
                let mutex_registry = Arc::clone(&mutex_registry);
                let total_fragments = cli.fragments;
                let frag_mean = cli.frag_mean;
                let frag_sd = cli.frag_sd;
                let control_fraction = cli.control_fraction;
                scope.spawn(move || -> Result<()> {
                    let mut rng = res.rng;
                    let mut composite = CompositeOutput::new(
                        config.clone(),
                        quality,
                        res.read_name,
                        rng.clone(),
                        res.fastq1,
                        res.fastq2,
                        res.bed,
                        res.sam,
                        bedgraph,
                        bedgraph_strands,
                        fragment_density,
                        read_density,
                        distribution,
                        res.control,
                        mutex_registry,
                    );
                    let lognormal = LogNormal::new(frag_mean.ln(), frag_sd)
                        .unwrap_or_else(|_| LogNormal::new(frag_mean.ln(), 0.1).unwrap());

                    for &idx in &res.indices {
                        let (chrom_id, eff_len) = effective[idx];
                        if eff_len < 64 {
                            continue;
                        }
                        let name = genome.name_of(chrom_id).unwrap_or("?").to_string();
                        let chrom_len = genome.length(chrom_id).unwrap_or(eff_len);
                        let share = (total_fragments as f64 * eff_len as f64 / total_effective as f64).round() as u64;
                        let refseq = ConstantRefSeq::new(b'A', chrom_len as usize);

                        composite.begin_chromosome(chrom_id, &name);
                        for _ in 0..share.max(1) {
                            let sampled: f64 = lognormal.sample(&mut rng);
                            let frag_len = (sampled.round() as u32).clamp(30, (chrom_len as u32).saturating_sub(1).max(30));
                            if frag_len as u64 >= chrom_len {
                                continue;
                            }
                            let max_start = chrom_len - frag_len as u64;
                            let start = rng.gen_range(0..=max_start) as u32;
                            let reverse = rng.gen_bool(0.5);
                            if control_fraction > 0.0 {
                                composite.set_gmode(if rng.gen_bool(control_fraction.clamp(0.0, 1.0)) {
                                    GMode::Control
                                } else {
                                    GMode::Test
                                });
                            }
                            composite.add_read(&refseq, start, frag_len, reverse)?;
                        }
                        composite.end_chromosome()?;
                    }
                    composite.close()?;
                    Ok(())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for r in results {
        r?;
    }

    if let Some(mut primer) = fastq1_primer.take() {
        primer.close()?;
    }
    if let Some(mut primer) = fastq2_primer.take() {
        primer.close()?;
    }
    if let Some(mut primer) = bed_primer.take() {
        primer.close()?;
    }
    if let Some(mut primer) = sam_primer.take() {
        primer.close()?;
    }
    if let Some(mut primer) = fastq1_ctrl_primer.take() {
        primer.close()?;
    }
    if let Some(mut primer) = fastq2_ctrl_primer.take() {
        primer.close()?;
    }
    if let Some(mut primer) = bed_ctrl_primer.take() {
        primer.close()?;
    }
    if let Some(mut primer) = sam_ctrl_primer.take() {
        primer.close()?;
    }
    if let Some(bg) = bedgraph {
        bg.lock().unwrap().close()?;
    }
    if let Some((pos, neg)) = bedgraph_strands {
        pos.lock().unwrap().close()?;
        neg.lock().unwrap().close()?;
    }
    if let Some(fd) = fragment_density {
        fd.lock().unwrap().close()?;
    }
    if let Some(rd) = read_density {
        rd.lock().unwrap().close()?;
    }
    if let Some(dist) = distribution {
        dist.lock().unwrap().flush()?;
    }

    eprintln!("wrote output to {}*", config.base_name.display());
    Ok(())
}
