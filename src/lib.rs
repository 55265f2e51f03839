// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::type_complexity)]

//! Multi-format, multi-threaded output engine for a ChIP-seq read
//! simulator.
//!
//! Given a stream of simulated fragments, partitioned by chromosome
//! across worker threads, this crate emits any combination of FASTQ,
//! BED, SAM, bedgraph coverage, wiggle density, and fragment/read-length
//! distribution reports, keeping chromosome-ordered artifacts correct
//! regardless of which worker finishes first.
//!
//! # Example
//!
//! ```rust,no_run
//! use chipsim_output::composite::{CompositeOutput, ConstantRefSeq};
//! use chipsim_output::config::{OutputConfig, OutputFormats, ReadLengthMode};
//! use chipsim_output::readname::ReadNameMode;
//!
//! let config = OutputConfig {
//!     base_name: "run1".into(),
//!     formats: OutputFormats { bed: true, ..Default::default() },
//!     paired_end: false,
//!     zipped: false,
//!     map_quality: 40,
//!     cmdline: "sim --seed 1".into(),
//!     tool_name: "sim".into(),
//!     tool_version: "0.1".into(),
//!     quality_pattern_file: None,
//!     read_name: ReadNameMode::SePosition,
//!     read_length: ReadLengthMode::Fixed(100),
//!     strand_split_bedgraph: false,
//!     n_limit: None,
//!     control_twin: false,
//!     thread_count: 1,
//! };
//! let _refseq = ConstantRefSeq::new(b'A', 1000);
//! let _ = config;
//! ```

pub mod bedgraph;
pub mod blockfile;
pub mod composite;
pub mod config;
pub mod coverage;
pub mod density;
pub mod distribution;
pub mod error;
pub mod fragment;
pub mod genome;
pub mod linebuf;
pub mod mutex_registry;
pub mod ncheck;
pub mod ordered_emitter;
pub mod partition;
pub mod quality;
pub mod readname;
pub mod wiggle;
pub mod writers;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bedgraph::BedGraphEmitter;
    pub use crate::blockfile::BlockFile;
    pub use crate::composite::{CompositeOutput, ConstantRefSeq, RefSeq};
    pub use crate::config::{OutputConfig, OutputFormats, ReadLengthMode};
    pub use crate::distribution::DistributionRecorder;
    pub use crate::error::{AddReadOutcome, OutputError, Result};
    pub use crate::fragment::{Fragment, Read, Strand};
    pub use crate::genome::{ChromId, ChromSizes};
    pub use crate::mutex_registry::MutexRegistry;
    pub use crate::quality::QualityPattern;
    pub use crate::readname::{ReadNameGenerator, ReadNameMode};
    pub use crate::wiggle::WiggleEmitter;
    pub use crate::writers::{BedWriter, FastqWriter, SamWriter};
}
