// lib.rs - snpclust library root

//! # snpclust - SNP distances and transmission clusters from read pileups
//!
//! Per-sample read pileups (aligned against a shared reference) are turned
//! into consensus calls, compared pairwise over the positions both samples
//! call confidently, and grouped into single-linkage clusters under a
//! distance threshold.
//!
//! ## Features
//!
//! - **Conservative consensus**: quality-weighted majority calls with depth,
//!   fraction and strand filters; near-ties become IUPAC ambiguity codes
//! - **Coverage-aware distances**: pairs with too little shared coverage are
//!   reported as unknown, never as zero
//! - **Explicit metric**: proportion of differing sites or raw SNP count,
//!   chosen once per run
//! - **Candidate pairs**: optionally compute only the pairs an external
//!   pre-filter nominated
//! - **Parallel**: consensus calling and pair comparisons run on rayon
//! - **Multiple formats**: TSV, CSV, PHYLIP, NEXUS matrices plus pair, cluster,
//!   FASTA and JSON reports
//! - **Sampling dates**: optional per-sample dates add the day gap to each
//!   reported pair
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use snpclust::prelude::*;
//!
//! let reference = Reference::from_fasta(std::path::Path::new("reference.fasta"))?;
//! let pileups = load_pileup_tsv(std::path::Path::new("pileup.tsv"), &reference, None)?;
//!
//! let pipeline = Pipeline::new(PipelineConfig {
//!     threshold: 0.0005,
//!     ..PipelineConfig::default()
//! })?;
//! let result = pipeline.run(&pileups, reference.total_length(), None)?;
//!
//! for (id, members) in result.clusters.clusters() {
//!     println!("cluster {}: {}", id, members.join(", "));
//! }
//! # Ok::<(), snpclust::SnpclustError>(())
//! ```

pub mod cli;
pub mod core;
pub mod data;
pub mod error;
pub mod output;

// Convenience prelude for common imports
pub mod prelude {
    pub use crate::core::{
        build_distance_matrix, cluster, ClusterAssignment, ConsensusCaller, ConsensusConfig,
        DistanceConfig, DistanceEngine, DistanceMatrix, DistanceMetric, PairStatus,
        PairwiseDistance, Pipeline, PipelineConfig, PipelineResult, SampleCallSet,
    };
    pub use crate::data::loaders::{load_candidate_pairs, load_pileup_tsv, load_sample_dates};
    pub use crate::data::{
        CandidatePairs, PileupEntry, PileupSet, Reference, SampleDates, SamplePileup, Strand,
    };
    pub use crate::error::{Result, SnpclustError};
    pub use crate::output::{write_matrix, MatrixFormat};
}

// Re-export main types at the root level for convenience
pub use crate::core::{DistanceMatrix, DistanceMetric, Pipeline, PipelineConfig, PipelineResult};
pub use error::{Result, SnpclustError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn get_info() -> String {
    format!(
        "snpclust v{} - SNP distance clustering for outbreak surveillance",
        VERSION
    )
}
