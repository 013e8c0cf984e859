// mod.rs - Core logic module

pub mod cluster;
pub mod consensus;
pub mod distance;
pub mod matrix;
pub mod pipeline;

// Re-export main types for convenience
pub use cluster::{cluster, ClusterAssignment, UnionFind};
pub use consensus::{
    BaseCall, BaseSet, ConsensusCaller, ConsensusConfig, MalformedKind, MalformedRecord,
    Nucleotide, PositionCall, SampleCallSet,
};
pub use distance::{DistanceConfig, DistanceEngine, DistanceMetric, PairwiseDistance};
pub use matrix::{build_distance_matrix, DistanceMatrix, PairFailure, PairStatus};
pub use pipeline::{InputReport, Pipeline, PipelineConfig, PipelineResult};
