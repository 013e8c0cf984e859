// mod.rs - Data structures module

pub mod candidates;
pub mod loaders;
pub mod metadata;
pub mod pileup;
pub mod reference;

// Re-export main types for convenience
pub use candidates::CandidatePairs;
pub use metadata::SampleDates;
pub use pileup::{PileupEntry, PileupSet, SamplePileup, Strand};
pub use reference::{Contig, Reference};
