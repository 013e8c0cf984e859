// mod.rs - File loaders for pileups, candidate pairs and sample metadata

pub mod csv;
pub mod tsv;

pub use self::csv::load_sample_dates;
pub use self::tsv::{load_candidate_pairs, load_pileup_tsv};
