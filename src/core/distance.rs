// distance.rs - Pairwise distance between two consensus call sets

use crate::core::consensus::SampleCallSet;
use crate::error::{Result, SnpclustError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// How mismatches are turned into a distance value.
///
/// One metric is used for a whole run, and the clustering threshold is
/// read in the same unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// mismatches / shared sites, in [0, 1]
    #[default]
    Proportion,
    /// Raw mismatch count
    Snps,
}

impl FromStr for DistanceMetric {
    type Err = SnpclustError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "proportion" | "p" | "fraction" => Ok(DistanceMetric::Proportion),
            "snps" | "snp" | "count" => Ok(DistanceMetric::Snps),
            _ => Err(SnpclustError::config(format!(
                "Invalid distance metric: {}. Use: proportion, snps",
                s
            ))),
        }
    }
}

impl DistanceMetric {
    pub fn description(&self) -> &str {
        match self {
            DistanceMetric::Proportion => "mismatches / shared confident sites",
            DistanceMetric::Snps => "raw SNP count over shared confident sites",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DistanceMetric::Proportion => "proportion",
            DistanceMetric::Snps => "snps",
        }
    }

    fn apply(&self, mismatches: usize, shared_sites: usize) -> f64 {
        match self {
            DistanceMetric::Proportion => mismatches as f64 / shared_sites as f64,
            DistanceMetric::Snps => mismatches as f64,
        }
    }
}

/// Settings for the distance engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceConfig {
    /// Shared confident sites needed for a valid distance
    pub min_overlap: usize,
    pub metric: DistanceMetric,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            min_overlap: 100,
            metric: DistanceMetric::Proportion,
        }
    }
}

impl DistanceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_overlap == 0 {
            return Err(SnpclustError::config("min_overlap must be at least 1"));
        }
        Ok(())
    }
}

/// Distance for one unordered sample pair.
///
/// `sample_a` is always the lexicographically smaller id. `distance` is
/// `None` when the pair shares fewer confident sites than the configured
/// minimum: the distance is then unknown, neither small nor large.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseDistance {
    pub sample_a: String,
    pub sample_b: String,
    pub mismatches: usize,
    pub shared_sites: usize,
    pub distance: Option<f64>,
}

impl PairwiseDistance {
    pub fn is_valid(&self) -> bool {
        self.distance.is_some()
    }

    /// Valid and within the threshold (inclusive)
    pub fn links_at(&self, threshold: f64) -> bool {
        matches!(self.distance, Some(d) if d <= threshold)
    }
}

/// Compares call sets under one [`DistanceConfig`]
#[derive(Debug, Clone)]
pub struct DistanceEngine {
    config: DistanceConfig,
}

impl DistanceEngine {
    pub fn new(config: DistanceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DistanceConfig {
        &self.config
    }

    /// Distance between two samples.
    ///
    /// Only positions where both samples carry a single-base call are
    /// counted; ambiguous and no-call positions are excluded on either side.
    /// Fails only if the call sets were built on different references.
    /// A sample compared with itself gets [`DistanceEngine::self_distance`].
    pub fn distance(&self, a: &SampleCallSet, b: &SampleCallSet) -> Result<PairwiseDistance> {
        // canonical order keeps the record identical for (a, b) and (b, a)
        let (a, b) = if a.sample_id() <= b.sample_id() { (a, b) } else { (b, a) };

        if a.reference_length() != b.reference_length() {
            return Err(SnpclustError::CallSetMismatch {
                sample_a: a.sample_id().to_string(),
                length_a: a.reference_length(),
                sample_b: b.sample_id().to_string(),
                length_b: b.reference_length(),
            });
        }

        // min_overlap does not apply to the diagonal
        if a.sample_id() == b.sample_id() {
            return Ok(self.self_distance(a));
        }

        let (mismatches, shared_sites) = compare_calls(a, b);
        let distance = (shared_sites >= self.config.min_overlap)
            .then(|| self.config.metric.apply(mismatches, shared_sites));

        Ok(PairwiseDistance {
            sample_a: a.sample_id().to_string(),
            sample_b: b.sample_id().to_string(),
            mismatches,
            shared_sites,
            distance,
        })
    }

    /// Distance of a sample to itself: zero, valid whenever the sample has
    /// at least one confident call
    pub fn self_distance(&self, set: &SampleCallSet) -> PairwiseDistance {
        let shared_sites = set.confident_sites();
        PairwiseDistance {
            sample_a: set.sample_id().to_string(),
            sample_b: set.sample_id().to_string(),
            mismatches: 0,
            shared_sites,
            distance: (shared_sites > 0).then_some(0.0),
        }
    }
}

/// Merge-join two coordinate-sorted call lists.
/// Returns (mismatches, shared confident sites).
fn compare_calls(a: &SampleCallSet, b: &SampleCallSet) -> (usize, usize) {
    let (xs, ys) = (a.calls(), b.calls());
    let (mut i, mut j) = (0, 0);
    let mut mismatches = 0;
    let mut shared = 0;

    while i < xs.len() && j < ys.len() {
        match xs[i].coordinate.cmp(&ys[j].coordinate) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                if let (Some(x), Some(y)) = (xs[i].call.confident_base(), ys[j].call.confident_base()) {
                    shared += 1;
                    if x != y {
                        mismatches += 1;
                    }
                }
                i += 1;
                j += 1;
            }
        }
    }

    (mismatches, shared)
}
