// matrix.rs - Parallel pairwise distance matrix

use crate::core::consensus::SampleCallSet;
use crate::core::distance::{DistanceEngine, DistanceMetric, PairwiseDistance};
use crate::data::candidates::CandidatePairs;
use crate::error::{Result, SnpclustError};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// A pair whose distance could not be computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairFailure {
    pub sample_a: String,
    pub sample_b: String,
    pub reason: String,
}

/// What the matrix knows about a pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PairStatus<'a> {
    Computed(&'a PairwiseDistance),
    /// Not requested by the candidate list; says nothing about the distance
    NotComputed,
    Failed(&'a PairFailure),
}

impl<'a> PairStatus<'a> {
    /// Distance value if computed and valid
    pub fn distance(&self) -> Option<f64> {
        match self {
            PairStatus::Computed(record) => record.distance,
            _ => None,
        }
    }
}

/// Pairwise distances for one run.
///
/// Samples are indexed in lexicographic order and off-diagonal entries are
/// keyed by `(i, j)` with `i < j`. Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    samples: Vec<String>,
    index: HashMap<String, usize>,
    records: BTreeMap<(usize, usize), PairwiseDistance>,
    diagonal: Vec<PairwiseDistance>,
    failures: BTreeMap<(usize, usize), PairFailure>,
    /// Candidate pairs naming a sample outside the matrix
    unresolved: Vec<PairFailure>,
    exhaustive: bool,
    metric: DistanceMetric,
}

impl DistanceMatrix {
    /// Assemble a matrix from precomputed records.
    ///
    /// Every record must name samples from `samples`. The diagonal is left
    /// unknown since no call sets are available.
    pub fn from_records<S, I>(samples: &[S], records: I, metric: DistanceMetric) -> Result<Self>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = PairwiseDistance>,
    {
        let mut samples: Vec<String> = samples.iter().map(|s| s.as_ref().to_string()).collect();
        samples.sort();
        let mut index = HashMap::with_capacity(samples.len());
        for (i, sample) in samples.iter().enumerate() {
            if index.insert(sample.clone(), i).is_some() {
                return Err(SnpclustError::DuplicateSample(sample.clone()));
            }
        }

        let mut stored = BTreeMap::new();
        for record in records {
            let i = *index
                .get(&record.sample_a)
                .ok_or_else(|| SnpclustError::UnknownSample(record.sample_a.clone()))?;
            let j = *index
                .get(&record.sample_b)
                .ok_or_else(|| SnpclustError::UnknownSample(record.sample_b.clone()))?;
            if i == j {
                continue;
            }
            let (sample_a, sample_b) = if i < j {
                (record.sample_a, record.sample_b)
            } else {
                (record.sample_b, record.sample_a)
            };
            stored.insert(
                (i.min(j), i.max(j)),
                PairwiseDistance {
                    sample_a,
                    sample_b,
                    ..record
                },
            );
        }

        let diagonal = samples
            .iter()
            .map(|s| PairwiseDistance {
                sample_a: s.clone(),
                sample_b: s.clone(),
                mismatches: 0,
                shared_sites: 0,
                distance: None,
            })
            .collect();

        Ok(Self {
            samples,
            index,
            records: stored,
            diagonal,
            failures: BTreeMap::new(),
            unresolved: Vec::new(),
            exhaustive: false,
            metric,
        })
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn index_of(&self, sample: &str) -> Option<usize> {
        self.index.get(sample).copied()
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// True when every pair was requested (no candidate restriction)
    pub fn is_exhaustive(&self) -> bool {
        self.exhaustive
    }

    /// Failed pairs in `(i, j)` order, then pairs naming unknown samples
    pub fn failures(&self) -> impl Iterator<Item = &PairFailure> {
        self.failures.values().chain(&self.unresolved)
    }

    pub fn failed_pairs(&self) -> usize {
        self.failures.len() + self.unresolved.len()
    }

    /// Computed off-diagonal records in `(i, j)` order
    pub fn records(&self) -> impl Iterator<Item = (usize, usize, &PairwiseDistance)> {
        self.records.iter().map(|(&(i, j), r)| (i, j, r))
    }

    pub fn computed_pairs(&self) -> usize {
        self.records.len()
    }

    pub fn valid_pairs(&self) -> usize {
        self.records.values().filter(|r| r.is_valid()).count()
    }

    pub fn self_distance(&self, sample: &str) -> Option<&PairwiseDistance> {
        self.index_of(sample).map(|i| &self.diagonal[i])
    }

    /// Status of an unordered pair. Unknown samples read as not computed.
    pub fn get(&self, a: &str, b: &str) -> PairStatus<'_> {
        let (Some(i), Some(j)) = (self.index_of(a), self.index_of(b)) else {
            return PairStatus::NotComputed;
        };
        if i == j {
            return PairStatus::Computed(&self.diagonal[i]);
        }
        let key = (i.min(j), i.max(j));
        if let Some(record) = self.records.get(&key) {
            return PairStatus::Computed(record);
        }
        match self.failures.get(&key) {
            Some(failure) => PairStatus::Failed(failure),
            None => PairStatus::NotComputed,
        }
    }

    /// Dense square view; `None` for invalid, failed or uncomputed pairs
    pub fn to_dense(&self) -> Vec<Vec<Option<f64>>> {
        let n = self.samples.len();
        let mut dense = vec![vec![None; n]; n];
        for (i, row) in dense.iter_mut().enumerate() {
            row[i] = self.diagonal[i].distance;
        }
        for (&(i, j), record) in &self.records {
            dense[i][j] = record.distance;
            dense[j][i] = record.distance;
        }
        dense
    }
}

/// Compute the distance matrix for a set of call sets.
///
/// With `candidates`, only the listed pairs are computed; pairs naming a
/// sample without a call set are recorded as failures. Without it, all
/// C(n,2) pairs are computed. Pairs are independent and evaluated in
/// parallel on the current rayon pool; results are merged once every pair
/// has finished.
pub fn build_distance_matrix(
    call_sets: &[SampleCallSet],
    candidates: Option<&CandidatePairs>,
    engine: &DistanceEngine,
    show_progress: bool,
) -> Result<DistanceMatrix> {
    let mut order: Vec<usize> = (0..call_sets.len()).collect();
    order.sort_by(|&a, &b| call_sets[a].sample_id().cmp(call_sets[b].sample_id()));
    let sets: Vec<&SampleCallSet> = order.iter().map(|&i| &call_sets[i]).collect();

    let mut index = HashMap::with_capacity(sets.len());
    for (i, set) in sets.iter().enumerate() {
        if index.insert(set.sample_id().to_string(), i).is_some() {
            return Err(SnpclustError::DuplicateSample(set.sample_id().to_string()));
        }
    }
    let samples: Vec<String> = sets.iter().map(|s| s.sample_id().to_string()).collect();
    let n_samples = samples.len();

    let mut unresolved = Vec::new();
    let pairs: Vec<(usize, usize)> = match candidates {
        Some(candidates) => {
            let mut pairs = Vec::with_capacity(candidates.len());
            for (a, b) in candidates.iter() {
                match (index.get(a), index.get(b)) {
                    (Some(&i), Some(&j)) => pairs.push((i.min(j), i.max(j))),
                    (ia, _) => {
                        let missing = if ia.is_none() { a } else { b };
                        unresolved.push(PairFailure {
                            sample_a: a.to_string(),
                            sample_b: b.to_string(),
                            reason: SnpclustError::UnknownSample(missing.to_string()).to_string(),
                        });
                    }
                }
            }
            pairs.sort_unstable();
            pairs
        }
        None => (0..n_samples)
            .flat_map(|i| (i + 1..n_samples).map(move |j| (i, j)))
            .collect(),
    };

    let total_comparisons = pairs.len();
    info!(
        "🔄 Computing distance matrix ({} samples, {} pairs{})...",
        n_samples,
        total_comparisons,
        if candidates.is_some() { ", candidate-restricted" } else { "" }
    );
    let start = Instant::now();

    let pb = if show_progress {
        let pb = ProgressBar::new(total_comparisons as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {per_sec} ETA: {eta}",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    } else {
        ProgressBar::hidden()
    };

    // Progress tracking with reduced contention
    let update_interval = std::cmp::max(1, total_comparisons / 100);
    let progress_counter = AtomicUsize::new(0);

    let results: Vec<((usize, usize), Result<PairwiseDistance>)> = pairs
        .par_iter()
        .map(|&(i, j)| {
            let result = engine.distance(sets[i], sets[j]);
            let count = progress_counter.fetch_add(1, Ordering::Relaxed) + 1;
            if count % update_interval == 0 {
                pb.set_position(count as u64);
            }
            ((i, j), result)
        })
        .collect();

    pb.finish_and_clear();

    let mut records = BTreeMap::new();
    let mut failures = BTreeMap::new();
    for ((i, j), result) in results {
        match result {
            Ok(record) => {
                records.insert((i, j), record);
            }
            Err(e) => {
                failures.insert(
                    (i, j),
                    PairFailure {
                        sample_a: samples[i].clone(),
                        sample_b: samples[j].clone(),
                        reason: e.to_string(),
                    },
                );
            }
        }
    }

    let diagonal = sets.iter().map(|s| engine.self_distance(s)).collect();

    let matrix = DistanceMatrix {
        samples,
        index,
        records,
        diagonal,
        failures,
        unresolved,
        exhaustive: candidates.is_none(),
        metric: engine.config().metric,
    };

    if matrix.failed_pairs() > 0 {
        warn!(
            "⚠️  {} pairs could not be computed and are excluded from the matrix",
            matrix.failed_pairs()
        );
    }
    info!(
        "✅ Distance matrix computed in {:.2}s ({} pairs, {} valid)",
        start.elapsed().as_secs_f64(),
        matrix.computed_pairs(),
        matrix.valid_pairs()
    );

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::consensus::{ConsensusCaller, ConsensusConfig};
    use crate::core::distance::DistanceConfig;
    use crate::data::pileup::{PileupEntry, Strand};

    fn call_set(sample: &str, length: u64, seq: &[u8]) -> SampleCallSet {
        let mut entries = Vec::new();
        for (coordinate, &base) in seq.iter().enumerate() {
            if base == b'-' {
                continue;
            }
            for r in 0..6 {
                entries.push(PileupEntry {
                    coordinate: coordinate as u64,
                    base,
                    quality: 30,
                    read_id: format!("r{}", r),
                    strand: if r % 2 == 0 { Strand::Forward } else { Strand::Reverse },
                });
            }
        }
        ConsensusCaller::new(ConsensusConfig::default(), length).call(sample, &entries)
    }

    fn engine() -> DistanceEngine {
        DistanceEngine::new(DistanceConfig {
            min_overlap: 2,
            metric: DistanceMetric::Snps,
        })
    }

    #[test]
    fn test_all_pairs_computed_and_sorted() {
        let sets = vec![
            call_set("c", 4, b"ACGT"),
            call_set("a", 4, b"ACGA"),
            call_set("b", 4, b"TCGT"),
        ];
        let matrix = build_distance_matrix(&sets, None, &engine(), false).unwrap();
        assert_eq!(matrix.samples(), &["a", "b", "c"]);
        assert!(matrix.is_exhaustive());
        assert_eq!(matrix.computed_pairs(), 3);
        assert_eq!(matrix.get("a", "c").distance(), Some(1.0));
        assert_eq!(matrix.get("c", "a").distance(), Some(1.0));
        assert_eq!(matrix.get("a", "b").distance(), Some(2.0));
        assert_eq!(matrix.get("b", "b").distance(), Some(0.0));
    }

    #[test]
    fn test_candidates_restrict_computation() {
        let sets = vec![
            call_set("a", 4, b"ACGT"),
            call_set("b", 4, b"ACGT"),
            call_set("c", 4, b"ACGT"),
        ];
        let candidates: CandidatePairs = vec![("b", "a")].into_iter().collect();
        let matrix = build_distance_matrix(&sets, Some(&candidates), &engine(), false).unwrap();
        assert!(!matrix.is_exhaustive());
        assert_eq!(matrix.computed_pairs(), 1);
        assert_eq!(matrix.get("a", "b").distance(), Some(0.0));
        assert_eq!(matrix.get("a", "c"), PairStatus::NotComputed);
        let dense = matrix.to_dense();
        assert_eq!(dense[0][2], None);
        assert_eq!(dense[1][0], Some(0.0));
    }

    #[test]
    fn test_unknown_candidate_and_bad_pair_are_failures() {
        let sets = vec![
            call_set("a", 4, b"ACGT"),
            call_set("b", 4, b"ACGT"),
            call_set("long", 8, b"ACGTACGT"),
        ];
        let candidates: CandidatePairs =
            vec![("a", "b"), ("a", "ghost"), ("a", "long")].into_iter().collect();
        let matrix = build_distance_matrix(&sets, Some(&candidates), &engine(), false).unwrap();
        assert_eq!(matrix.computed_pairs(), 1);
        assert_eq!(matrix.failed_pairs(), 2);
        match matrix.get("long", "a") {
            PairStatus::Failed(failure) => {
                assert_eq!(failure.sample_a, "a");
                assert_eq!(failure.sample_b, "long");
            }
            other => panic!("expected a failed pair, got {:?}", other),
        }
        assert_eq!(matrix.get("a", "ghost"), PairStatus::NotComputed);
        let reasons: Vec<&str> = matrix.failures().map(|f| f.reason.as_str()).collect();
        assert_eq!(reasons.len(), 2);
        assert!(reasons[1].contains("ghost"));
    }

    #[test]
    fn test_duplicate_sample_is_rejected() {
        let sets = vec![call_set("a", 4, b"ACGT"), call_set("a", 4, b"ACGT")];
        let err = build_distance_matrix(&sets, None, &engine(), false).unwrap_err();
        assert!(matches!(err, SnpclustError::DuplicateSample(_)));
    }

    #[test]
    fn test_invalid_pairs_stay_unknown() {
        let sets = vec![call_set("a", 4, b"A---"), call_set("b", 4, b"A---")];
        let matrix = build_distance_matrix(&sets, None, &engine(), false).unwrap();
        match matrix.get("a", "b") {
            PairStatus::Computed(record) => {
                assert!(!record.is_valid());
                assert_eq!(record.shared_sites, 1);
            }
            other => panic!("expected computed record, got {:?}", other),
        }
        assert_eq!(matrix.valid_pairs(), 0);
    }
}
