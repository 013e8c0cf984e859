//! Property-based tests using proptest.
//!
//! Samples are random strings over `ACGT-` on a short reference, where `-`
//! means no reads at that position. A few positions also get a second,
//! conflicting base so ambiguous calls and no-calls show up.

use proptest::prelude::*;

use snpclust::core::{
    cluster, ConsensusCaller, ConsensusConfig, DistanceConfig, DistanceEngine, DistanceMetric,
    Pipeline, PipelineConfig, SampleCallSet,
};
use snpclust::data::{PileupEntry, PileupSet, SamplePileup, Strand};

const LENGTH: usize = 40;

fn entries_for(sample: &str, sequence: &[u8], noisy: &[bool]) -> Vec<PileupEntry> {
    let mut entries = Vec::new();
    for (coordinate, (&base, &noise)) in sequence.iter().zip(noisy).enumerate() {
        if base == b'-' {
            continue;
        }
        for r in 0..6 {
            // noisy columns carry a 50/50 split between two bases
            let called = if noise && r % 2 == 1 {
                if base == b'A' { b'C' } else { b'A' }
            } else {
                base
            };
            entries.push(PileupEntry {
                coordinate: coordinate as u64,
                base: called,
                quality: 20 + r as u8,
                read_id: format!("{}:{}:{}", sample, coordinate, r),
                strand: if r < 3 { Strand::Forward } else { Strand::Reverse },
            });
        }
    }
    entries
}

fn sample_strategy() -> impl Strategy<Value = (Vec<u8>, Vec<bool>)> {
    (
        prop::collection::vec(prop::sample::select(b"ACGT-".to_vec()), LENGTH),
        prop::collection::vec(prop::bool::weighted(0.15), LENGTH),
    )
}

fn call_set(name: &str, sample: &(Vec<u8>, Vec<bool>)) -> SampleCallSet {
    let entries = entries_for(name, &sample.0, &sample.1);
    ConsensusCaller::new(ConsensusConfig::default(), LENGTH as u64).call(name, &entries)
}

fn pileup_set(samples: &[(Vec<u8>, Vec<bool>)]) -> PileupSet {
    PileupSet {
        samples: samples
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let name = format!("sample{:02}", i);
                SamplePileup {
                    entries: entries_for(&name, &s.0, &s.1),
                    sample_id: name,
                }
            })
            .collect(),
        ..PileupSet::default()
    }
}

fn pipeline(min_overlap: usize, threshold: f64) -> Pipeline {
    Pipeline::new(PipelineConfig {
        distance: DistanceConfig {
            min_overlap,
            metric: DistanceMetric::Snps,
        },
        threshold,
        workers: Some(2),
        ..PipelineConfig::default()
    })
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_distance_is_symmetric(
        a in sample_strategy(),
        b in sample_strategy(),
        min_overlap in 1usize..20,
    ) {
        let (x, y) = (call_set("x", &a), call_set("y", &b));
        for metric in [DistanceMetric::Proportion, DistanceMetric::Snps] {
            let engine = DistanceEngine::new(DistanceConfig { min_overlap, metric });
            prop_assert_eq!(engine.distance(&x, &y).unwrap(), engine.distance(&y, &x).unwrap());
        }
    }

    #[test]
    fn prop_self_distance_is_zero_when_called(a in sample_strategy()) {
        let set = call_set("x", &a);
        let engine = DistanceEngine::new(DistanceConfig::default());
        let record = engine.self_distance(&set);
        if set.confident_sites() > 0 {
            prop_assert_eq!(record.distance, Some(0.0));
        } else {
            prop_assert!(!record.is_valid());
        }
    }

    #[test]
    fn prop_distance_to_itself_is_zero_when_called(
        a in sample_strategy(),
        min_overlap in 1usize..(LENGTH + 5),
    ) {
        let set = call_set("x", &a);
        for metric in [DistanceMetric::Proportion, DistanceMetric::Snps] {
            let engine = DistanceEngine::new(DistanceConfig { min_overlap, metric });
            let record = engine.distance(&set, &set).unwrap();
            prop_assert_eq!(record.mismatches, 0);
            if set.confident_sites() > 0 {
                prop_assert_eq!(record.distance, Some(0.0));
            } else {
                prop_assert!(!record.is_valid());
            }
        }
    }

    #[test]
    fn prop_low_overlap_is_never_a_distance(
        a in sample_strategy(),
        b in sample_strategy(),
        min_overlap in 1usize..(LENGTH + 5),
    ) {
        let engine = DistanceEngine::new(DistanceConfig {
            min_overlap,
            metric: DistanceMetric::Proportion,
        });
        let record = engine.distance(&call_set("x", &a), &call_set("y", &b)).unwrap();
        prop_assert!(record.mismatches <= record.shared_sites);
        if record.shared_sites < min_overlap {
            prop_assert_eq!(record.distance, None);
        } else {
            let d = record.distance.unwrap();
            prop_assert!((0.0..=1.0).contains(&d));
        }
    }

    #[test]
    fn prop_consensus_ignores_input_order(a in sample_strategy(), rotate in 0usize..200) {
        let entries = entries_for("x", &a.0, &a.1);
        let caller = ConsensusCaller::new(ConsensusConfig::default(), LENGTH as u64);
        let mut shuffled = entries.clone();
        shuffled.reverse();
        if !shuffled.is_empty() {
            let k = rotate % shuffled.len();
            shuffled.rotate_left(k);
        }
        prop_assert_eq!(caller.call("x", &entries), caller.call("x", &shuffled));
    }

    #[test]
    fn prop_clusters_only_merge_as_threshold_grows(
        samples in prop::collection::vec(sample_strategy(), 2..7),
        t1 in 0.0f64..10.0,
        step in 0.0f64..10.0,
    ) {
        let set = pileup_set(&samples);
        let result = pipeline(5, t1).run(&set, LENGTH as u64, None).unwrap();
        let low = cluster(&result.matrix, t1);
        let high = cluster(&result.matrix, t1 + step);

        let ids: Vec<&str> = result.matrix.samples().iter().map(String::as_str).collect();
        for a in &ids {
            for b in &ids {
                if low.cluster_of(a) == low.cluster_of(b) {
                    prop_assert_eq!(high.cluster_of(a), high.cluster_of(b));
                }
            }
        }
        prop_assert!(high.n_clusters() <= low.n_clusters());
    }

    #[test]
    fn prop_pipeline_is_idempotent(
        samples in prop::collection::vec(sample_strategy(), 1..6),
        threshold in 0.0f64..5.0,
    ) {
        let set = pileup_set(&samples);
        let p = pipeline(3, threshold);
        let first = p.run(&set, LENGTH as u64, None).unwrap();
        let second = p.run(&set, LENGTH as u64, None).unwrap();

        prop_assert_eq!(first.matrix.to_dense(), second.matrix.to_dense());
        let first_records: Vec<_> = first.matrix.records().collect();
        let second_records: Vec<_> = second.matrix.records().collect();
        prop_assert_eq!(first_records, second_records);
        prop_assert_eq!(first.clusters, second.clusters);
        prop_assert_eq!(first.call_sets, second.call_sets);
    }
}
