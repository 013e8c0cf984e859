//! End-to-end behaviour of the pipeline on small synthetic outbreaks.
//!
//! Pileups are generated directly so each test controls exactly which
//! positions every sample calls and with which base.

use snpclust::core::{
    DistanceConfig, DistanceMetric, PairStatus, Pipeline, PipelineConfig, PipelineResult,
};
use snpclust::data::loaders::{load_candidate_pairs, load_pileup_tsv, load_sample_dates};
use snpclust::data::{CandidatePairs, PileupEntry, PileupSet, Reference, Strand};
use snpclust::output::{write_clusters, write_matrix, write_pairs, MatrixFormat};
use std::collections::HashSet;
use std::io::Write;

const READS_PER_SITE: usize = 6;

/// Six agreeing high-quality reads, both strands, at every listed site
fn sample_records(sample: &str, sites: &[(u64, u8)]) -> Vec<(String, PileupEntry)> {
    let mut records = Vec::new();
    for &(coordinate, base) in sites {
        for r in 0..READS_PER_SITE {
            records.push((
                sample.to_string(),
                PileupEntry {
                    coordinate,
                    base,
                    quality: 35,
                    read_id: format!("{}_read{}_{}", sample, coordinate, r),
                    strand: if r % 2 == 0 { Strand::Forward } else { Strand::Reverse },
                },
            ));
        }
    }
    records
}

fn uniform(range: std::ops::Range<u64>, base: u8) -> Vec<(u64, u8)> {
    range.map(|c| (c, base)).collect()
}

fn with_snps(mut sites: Vec<(u64, u8)>, snps: &[u64]) -> Vec<(u64, u8)> {
    for site in sites.iter_mut() {
        if snps.contains(&site.0) {
            site.1 = if site.1 == b'T' { b'G' } else { b'T' };
        }
    }
    sites
}

fn pileups(samples: Vec<(&str, Vec<(u64, u8)>)>) -> PileupSet {
    let records = samples
        .into_iter()
        .flat_map(|(sample, sites)| sample_records(sample, &sites));
    PileupSet::from_records(records, None)
}

fn config(min_overlap: usize, metric: DistanceMetric, threshold: f64) -> PipelineConfig {
    PipelineConfig {
        distance: DistanceConfig { min_overlap, metric },
        threshold,
        workers: Some(4),
        ..PipelineConfig::default()
    }
}

fn run(set: &PileupSet, length: u64, config: PipelineConfig) -> PipelineResult {
    Pipeline::new(config).unwrap().run(set, length, None).unwrap()
}

#[test]
fn identical_samples_cluster_at_zero() {
    let sites = uniform(0..1000, b'A');
    let set = pileups(vec![("s1", sites.clone()), ("s2", sites)]);
    let result = run(&set, 1000, config(100, DistanceMetric::Proportion, 0.0));

    match result.matrix.get("s1", "s2") {
        PairStatus::Computed(record) => {
            assert_eq!(record.distance, Some(0.0));
            assert_eq!(record.shared_sites, 1000);
        }
        other => panic!("expected a computed pair, got {:?}", other),
    }
    assert_eq!(result.clusters.n_clusters(), 1);

    // every pair was compared, so the table makes no restriction note
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clusters.tsv");
    write_clusters(&path, &result.clusters, "test").unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(result.clusters.is_exhaustive());
    assert!(!text.contains("candidate-restricted"));
    assert!(text.contains("s1\t1\ns2\t1\n"));
}

#[test]
fn five_snps_in_a_thousand_sites() {
    let base = uniform(0..1000, b'C');
    let set = pileups(vec![
        ("s1", base.clone()),
        ("s2", with_snps(base, &[3, 150, 400, 401, 999])),
    ]);

    let linked = run(&set, 1000, config(100, DistanceMetric::Proportion, 0.01));
    assert_eq!(linked.matrix.get("s1", "s2").distance(), Some(0.005));
    assert_eq!(linked.clusters.cluster_of("s2"), Some(1));

    let split = run(&set, 1000, config(100, DistanceMetric::Proportion, 0.001));
    assert_eq!(split.clusters.n_clusters(), 2);

    let snps = run(&set, 1000, config(100, DistanceMetric::Snps, 5.0));
    assert_eq!(snps.matrix.get("s2", "s1").distance(), Some(5.0));
    assert_eq!(snps.clusters.n_clusters(), 1);
}

#[test]
fn low_overlap_is_unknown_not_close() {
    let set = pileups(vec![
        ("s1", uniform(0..3, b'G')),
        ("s2", uniform(0..3, b'G')),
    ]);
    let result = run(&set, 100, config(10, DistanceMetric::Proportion, 1.0));

    match result.matrix.get("s1", "s2") {
        PairStatus::Computed(record) => {
            assert!(!record.is_valid());
            assert_eq!(record.shared_sites, 3);
            assert_eq!(record.mismatches, 0);
        }
        other => panic!("expected a computed pair, got {:?}", other),
    }
    assert_eq!(result.clusters.n_clusters(), 2);
}

#[test]
fn single_linkage_chains_distant_samples() {
    // A and B share 0..100, B and C share 100..200, A and C share 200..300
    let ab = uniform(0..100, b'A');
    let bc = uniform(100..200, b'A');
    let ac = uniform(200..300, b'A');

    let a: Vec<(u64, u8)> = ab.iter().chain(&ac).copied().collect();
    let b: Vec<(u64, u8)> = with_snps(ab.clone(), &[10]).into_iter().chain(bc.clone()).collect();
    let c_far: Vec<(u64, u8)> = with_snps(ac.clone(), &(200..250).collect::<Vec<u64>>());
    let c: Vec<(u64, u8)> = with_snps(bc, &[150]).into_iter().chain(c_far).collect();

    let set = pileups(vec![("A", a), ("B", b), ("C", c)]);
    let result = run(&set, 300, config(50, DistanceMetric::Proportion, 0.01));

    assert_eq!(result.matrix.get("A", "B").distance(), Some(0.01));
    assert_eq!(result.matrix.get("B", "C").distance(), Some(0.01));
    assert_eq!(result.matrix.get("A", "C").distance(), Some(0.5));
    assert_eq!(result.clusters.n_clusters(), 1);
    assert_eq!(result.clusters.members(1), Some(vec!["A", "B", "C"]));
}

#[test]
fn sample_without_data_is_a_singleton() {
    let roster: HashSet<String> = ["s1", "s2", "empty"].iter().map(|s| s.to_string()).collect();
    let records = sample_records("s1", &uniform(0..200, b'T'))
        .into_iter()
        .chain(sample_records("s2", &uniform(0..200, b'T')));
    let set = PileupSet::from_records(records, Some(&roster));

    let result = run(&set, 200, config(100, DistanceMetric::Proportion, 0.001));
    let empty = &result.call_sets[0];
    assert_eq!(empty.sample_id(), "empty");
    assert_eq!(empty.confident_sites(), 0);
    assert_eq!(result.report.empty_samples, 1);

    assert_eq!(result.matrix.get("empty", "s1").distance(), None);
    assert_eq!(result.matrix.get("empty", "s2").distance(), None);
    assert_eq!(result.matrix.self_distance("empty").and_then(|d| d.distance), None);
    assert_eq!(result.clusters.cluster_of("empty"), Some(1));
    assert_eq!(result.clusters.members(1), Some(vec!["empty"]));
    assert_eq!(result.clusters.cluster_of("s1"), result.clusters.cluster_of("s2"));
}

#[test]
fn candidate_pairs_leave_others_not_computed() {
    let sites = uniform(0..150, b'A');
    let set = pileups(vec![
        ("a", sites.clone()),
        ("b", sites.clone()),
        ("c", sites),
    ]);
    let candidates: CandidatePairs = vec![("a", "b"), ("c", "ghost")].into_iter().collect();
    let result = Pipeline::new(config(100, DistanceMetric::Proportion, 0.0))
        .unwrap()
        .run(&set, 150, Some(&candidates))
        .unwrap();

    assert_eq!(result.matrix.get("a", "c"), PairStatus::NotComputed);
    assert!(matches!(result.matrix.get("c", "ghost"), PairStatus::NotComputed));
    assert_eq!(result.matrix.failed_pairs(), 1);
    // c was never compared, so it stays on its own
    assert_eq!(result.clusters.n_clusters(), 2);
    assert_eq!(result.clusters.cluster_of("c"), Some(2));
}

#[test]
fn files_in_files_out() {
    let dir = tempfile::tempdir().unwrap();

    let reference_path = dir.path().join("ref.fasta");
    let mut reference_file = std::fs::File::create(&reference_path).unwrap();
    writeln!(reference_file, ">chr").unwrap();
    writeln!(reference_file, "{}", "A".repeat(120)).unwrap();
    writeln!(reference_file, ">plasmid").unwrap();
    writeln!(reference_file, "{}", "C".repeat(30)).unwrap();
    drop(reference_file);

    let pileup_path = dir.path().join("pileup.tsv");
    let mut pileup_file = std::fs::File::create(&pileup_path).unwrap();
    writeln!(pileup_file, "sample\tcontig\tpos\tbase\tqual\tread_id\tstrand").unwrap();
    for sample in ["s1", "s2", "s3"] {
        for (contig, length) in [("chr", 120u64), ("plasmid", 30)] {
            for pos in 1..=length {
                let base = match (sample, contig, pos) {
                    ("s2", "plasmid", 7) => 'G',
                    ("s3", "chr", p) if p <= 60 => 'T',
                    (_, "chr", _) => 'A',
                    _ => 'C',
                };
                for r in 0..5 {
                    let strand = if r % 2 == 0 { '+' } else { '-' };
                    writeln!(pileup_file, "{}\t{}\t{}\t{}\t30\t{}_{}\t{}", sample, contig, pos, base, contig, r, strand)
                        .unwrap();
                }
            }
        }
    }
    drop(pileup_file);

    let pairs_path = dir.path().join("candidates.txt");
    std::fs::write(&pairs_path, "s1\ts2\ns2 s3\n").unwrap();

    let reference = Reference::from_fasta(&reference_path).unwrap();
    assert_eq!(reference.total_length(), 150);
    let set = load_pileup_tsv(&pileup_path, &reference, None).unwrap();
    assert_eq!(set.rejected_records, 0);
    let candidates = load_candidate_pairs(&pairs_path).unwrap();

    let result = Pipeline::new(config(100, DistanceMetric::Snps, 1.0))
        .unwrap()
        .run(&set, reference.total_length(), Some(&candidates))
        .unwrap();
    assert_eq!(result.matrix.get("s1", "s2").distance(), Some(1.0));
    assert_eq!(result.matrix.get("s2", "s3").distance(), Some(61.0));
    assert_eq!(result.clusters.cluster_of("s3"), Some(2));

    let matrix_path = dir.path().join("out").join("matrix.tsv");
    write_matrix(&matrix_path, MatrixFormat::Tsv, &result.matrix, "test").unwrap();
    let text = std::fs::read_to_string(&matrix_path).unwrap();
    assert!(text.contains("s1\t0\t1\tNA"));

    let pairs_out = dir.path().join("pairs.csv");
    let meta_path = dir.path().join("meta.csv");
    std::fs::write(&meta_path, "sample,date\ns1,2024-01-01\ns2,2024-01-15\n").unwrap();
    let dates = load_sample_dates(&meta_path).unwrap();
    assert_eq!(write_pairs(&pairs_out, &result.matrix, Some(&dates), None, "test").unwrap(), 2);
    let pairs = std::fs::read_to_string(&pairs_out).unwrap();
    assert!(pairs.contains("s1,s2,14,1,1,150,valid"));
    assert!(pairs.contains("s2,s3,NA,61,61,150,valid"));

    let clusters_out = dir.path().join("clusters.tsv");
    write_clusters(&clusters_out, &result.clusters, "test").unwrap();
    let clusters = std::fs::read_to_string(&clusters_out).unwrap();
    assert!(clusters.contains("# candidate-restricted: true\n"));
    assert!(clusters.contains("s1\t1\ns2\t1\ns3\t2\n"));
}
