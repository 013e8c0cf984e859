// pipeline.rs - Consensus -> distance matrix -> clusters, end to end

use crate::core::cluster::{cluster, ClusterAssignment};
use crate::core::consensus::{ConsensusCaller, ConsensusConfig, SampleCallSet};
use crate::core::distance::{DistanceConfig, DistanceEngine, DistanceMetric};
use crate::core::matrix::{build_distance_matrix, DistanceMatrix};
use crate::data::candidates::CandidatePairs;
use crate::data::pileup::PileupSet;
use crate::error::{Result, SnpclustError};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Everything a run needs, validated before any work starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub consensus: ConsensusConfig,
    pub distance: DistanceConfig,
    /// Clustering threshold, in the unit of `distance.metric`
    pub threshold: f64,
    /// Worker threads; `None` lets rayon decide
    pub workers: Option<usize>,
    /// Fraction of malformed pileup records that aborts the run
    pub max_malformed_fraction: f64,
    #[serde(default)]
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            consensus: ConsensusConfig::default(),
            distance: DistanceConfig::default(),
            threshold: 0.001,
            workers: None,
            max_malformed_fraction: 0.05,
            show_progress: false,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.consensus.validate()?;
        self.distance.validate()?;

        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(SnpclustError::config(format!(
                "threshold must be a finite value >= 0, got {}",
                self.threshold
            )));
        }
        if self.distance.metric == DistanceMetric::Proportion && self.threshold > 1.0 {
            return Err(SnpclustError::config(format!(
                "threshold {} is above 1.0 but the proportion metric is in [0, 1]; use --metric snps for SNP counts",
                self.threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.max_malformed_fraction) {
            return Err(SnpclustError::config(format!(
                "max_malformed_fraction must be in [0.0, 1.0], got {}",
                self.max_malformed_fraction
            )));
        }
        if self.workers == Some(0) {
            return Err(SnpclustError::config("workers must be at least 1"));
        }
        Ok(())
    }
}

/// Input quality summary for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputReport {
    pub samples: usize,
    /// Pileup records seen, including those the reader rejected
    pub total_records: usize,
    /// Records rejected by the reader or the consensus caller
    pub malformed_records: usize,
    pub malformed_fraction: f64,
    pub confident_sites: usize,
    pub ambiguous_sites: usize,
    /// Samples without a single confident call
    pub empty_samples: usize,
}

impl InputReport {
    fn from_call_sets(call_sets: &[SampleCallSet], rejected_by_reader: usize) -> Self {
        let seen: usize = call_sets.iter().map(|s| s.records_seen()).sum();
        let caller_malformed: usize = call_sets.iter().map(|s| s.malformed().len()).sum();
        let total_records = seen + rejected_by_reader;
        let malformed_records = caller_malformed + rejected_by_reader;
        let malformed_fraction = if total_records == 0 {
            0.0
        } else {
            malformed_records as f64 / total_records as f64
        };

        Self {
            samples: call_sets.len(),
            total_records,
            malformed_records,
            malformed_fraction,
            confident_sites: call_sets.iter().map(|s| s.confident_sites()).sum(),
            ambiguous_sites: call_sets.iter().map(|s| s.ambiguous_sites()).sum(),
            empty_samples: call_sets.iter().filter(|s| s.confident_sites() == 0).count(),
        }
    }
}

/// Final, complete output of a run
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Call sets sorted by sample id
    pub call_sets: Vec<SampleCallSet>,
    pub matrix: DistanceMatrix,
    pub clusters: ClusterAssignment,
    pub report: InputReport,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Fails on invalid configuration before anything is computed
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the whole pipeline on the pileups of one batch.
    ///
    /// Results are only returned once clustering has finished; any fatal
    /// condition discards everything computed so far.
    pub fn run(
        &self,
        pileups: &PileupSet,
        reference_length: u64,
        candidates: Option<&CandidatePairs>,
    ) -> Result<PipelineResult> {
        if pileups.samples.is_empty() {
            return Err(SnpclustError::NoSamples);
        }

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = self.config.workers {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| SnpclustError::config(format!("cannot start worker pool: {}", e)))?;
        info!("🧵 Workers: {}", pool.current_num_threads());

        pool.install(|| self.run_stages(pileups, reference_length, candidates))
    }

    fn run_stages(
        &self,
        pileups: &PileupSet,
        reference_length: u64,
        candidates: Option<&CandidatePairs>,
    ) -> Result<PipelineResult> {
        let start = Instant::now();
        let call_sets = self.call_consensus(pileups, reference_length);

        let report = InputReport::from_call_sets(&call_sets, pileups.rejected_records);
        info!(
            "📋 Input: {} samples, {} records, {} malformed ({:.2}%)",
            report.samples,
            report.total_records,
            report.malformed_records,
            report.malformed_fraction * 100.0
        );
        if report.empty_samples > 0 {
            warn!(
                "⚠️  {} samples have no confident calls; their distances will be invalid",
                report.empty_samples
            );
        }
        if report.malformed_fraction > self.config.max_malformed_fraction {
            return Err(SnpclustError::TooMuchMalformedInput {
                malformed: report.malformed_records,
                total: report.total_records,
                fraction: report.malformed_fraction,
                ceiling: self.config.max_malformed_fraction,
            });
        }

        let engine = DistanceEngine::new(self.config.distance.clone());
        let matrix = build_distance_matrix(&call_sets, candidates, &engine, self.config.show_progress)?;
        let clusters = cluster(&matrix, self.config.threshold);

        info!("✅ Pipeline finished in {:.2}s", start.elapsed().as_secs_f64());
        Ok(PipelineResult {
            call_sets,
            matrix,
            clusters,
            report,
        })
    }

    fn call_consensus(&self, pileups: &PileupSet, reference_length: u64) -> Vec<SampleCallSet> {
        info!("🧬 Calling consensus for {} samples...", pileups.samples.len());
        let caller = ConsensusCaller::new(self.config.consensus.clone(), reference_length);

        let pb = if self.config.show_progress {
            let pb = ProgressBar::new(pileups.samples.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} samples {msg}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut call_sets: Vec<SampleCallSet> = pileups
            .samples
            .par_iter()
            .map(|sample| {
                let set = caller.call(&sample.sample_id, &sample.entries);
                pb.inc(1);
                set
            })
            .collect();
        pb.finish_and_clear();

        call_sets.sort_by(|a, b| a.sample_id().cmp(b.sample_id()));
        call_sets
    }
}
