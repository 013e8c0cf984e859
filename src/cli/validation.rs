// validation.rs - Input validation utilities

use crate::cli::args::Args;
use crate::core::{ConsensusConfig, DistanceConfig, DistanceMetric, PipelineConfig};
use crate::data::loaders::load_sample_dates;
use crate::data::SampleDates;
use crate::error::{Result, SnpclustError};
use crate::output::MatrixFormat;
use regex::Regex;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct ValidationResult {
    pub pileup: PathBuf,
    pub reference: PathBuf,
    pub pipeline: PipelineConfig,
    pub format: MatrixFormat,
    pub sample_include_regex: Option<Regex>,
    pub sample_exclude_regex: Option<Regex>,
    pub roster: Option<HashSet<String>>,
    pub queries: Option<HashSet<String>>,
    pub dates: Option<SampleDates>,
}

/// Validate all command line arguments before any input is read
pub fn validate_args(args: &Args) -> Result<ValidationResult> {
    let pileup = args
        .pileup
        .as_ref()
        .ok_or_else(|| SnpclustError::config("--pileup is required"))?;
    let reference = args
        .reference
        .as_ref()
        .ok_or_else(|| SnpclustError::config("--reference is required"))?;

    let metric: DistanceMetric = args.metric.parse()?;
    let format: MatrixFormat = args.format.parse()?;

    let pipeline = PipelineConfig {
        consensus: ConsensusConfig {
            min_depth: args.min_depth,
            min_call_fraction: args.min_call_fraction,
            ambiguous_margin: args.ambiguous_margin,
            min_base_quality: args.min_base_quality,
            require_both_strands: args.both_strands,
        },
        distance: DistanceConfig {
            min_overlap: args.min_overlap,
            metric,
        },
        threshold: args.threshold,
        workers: args.threads,
        max_malformed_fraction: args.max_malformed_fraction,
        show_progress: !args.no_progress,
    };
    pipeline.validate()?;

    if args.candidate_pairs.is_some() && args.query_list.is_some() {
        return Err(SnpclustError::config(
            "--candidate-pairs and --query-list cannot be combined",
        ));
    }
    if let Some(max) = args.max_report_distance {
        if !max.is_finite() || max < 0.0 {
            return Err(SnpclustError::config(format!(
                "--max-report-distance must be a finite value >= 0, got {}",
                max
            )));
        }
    }
    if args.output.is_none()
        && args.pairs_output.is_none()
        && args.clusters_output.is_none()
        && args.consensus_fasta.is_none()
        && args.summary.is_none()
        && !args.dry_run
    {
        return Err(SnpclustError::config(
            "no output requested: give at least one of --output, --pairs-output, --clusters-output, --consensus-fasta, --summary",
        ));
    }

    // Compile regex patterns
    let sample_include_regex = compile_regex(args.include_samples.as_deref(), "include_samples")?;
    let sample_exclude_regex = compile_regex(args.exclude_samples.as_deref(), "exclude_samples")?;

    // Load sample lists from files
    let roster = args
        .samples_list
        .as_deref()
        .map(|p| load_set_from_file(Path::new(p)))
        .transpose()?;
    let queries = args
        .query_list
        .as_deref()
        .map(|p| load_set_from_file(Path::new(p)))
        .transpose()?;

    if args.meta.is_some() && args.pairs_output.is_none() {
        warn!("⚠️  --meta only affects --pairs-output, which was not requested");
    }
    let dates = args
        .meta
        .as_deref()
        .map(|p| load_sample_dates(Path::new(p)))
        .transpose()?;

    Ok(ValidationResult {
        pileup: PathBuf::from(pileup),
        reference: PathBuf::from(reference),
        pipeline,
        format,
        sample_include_regex,
        sample_exclude_regex,
        roster,
        queries,
        dates,
    })
}

fn compile_regex(pattern: Option<&str>, name: &str) -> Result<Option<Regex>> {
    pattern
        .map(|p| {
            Regex::new(p).map_err(|e| SnpclustError::config(format!("Invalid {} regex: {}", name, e)))
        })
        .transpose()
}

/// Load a set of strings from a file (one per line, `#` comments allowed)
pub fn load_set_from_file(file_path: &Path) -> Result<HashSet<String>> {
    let file = File::open(file_path).map_err(|e| {
        SnpclustError::config(format!(
            "Failed to open sample list '{}': {}",
            file_path.display(),
            e
        ))
    })?;

    let reader = BufReader::new(file);
    let mut set = HashSet::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with('#') {
            set.insert(trimmed.to_string());
        }
    }

    info!("📋 Loaded {} samples from '{}'", set.len(), file_path.display());
    Ok(set)
}
