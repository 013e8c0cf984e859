// main.rs - CLI entry point

use snpclust::cli::{validate_args, Args, Config, ValidationResult};
use snpclust::data::loaders::{load_candidate_pairs, load_pileup_tsv};
use snpclust::data::{CandidatePairs, PileupSet, Reference};
use snpclust::output::{
    write_clusters, write_consensus_fasta, write_matrix, write_pairs, write_summary, RunSummary,
};
use snpclust::{Pipeline, PipelineResult, Result};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run_main() {
        eprintln!("❌ ERROR: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .init();
}

fn run_main() -> Result<()> {
    let mut args: Args = argh::from_env();
    let command_line = std::env::args().collect::<Vec<String>>().join(" ");

    // Handle generate config first
    if args.generate_config {
        println!("{}", Config::generate_sample());
        println!("\n💡 Save this content to a .toml file and use --config /path/to/config.toml");
        return Ok(());
    }

    init_logging(args.verbose);

    // Load configuration file if specified
    if let Some(config_path) = args.config.clone() {
        args = args.with_config_file(&config_path)?;
    }

    let validation = validate_args(&args)?;
    let total_start = Instant::now();

    info!("🚀 {}", snpclust::get_info());
    info!(
        "🎯 Metric: {} ({}), threshold {}",
        validation.pipeline.distance.metric.name(),
        validation.pipeline.distance.metric.description(),
        validation.pipeline.threshold
    );
    info!(
        "📏 min_depth {}, min_call_fraction {}, ambiguous_margin {}, min_overlap {}",
        validation.pipeline.consensus.min_depth,
        validation.pipeline.consensus.min_call_fraction,
        validation.pipeline.consensus.ambiguous_margin,
        validation.pipeline.distance.min_overlap
    );

    // Load inputs
    let reference = Reference::from_fasta(&validation.reference)?;
    let mut pileups = load_pileup_tsv(&validation.pileup, &reference, validation.roster.as_ref())?;
    pileups.print_statistics("loaded");
    pileups.apply_sample_filtering(
        validation.sample_include_regex.as_ref(),
        validation.sample_exclude_regex.as_ref(),
    );
    if let Some(dates) = &validation.dates {
        let undated = dates.undated(pileups.sample_ids());
        if !undated.is_empty() {
            warn!(
                "⚠️  {} of {} samples have no sampling date; their date differences are NA",
                undated.len(),
                pileups.samples.len()
            );
        }
    }

    let candidates = select_candidates(&args, &validation, &pileups)?;

    if args.dry_run {
        info!("✅ Dry run completed successfully");
        info!(
            "📊 {} samples over {} bp, {} pairs to compute",
            pileups.samples.len(),
            reference.total_length(),
            match &candidates {
                Some(c) => c.len(),
                None => pileups.samples.len() * pileups.samples.len().saturating_sub(1) / 2,
            }
        );
        return Ok(());
    }

    let pipeline = Pipeline::new(validation.pipeline.clone())?;
    let result = pipeline.run(&pileups, reference.total_length(), candidates.as_ref())?;

    write_outputs(&args, &validation, &pipeline, &result, &command_line)?;

    // Print summary
    info!("🎉 === SNPCLUST COMPLETED SUCCESSFULLY ===");
    info!(
        "📊 {} samples, {} pairs computed ({} valid, {} failed)",
        result.matrix.len(),
        result.matrix.computed_pairs(),
        result.matrix.valid_pairs(),
        result.matrix.failed_pairs()
    );
    info!(
        "🔗 {} clusters at threshold {} ({} singletons)",
        result.clusters.n_clusters(),
        result.clusters.threshold(),
        result.clusters.singletons()
    );
    info!(
        "⏱️  Total execution time: {:.2}s",
        total_start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Candidate pairs from a pre-filter file or a query list; `None` means all pairs
fn select_candidates(
    args: &Args,
    validation: &ValidationResult,
    pileups: &PileupSet,
) -> Result<Option<CandidatePairs>> {
    if let Some(path) = &args.candidate_pairs {
        return load_candidate_pairs(Path::new(path)).map(Some);
    }

    let Some(queries) = &validation.queries else {
        return Ok(None);
    };
    let samples = pileups.sample_ids();
    let (query_ids, database_ids): (Vec<&str>, Vec<&str>) =
        samples.into_iter().partition(|s| queries.contains(*s));
    let missing = queries.len() - query_ids.len();
    if missing > 0 {
        warn!("⚠️  {} query samples have no pileup data and are skipped", missing);
    }
    let pairs = CandidatePairs::between(&query_ids, &database_ids);
    info!(
        "🔍 Query mode: {} queries against {} samples ({} pairs)",
        query_ids.len(),
        database_ids.len(),
        pairs.len()
    );
    Ok(Some(pairs))
}

fn write_outputs(
    args: &Args,
    validation: &ValidationResult,
    pipeline: &Pipeline,
    result: &PipelineResult,
    command_line: &str,
) -> Result<()> {
    if let Some(path) = &args.output {
        write_matrix(Path::new(path), validation.format, &result.matrix, command_line)?;
    }
    if let Some(path) = &args.pairs_output {
        write_pairs(
            Path::new(path),
            &result.matrix,
            validation.dates.as_ref(),
            args.max_report_distance,
            command_line,
        )?;
    }
    if let Some(path) = &args.clusters_output {
        write_clusters(Path::new(path), &result.clusters, command_line)?;
    }
    if let Some(path) = &args.consensus_fasta {
        write_consensus_fasta(Path::new(path), &result.call_sets)?;
    }
    if let Some(path) = &args.summary {
        let summary = RunSummary::new(pipeline.config(), result, command_line);
        write_summary(Path::new(path), &summary)?;
    }
    Ok(())
}
