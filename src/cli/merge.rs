// merge.rs - Merge configuration file with CLI arguments

use crate::cli::{Args, Config};
use crate::error::Result;

/// Take the config value only where the CLI still holds its default
fn fill<T: PartialEq>(slot: &mut T, default: T, value: Option<T>) {
    if *slot == default {
        if let Some(value) = value {
            *slot = value;
        }
    }
}

fn fill_opt<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

impl Args {
    /// Merge with configuration from file.
    /// CLI arguments take precedence over config file values.
    pub fn merge_with_config(mut self, config: Config) -> Self {
        let defaults = Args::defaults();

        // Input/Output
        fill_opt(&mut self.pileup, config.pileup);
        fill_opt(&mut self.reference, config.reference);
        fill_opt(&mut self.output, config.output);
        fill(&mut self.format, defaults.format, config.format);
        fill_opt(&mut self.pairs_output, config.pairs_output);
        fill_opt(&mut self.max_report_distance, config.max_report_distance);
        fill_opt(&mut self.clusters_output, config.clusters_output);
        fill_opt(&mut self.consensus_fasta, config.consensus_fasta);
        fill_opt(&mut self.summary, config.summary);
        fill_opt(&mut self.meta, config.meta);

        // Consensus calling (only override defaults, not explicit CLI values)
        fill(&mut self.min_depth, defaults.min_depth, config.min_depth);
        fill(&mut self.min_call_fraction, defaults.min_call_fraction, config.min_call_fraction);
        fill(&mut self.ambiguous_margin, defaults.ambiguous_margin, config.ambiguous_margin);
        fill(&mut self.min_base_quality, defaults.min_base_quality, config.min_base_quality);

        // Distance and clustering
        fill(&mut self.metric, defaults.metric, config.metric);
        fill(&mut self.min_overlap, defaults.min_overlap, config.min_overlap);
        fill(&mut self.threshold, defaults.threshold, config.threshold);

        // Pair selection and sample filtering
        fill_opt(&mut self.candidate_pairs, config.candidate_pairs);
        fill_opt(&mut self.query_list, config.query_list);
        fill_opt(&mut self.samples_list, config.samples_list);
        fill_opt(&mut self.include_samples, config.include_samples);
        fill_opt(&mut self.exclude_samples, config.exclude_samples);

        // Performance
        fill_opt(&mut self.threads, config.threads);
        fill(
            &mut self.max_malformed_fraction,
            defaults.max_malformed_fraction,
            config.max_malformed_fraction,
        );

        // Flags (config only sets them, never clears a CLI switch)
        if !self.both_strands && config.both_strands.unwrap_or(false) {
            self.both_strands = true;
        }
        if !self.no_progress && config.no_progress.unwrap_or(false) {
            self.no_progress = true;
        }
        if !self.dry_run && config.dry_run.unwrap_or(false) {
            self.dry_run = true;
        }

        self
    }

    /// Load configuration and merge with CLI args
    pub fn with_config_file(self, config_path: &str) -> Result<Self> {
        let config = Config::from_file(config_path)?;
        Ok(self.merge_with_config(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_fills_defaults_only() {
        let mut args = Args::defaults();
        args.threshold = 0.02;
        args.output = Some("cli.tsv".to_string());

        let config = Config {
            threshold: Some(5.0),
            min_depth: Some(10),
            output: Some("config.tsv".to_string()),
            pileup: Some("reads.tsv".to_string()),
            both_strands: Some(true),
            meta: Some("dates.csv".to_string()),
            ..Config::new()
        };
        let merged = args.merge_with_config(config);

        assert_eq!(merged.threshold, 0.02);
        assert_eq!(merged.min_depth, 10);
        assert_eq!(merged.output.as_deref(), Some("cli.tsv"));
        assert_eq!(merged.pileup.as_deref(), Some("reads.tsv"));
        assert!(merged.both_strands);
        assert_eq!(merged.meta.as_deref(), Some("dates.csv"));
        assert_eq!(merged.metric, "proportion");
    }
}
