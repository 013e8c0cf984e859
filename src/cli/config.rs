// config.rs - Configuration file support

use crate::error::{Result, SnpclustError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Values a TOML file may provide; anything left out falls back to the
/// command line defaults
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    // Input/Output
    pub pileup: Option<String>,
    pub reference: Option<String>,
    pub output: Option<String>,
    pub format: Option<String>,
    pub pairs_output: Option<String>,
    pub max_report_distance: Option<f64>,
    pub clusters_output: Option<String>,
    pub consensus_fasta: Option<String>,
    pub summary: Option<String>,
    pub meta: Option<String>,

    // Consensus calling
    pub min_depth: Option<u32>,
    pub min_call_fraction: Option<f64>,
    pub ambiguous_margin: Option<f64>,
    pub min_base_quality: Option<u8>,
    pub both_strands: Option<bool>,

    // Distance and clustering
    pub metric: Option<String>,
    pub min_overlap: Option<usize>,
    pub threshold: Option<f64>,

    // Pair selection and sample filtering
    pub candidate_pairs: Option<String>,
    pub query_list: Option<String>,
    pub samples_list: Option<String>,
    pub include_samples: Option<String>,
    pub exclude_samples: Option<String>,

    // Performance and run control
    pub threads: Option<usize>,
    pub max_malformed_fraction: Option<f64>,
    pub no_progress: Option<bool>,
    pub dry_run: Option<bool>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SnpclustError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_toml(&content).map_err(|e| SnpclustError::parse(path, e))?;
        info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("invalid configuration: {}", e))
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| SnpclustError::config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        info!("📄 Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Generate a sample configuration file with comments
    pub fn generate_sample() -> String {
        r#"# snpclust.toml - Configuration file for snpclust
# Command line arguments override these settings

# =============================================================================
# INPUT/OUTPUT
# =============================================================================

# Pileup table: sample, contig, pos (1-based), base, qual, read_id, strand
pileup = "/path/to/pileup.tsv"

# Reference FASTA used for the alignments
reference = "/path/to/reference.fasta"

# Distance matrix file and format: tsv, csv, phylip, nexus
output = "distances.tsv"
format = "tsv"

# Long-format pair table (sampleA,sampleB,date_difference,distance,snps,sites_considered,status)
# pairs_output = "pairs.csv"
# max_report_distance = 20

# Cluster assignment table
clusters_output = "clusters.tsv"

# IUPAC consensus sequences per sample
# consensus_fasta = "consensus.fasta"

# JSON run summary
# summary = "summary.json"

# Sampling dates (CSV with header: sample,date as YYYY-MM-DD)
# Adds the day gap between samples to the pair table
# meta = "metadata.csv"

# =============================================================================
# CONSENSUS CALLING
# =============================================================================

# Minimum read depth for a call
min_depth = 5

# Quality-weighted fraction the major base must exceed
min_call_fraction = 0.8

# Bases within this fraction of the major base give an ambiguous (IUPAC) call
ambiguous_margin = 0.2

# Ignore bases below this Phred quality
min_base_quality = 0

# Only count bases seen on both strands
both_strands = false

# =============================================================================
# DISTANCE AND CLUSTERING
# =============================================================================

# Distance metric: proportion (mismatches / shared sites) or snps (raw count)
metric = "proportion"

# Minimum shared confident sites for a valid distance
min_overlap = 100

# Clustering threshold, in the unit of the metric
threshold = 0.001

# =============================================================================
# PAIR SELECTION AND SAMPLE FILTERING
# =============================================================================

# Restrict computation to pairs from an external pre-filter (two ids per line)
# candidate_pairs = "candidates.tsv"

# Compare only these samples against all others (one id per line)
# query_list = "queries.txt"

# Samples expected in this run (one id per line)
# samples_list = "samples.txt"

# include_samples = "^ST131_.*"
# exclude_samples = "control.*"

# =============================================================================
# PERFORMANCE AND RUN CONTROL
# =============================================================================

# Number of threads (omit for auto-detection)
# threads = 16

# Abort when more than this fraction of pileup records is malformed
max_malformed_fraction = 0.05

no_progress = false
dry_run = false
"#
        .to_string()
    }
}
