// args.rs - Command line arguments definition

use argh::FromArgs;

#[derive(FromArgs)]
/// snpclust - SNP distances and transmission clusters from read pileups
pub struct Args {
    /// pileup table (TSV: sample, contig, pos, base, qual, read_id, strand)
    #[argh(option)]
    pub pileup: Option<String>,

    /// reference FASTA the reads were aligned to
    #[argh(option)]
    pub reference: Option<String>,

    /// output distance matrix file
    #[argh(option)]
    pub output: Option<String>,

    /// output format: tsv, csv, phylip, nexus (default: tsv)
    #[argh(option, default = "String::from(\"tsv\")")]
    pub format: String,

    /// long-format pair distance table (CSV)
    #[argh(option)]
    pub pairs_output: Option<String>,

    /// only report pairs with a valid distance at or below this value in --pairs-output
    #[argh(option)]
    pub max_report_distance: Option<f64>,

    /// cluster assignment table (TSV)
    #[argh(option)]
    pub clusters_output: Option<String>,

    /// write per-sample IUPAC consensus sequences to this FASTA file
    #[argh(option)]
    pub consensus_fasta: Option<String>,

    /// write a JSON run summary to this file
    #[argh(option)]
    pub summary: Option<String>,

    /// sampling dates (CSV with header: sample,date as YYYY-MM-DD); adds day gaps to --pairs-output
    #[argh(option)]
    pub meta: Option<String>,

    /// distance metric: proportion, snps (default: proportion)
    #[argh(option, default = "String::from(\"proportion\")")]
    pub metric: String,

    /// clustering threshold, in the unit of --metric (default: 0.001)
    #[argh(option, default = "0.001")]
    pub threshold: f64,

    /// minimum read depth for a call (default: 5)
    #[argh(option, default = "5")]
    pub min_depth: u32,

    /// quality-weighted fraction the major base must exceed (default: 0.8)
    #[argh(option, default = "0.8")]
    pub min_call_fraction: f64,

    /// bases within this fraction of the major base give an ambiguous call (default: 0.2)
    #[argh(option, default = "0.2")]
    pub ambiguous_margin: f64,

    /// ignore bases below this Phred quality (default: 0)
    #[argh(option, default = "0")]
    pub min_base_quality: u8,

    /// only count bases seen on both strands
    #[argh(switch)]
    pub both_strands: bool,

    /// minimum shared confident sites for a valid distance (default: 100)
    #[argh(option, default = "100")]
    pub min_overlap: usize,

    /// restrict computation to the sample pairs listed in a file (two ids per line)
    #[argh(option)]
    pub candidate_pairs: Option<String>,

    /// compare only the samples listed in this file against all other samples
    #[argh(option)]
    pub query_list: Option<String>,

    /// samples expected in this run, one per line; other samples are rejected
    #[argh(option)]
    pub samples_list: Option<String>,

    /// include only samples matching regex pattern
    #[argh(option)]
    pub include_samples: Option<String>,

    /// exclude samples matching regex pattern
    #[argh(option)]
    pub exclude_samples: Option<String>,

    /// number of threads (default: auto-detect)
    #[argh(option)]
    pub threads: Option<usize>,

    /// abort when more than this fraction of pileup records is malformed (default: 0.05)
    #[argh(option, default = "0.05")]
    pub max_malformed_fraction: f64,

    /// hide progress bars
    #[argh(switch)]
    pub no_progress: bool,

    /// debug logging
    #[argh(switch, short = 'v')]
    pub verbose: bool,

    /// validate inputs without computation (dry run)
    #[argh(switch)]
    pub dry_run: bool,

    /// path to TOML configuration file
    #[argh(option)]
    pub config: Option<String>,

    /// generate sample configuration file and exit
    #[argh(switch)]
    pub generate_config: bool,
}

impl Args {
    /// Arguments as if only defaults were given
    pub fn defaults() -> Self {
        Self {
            pileup: None,
            reference: None,
            output: None,
            format: String::from("tsv"),
            pairs_output: None,
            max_report_distance: None,
            clusters_output: None,
            consensus_fasta: None,
            summary: None,
            meta: None,
            metric: String::from("proportion"),
            threshold: 0.001,
            min_depth: 5,
            min_call_fraction: 0.8,
            ambiguous_margin: 0.2,
            min_base_quality: 0,
            both_strands: false,
            min_overlap: 100,
            candidate_pairs: None,
            query_list: None,
            samples_list: None,
            include_samples: None,
            exclude_samples: None,
            threads: None,
            max_malformed_fraction: 0.05,
            no_progress: false,
            verbose: false,
            dry_run: false,
            config: None,
            generate_config: false,
        }
    }
}
