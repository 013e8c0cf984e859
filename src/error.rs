// error.rs - Crate-wide error type

//! Fatal error conditions.
//!
//! Per-record and per-pair problems are not errors: they are carried as
//! [`MalformedRecord`](crate::core::consensus::MalformedRecord) and
//! [`PairFailure`](crate::core::matrix::PairFailure) values so a run can
//! finish with partial bad input. Only the variants below abort a run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnpclustError {
    /// I/O errors (file missing, permission denied, read/write failures)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited file errors raised by the csv reader/writer
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration values outside their valid range
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Structural parse errors (missing header, bad config file)
    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Nothing to cluster
    #[error("No samples to process")]
    NoSamples,

    /// The malformed-record ceiling was exceeded
    #[error(
        "Too much malformed input to trust the result: {malformed} of {total} records ({pct:.2}% > {ceiling_pct:.2}%)",
        pct = *fraction * 100.0,
        ceiling_pct = *ceiling * 100.0
    )]
    TooMuchMalformedInput {
        malformed: usize,
        total: usize,
        fraction: f64,
        ceiling: f64,
    },

    /// The same sample id supplied twice
    #[error("Duplicate sample: {0}")]
    DuplicateSample(String),

    /// A sample id with no call set
    #[error("Unknown sample: {0}")]
    UnknownSample(String),

    /// Two call sets built against different coordinate spaces
    #[error("Call sets '{sample_a}' ({length_a} bp) and '{sample_b}' ({length_b} bp) use different reference lengths")]
    CallSetMismatch {
        sample_a: String,
        length_a: u64,
        sample_b: String,
        length_b: u64,
    },

    /// Unsupported output format or failing writer
    #[error("Output error: {message}")]
    Output { message: String },
}

/// Type alias for Results using SnpclustError
pub type Result<T> = std::result::Result<T, SnpclustError>;

impl SnpclustError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a parse error tied to a file
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }
}
