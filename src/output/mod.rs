// mod.rs - Output formatters module

pub mod fasta;
pub mod reports;

pub use fasta::write_consensus_fasta;
pub use reports::{write_clusters, write_pairs, write_summary, RunSummary};

use crate::core::distance::DistanceMetric;
use crate::core::matrix::DistanceMatrix;
use crate::error::{Result, SnpclustError};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Distance matrix file layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixFormat {
    Tsv,
    Csv,
    Phylip,
    Nexus,
}

impl FromStr for MatrixFormat {
    type Err = SnpclustError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tsv" => Ok(MatrixFormat::Tsv),
            "csv" => Ok(MatrixFormat::Csv),
            "phylip" => Ok(MatrixFormat::Phylip),
            "nexus" => Ok(MatrixFormat::Nexus),
            _ => Err(SnpclustError::config(format!(
                "Unsupported output format: {}. Use: tsv, csv, phylip, nexus",
                s
            ))),
        }
    }
}

/// Ensure parent directory exists before creating file
pub(crate) fn create_output(file_path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent).map_err(|e| {
            SnpclustError::output(format!(
                "Failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }
    let file = File::create(file_path).map_err(|e| {
        SnpclustError::output(format!(
            "Failed to create output file '{}': {}",
            file_path.display(),
            e
        ))
    })?;
    Ok(BufWriter::new(file))
}

/// `# Command` / `# Generated` / version lines shared by the text outputs
pub(crate) fn write_header(writer: &mut impl Write, prefix: &str, command_line: &str) -> Result<()> {
    writeln!(writer, "{} Command: {}", prefix, command_line)?;
    writeln!(
        writer,
        "{} Generated: {}",
        prefix,
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(writer, "{} snpclust v{}", prefix, env!("CARGO_PKG_VERSION"))?;
    Ok(())
}

/// SNP counts print as integers, proportions with full precision
pub fn format_distance(distance: f64, metric: DistanceMetric) -> String {
    match metric {
        DistanceMetric::Snps => format!("{:.0}", distance),
        DistanceMetric::Proportion => distance.to_string(),
    }
}

fn cell(value: Option<f64>, metric: DistanceMetric, missing: &str) -> String {
    match value {
        Some(d) => format_distance(d, metric),
        None => missing.to_string(),
    }
}

/// Square matrix with a header row, `NA` for unknown distances
fn write_delimited(
    file_path: &Path,
    matrix: &DistanceMatrix,
    delimiter: char,
    command_line: &str,
) -> Result<()> {
    let mut writer = create_output(file_path)?;
    write_header(&mut writer, "#", command_line)?;
    writeln!(writer, "# metric: {}", matrix.metric().name())?;

    let samples = matrix.samples();
    let dense = matrix.to_dense();
    write!(writer, "Sample")?;
    for sample in samples {
        write!(writer, "{}{}", delimiter, sample)?;
    }
    writeln!(writer)?;

    for (sample, row) in samples.iter().zip(&dense) {
        write!(writer, "{}", sample)?;
        for value in row {
            write!(writer, "{}{}", delimiter, cell(*value, matrix.metric(), "NA"))?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    info!("✅ Distance matrix written to: {}", file_path.display());
    Ok(())
}

/// Write distance matrix in TSV format
pub fn write_tsv(file_path: &Path, matrix: &DistanceMatrix, command_line: &str) -> Result<()> {
    write_delimited(file_path, matrix, '\t', command_line)
}

/// Write distance matrix in CSV format
pub fn write_csv(file_path: &Path, matrix: &DistanceMatrix, command_line: &str) -> Result<()> {
    write_delimited(file_path, matrix, ',', command_line)
}

/// Write distance matrix in PHYLIP format (lower triangle)
pub fn write_phylip(file_path: &Path, matrix: &DistanceMatrix, command_line: &str) -> Result<()> {
    let mut writer = create_output(file_path)?;
    let dense = matrix.to_dense();

    writeln!(writer, "    {}", matrix.len())?;
    for (i, sample) in matrix.samples().iter().enumerate() {
        write!(writer, "{:<10}", sample)?;
        for value in &dense[i][..=i] {
            write!(writer, "  {}", cell(*value, matrix.metric(), "NA"))?;
        }
        writeln!(writer)?;
    }

    // trailing comments; most PHYLIP readers stop after the last row
    writeln!(writer)?;
    write_header(&mut writer, "#", command_line)?;

    writer.flush()?;
    info!("✅ Distance matrix written to: {} (PHYLIP format)", file_path.display());
    Ok(())
}

/// Write distance matrix in NEXUS format
pub fn write_nexus(file_path: &Path, matrix: &DistanceMatrix, command_line: &str) -> Result<()> {
    let mut writer = create_output(file_path)?;
    let dense = matrix.to_dense();

    writeln!(writer, "#NEXUS")?;
    writeln!(writer, "[Command: {}]", command_line)?;
    writeln!(
        writer,
        "[Generated: {}]",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(writer, "[snpclust v{}, metric: {}]", env!("CARGO_PKG_VERSION"), matrix.metric().name())?;
    writeln!(writer, "BEGIN DISTANCES;")?;
    writeln!(writer, "    DIMENSIONS NTAX={};", matrix.len())?;
    writeln!(writer, "    FORMAT LABELS LOWER DIAGONAL MISSING=?;")?;
    writeln!(writer, "    MATRIX")?;

    for (i, sample) in matrix.samples().iter().enumerate() {
        write!(writer, "        {}", sample)?;
        for value in &dense[i][..=i] {
            write!(writer, " {}", cell(*value, matrix.metric(), "?"))?;
        }
        writeln!(writer)?;
    }

    writeln!(writer, "    ;")?;
    writeln!(writer, "END;")?;

    writer.flush()?;
    info!("✅ Distance matrix written to: {} (NEXUS format)", file_path.display());
    Ok(())
}

/// Write distance matrix in the specified format
pub fn write_matrix(
    file_path: &Path,
    format: MatrixFormat,
    matrix: &DistanceMatrix,
    command_line: &str,
) -> Result<()> {
    match format {
        MatrixFormat::Tsv => write_tsv(file_path, matrix, command_line),
        MatrixFormat::Csv => write_csv(file_path, matrix, command_line),
        MatrixFormat::Phylip => write_phylip(file_path, matrix, command_line),
        MatrixFormat::Nexus => write_nexus(file_path, matrix, command_line),
    }
}
