// reports.rs - Pair table, cluster table and JSON run summary

use crate::core::cluster::ClusterAssignment;
use crate::core::matrix::DistanceMatrix;
use crate::core::pipeline::{InputReport, PipelineConfig, PipelineResult};
use crate::data::metadata::SampleDates;
use crate::error::{Result, SnpclustError};
use crate::output::{create_output, format_distance, write_header};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Long-format table, one row per computed or failed pair:
/// `sampleA,sampleB,date_difference,distance,snps,sites_considered,status`.
///
/// `date_difference` is the gap in days between sampling dates, `NA` when
/// no dates were given or either sample is undated. With
/// `max_report_distance`, only valid pairs at or below it are written.
pub fn write_pairs(
    file_path: &Path,
    matrix: &DistanceMatrix,
    dates: Option<&SampleDates>,
    max_report_distance: Option<f64>,
    command_line: &str,
) -> Result<usize> {
    let date_difference = |a: &str, b: &str| {
        dates
            .and_then(|d| d.date_difference(a, b))
            .map_or_else(|| "NA".to_string(), |days| days.to_string())
    };

    let mut writer = create_output(file_path)?;
    write_header(&mut writer, "#", command_line)?;
    writeln!(writer, "# metric: {}", matrix.metric().name())?;

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "sampleA",
        "sampleB",
        "date_difference",
        "distance",
        "snps",
        "sites_considered",
        "status",
    ])?;

    let mut written = 0usize;
    for (_, _, record) in matrix.records() {
        if let Some(max) = max_report_distance {
            if !record.links_at(max) {
                continue;
            }
        }
        let (distance, status) = match record.distance {
            Some(d) => (format_distance(d, matrix.metric()), "valid"),
            None => ("NA".to_string(), "low_overlap"),
        };
        csv_writer.write_record([
            record.sample_a.as_str(),
            record.sample_b.as_str(),
            date_difference(&record.sample_a, &record.sample_b).as_str(),
            distance.as_str(),
            record.mismatches.to_string().as_str(),
            record.shared_sites.to_string().as_str(),
            status,
        ])?;
        written += 1;
    }

    if max_report_distance.is_none() {
        for failure in matrix.failures() {
            csv_writer.write_record([
                failure.sample_a.as_str(),
                failure.sample_b.as_str(),
                date_difference(&failure.sample_a, &failure.sample_b).as_str(),
                "NA",
                "",
                "",
                "failed",
            ])?;
            written += 1;
        }
    }

    csv_writer
        .flush()
        .map_err(|e| SnpclustError::output(format!("Flush error: {}", e)))?;
    info!("✅ {} pair distances written to: {}", written, file_path.display());
    Ok(written)
}

/// `sample<TAB>cluster`, sample order
pub fn write_clusters(
    file_path: &Path,
    clusters: &ClusterAssignment,
    command_line: &str,
) -> Result<()> {
    let mut writer = create_output(file_path)?;
    write_header(&mut writer, "#", command_line)?;
    writeln!(writer, "# threshold: {}", clusters.threshold())?;
    if !clusters.is_exhaustive() {
        writeln!(writer, "# candidate-restricted: true")?;
    }
    writeln!(writer, "sample\tcluster")?;
    for (sample, cluster_id) in clusters.assignments() {
        writeln!(writer, "{}\t{}", sample, cluster_id)?;
    }
    writer.flush()?;
    info!(
        "✅ {} clusters written to: {}",
        clusters.n_clusters(),
        file_path.display()
    );
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct ClusterSummary {
    pub id: usize,
    pub size: usize,
    pub members: Vec<String>,
}

/// Machine-readable overview of one run
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub version: String,
    pub generated: String,
    pub command: String,
    pub parameters: PipelineConfig,
    pub input: InputReport,
    pub samples: usize,
    pub exhaustive: bool,
    pub computed_pairs: usize,
    pub valid_pairs: usize,
    pub failed_pairs: usize,
    pub clusters: usize,
    pub singletons: usize,
    pub cluster_members: Vec<ClusterSummary>,
}

impl RunSummary {
    pub fn new(config: &PipelineConfig, result: &PipelineResult, command_line: &str) -> Self {
        let matrix = &result.matrix;
        let cluster_members = result
            .clusters
            .clusters()
            .map(|(id, members)| ClusterSummary {
                id,
                size: members.len(),
                members: members.into_iter().map(str::to_string).collect(),
            })
            .collect();

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            command: command_line.to_string(),
            parameters: config.clone(),
            input: result.report.clone(),
            samples: matrix.len(),
            exhaustive: matrix.is_exhaustive(),
            computed_pairs: matrix.computed_pairs(),
            valid_pairs: matrix.valid_pairs(),
            failed_pairs: matrix.failed_pairs(),
            clusters: result.clusters.n_clusters(),
            singletons: result.clusters.singletons(),
            cluster_members,
        }
    }
}

pub fn write_summary(file_path: &Path, summary: &RunSummary) -> Result<()> {
    let writer = create_output(file_path)?;
    serde_json::to_writer_pretty(writer, summary)
        .map_err(|e| SnpclustError::output(format!("Failed to write JSON summary: {}", e)))?;
    info!("✅ Run summary written to: {}", file_path.display());
    Ok(())
}
