// csv.rs - CSV loader for sample metadata

use crate::data::metadata::SampleDates;
use crate::error::{Result, SnpclustError};
use ::csv::{ReaderBuilder, Trim};
use chrono::NaiveDate;
use std::path::Path;
use tracing::{info, warn};

/// Load sampling dates from a CSV file with a header row.
///
/// The first column holds the sample id and the second an ISO date
/// (`YYYY-MM-DD`); further columns are ignored. An empty or `NA` date leaves
/// the sample undated. Any other unparseable date, or a sample listed
/// twice, is fatal.
pub fn load_sample_dates(path: &Path) -> Result<SampleDates> {
    info!("📅 Loading sampling dates: {}", path.display());

    let mut reader = ReaderBuilder::new()
        .comment(Some(b'#'))
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let mut dates = SampleDates::new();
    let mut undated = 0usize;
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());

        let sample = record.get(0).unwrap_or_default();
        if sample.is_empty() {
            return Err(SnpclustError::parse(path, format!("line {}: empty sample id", line)));
        }
        let value = record.get(1).unwrap_or_default();
        if value.is_empty() || value.eq_ignore_ascii_case("NA") {
            undated += 1;
            continue;
        }

        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
            SnpclustError::parse(
                path,
                format!("line {}: invalid date '{}' for {}: {}", line, value, sample, e),
            )
        })?;
        if dates.insert(sample, date).is_some() {
            return Err(SnpclustError::parse(
                path,
                format!("line {}: sample {} listed twice", line, sample),
            ));
        }
    }

    if undated > 0 {
        warn!("⚠️  {} samples in '{}' have no sampling date", undated, path.display());
    }
    info!("✅ Loaded sampling dates for {} samples", dates.len());
    Ok(dates)
}
