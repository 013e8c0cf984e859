// fasta.rs - IUPAC consensus sequences

use crate::core::consensus::SampleCallSet;
use crate::error::{Result, SnpclustError};
use crate::output::create_output;
use bio::io::fasta;
use std::path::Path;
use tracing::info;

/// One record per sample over the full reference: called bases, IUPAC
/// codes for ambiguous calls and `N` everywhere else
pub fn write_consensus_fasta(file_path: &Path, call_sets: &[SampleCallSet]) -> Result<()> {
    let mut writer = fasta::Writer::new(create_output(file_path)?);
    for set in call_sets {
        let description = format!(
            "confident={} ambiguous={} length={}",
            set.confident_sites(),
            set.ambiguous_sites(),
            set.reference_length()
        );
        writer.write(set.sample_id(), Some(description.as_str()), &set.to_sequence())?;
    }
    writer
        .flush()
        .map_err(|e| SnpclustError::output(format!("Flush error: {}", e)))?;
    info!(
        "✅ Consensus sequences for {} samples written to: {}",
        call_sets.len(),
        file_path.display()
    );
    Ok(())
}
