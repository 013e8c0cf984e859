// pileup.rs - Per-sample pileup evidence and sample filtering

use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use tracing::info;

/// Strand of the read contributing a base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "+" | "F" | "f" => Some(Strand::Forward),
            "-" | "R" | "r" => Some(Strand::Reverse),
            _ => None,
        }
    }
}

/// One read's base at one reference coordinate (0-based, global)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PileupEntry {
    pub coordinate: u64,
    pub base: u8,
    pub quality: u8,
    pub read_id: String,
    pub strand: Strand,
}

/// All pileup entries for one sample
#[derive(Debug, Clone, Default)]
pub struct SamplePileup {
    pub sample_id: String,
    pub entries: Vec<PileupEntry>,
}

impl SamplePileup {
    pub fn new(sample_id: impl Into<String>) -> Self {
        Self {
            sample_id: sample_id.into(),
            entries: Vec::new(),
        }
    }
}

/// Pileups for every sample in a run, plus what the reader had to reject
#[derive(Debug, Default)]
pub struct PileupSet {
    pub samples: Vec<SamplePileup>,
    /// Records read from the source, accepted or not
    pub total_records: usize,
    /// Records the reader could not attribute or parse
    pub rejected_records: usize,
}

impl PileupSet {
    /// Group flat (sample, entry) records by sample id, sorted by id.
    ///
    /// With a roster, records for samples outside it are rejected and every
    /// roster sample gets a pileup even if it has no records.
    pub fn from_records<I>(records: I, roster: Option<&HashSet<String>>) -> Self
    where
        I: IntoIterator<Item = (String, PileupEntry)>,
    {
        let mut grouped: BTreeMap<String, SamplePileup> = BTreeMap::new();
        let mut total_records = 0;
        let mut rejected_records = 0;

        if let Some(roster) = roster {
            for sample_id in roster {
                grouped.insert(sample_id.clone(), SamplePileup::new(sample_id.clone()));
            }
        }

        for (sample_id, entry) in records {
            total_records += 1;
            match roster {
                Some(roster) if !roster.contains(&sample_id) => rejected_records += 1,
                _ => grouped
                    .entry(sample_id.clone())
                    .or_insert_with(|| SamplePileup::new(sample_id))
                    .entries
                    .push(entry),
            }
        }

        Self {
            samples: grouped.into_values().collect(),
            total_records,
            rejected_records,
        }
    }

    pub fn sample_ids(&self) -> Vec<&str> {
        self.samples.iter().map(|s| s.sample_id.as_str()).collect()
    }

    /// Drop samples by include/exclude regex
    pub fn apply_sample_filtering(
        &mut self,
        sample_include: Option<&Regex>,
        sample_exclude: Option<&Regex>,
    ) {
        if sample_include.is_none() && sample_exclude.is_none() {
            return;
        }
        let initial_samples = self.samples.len();

        self.samples.retain(|sample| {
            let sample_id = &sample.sample_id;

            if let Some(regex) = sample_include {
                if !regex.is_match(sample_id) {
                    return false;
                }
            }

            if let Some(regex) = sample_exclude {
                if regex.is_match(sample_id) {
                    return false;
                }
            }

            true
        });

        let filtered_samples = self.samples.len();
        if initial_samples != filtered_samples {
            info!(
                "Sample filters: kept {} samples (removed {})",
                filtered_samples,
                initial_samples - filtered_samples
            );
        }
    }

    /// Log a short overview of the loaded pileups
    pub fn print_statistics(&self, phase: &str) {
        info!("📊 === PILEUP STATISTICS ({}) ===", phase);
        let entries: usize = self.samples.iter().map(|s| s.entries.len()).sum();
        let empty = self.samples.iter().filter(|s| s.entries.is_empty()).count();
        info!(
            "  📏 {} samples, {} pileup entries ({} records read, {} rejected)",
            self.samples.len(),
            entries,
            self.total_records,
            self.rejected_records
        );
        if empty > 0 {
            info!("  ⚠️  {} samples have no pileup data", empty);
        }
    }
}
