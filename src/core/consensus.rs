// consensus.rs - Per-sample consensus calling from read pileups

use crate::data::pileup::{PileupEntry, Strand};
use crate::error::{Result, SnpclustError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Highest Phred score accepted in a pileup record (Sanger '~')
pub const MAX_PHRED: u8 = 93;

/// Slack for fraction comparisons so an exact tie with a threshold stays a tie
const FRACTION_EPSILON: f64 = 1e-9;

/// A single DNA base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Nucleotide {
    A,
    C,
    G,
    T,
}

impl Nucleotide {
    pub const ALL: [Nucleotide; 4] = [Nucleotide::A, Nucleotide::C, Nucleotide::G, Nucleotide::T];

    /// Parse an upper- or lower-case base; anything but ACGT yields None
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'A' | b'a' => Some(Nucleotide::A),
            b'C' | b'c' => Some(Nucleotide::C),
            b'G' | b'g' => Some(Nucleotide::G),
            b'T' | b't' => Some(Nucleotide::T),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Nucleotide::A => b'A',
            Nucleotide::C => b'C',
            Nucleotide::G => b'G',
            Nucleotide::T => b'T',
        }
    }
}

/// A set of nucleotides packed into four bits (A=1, C=2, G=4, T=8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BaseSet(u8);

impl BaseSet {
    pub fn empty() -> Self {
        BaseSet(0)
    }

    pub fn insert(&mut self, base: Nucleotide) {
        self.0 |= 1 << base.index();
    }

    pub fn contains(self, base: Nucleotide) -> bool {
        self.0 & (1 << base.index()) != 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// IUPAC ambiguity code for the set
    pub fn iupac(self) -> u8 {
        match self.0 {
            0b0001 => b'A',
            0b0010 => b'C',
            0b0100 => b'G',
            0b1000 => b'T',
            0b0011 => b'M',
            0b0101 => b'R',
            0b1001 => b'W',
            0b0110 => b'S',
            0b1010 => b'Y',
            0b1100 => b'K',
            0b1110 => b'B',
            0b1101 => b'D',
            0b1011 => b'H',
            0b0111 => b'V',
            _ => b'N',
        }
    }
}

impl FromIterator<Nucleotide> for BaseSet {
    fn from_iter<I: IntoIterator<Item = Nucleotide>>(iter: I) -> Self {
        let mut set = BaseSet::empty();
        for base in iter {
            set.insert(base);
        }
        set
    }
}

/// Genotype inferred at one position for one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseCall {
    Base(Nucleotide),
    Ambiguous(BaseSet),
    NoCall,
}

impl BaseCall {
    /// Only single-base calls take part in distance computation
    pub fn confident_base(self) -> Option<Nucleotide> {
        match self {
            BaseCall::Base(base) => Some(base),
            _ => None,
        }
    }

    pub fn is_confident(self) -> bool {
        matches!(self, BaseCall::Base(_))
    }

    /// FASTA symbol: base, IUPAC code, or N
    pub fn symbol(self) -> u8 {
        match self {
            BaseCall::Base(base) => base.as_byte(),
            BaseCall::Ambiguous(set) => set.iupac(),
            BaseCall::NoCall => b'N',
        }
    }
}

/// Evidence and call for one coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionCall {
    pub coordinate: u64,
    pub call: BaseCall,
    pub depth: u32,
    pub confidence: f64,
}

/// Why a pileup record was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MalformedKind {
    QualityOutOfRange(u8),
    InvalidBase(u8),
    DuplicateRead(String),
    CoordinateOutOfRange,
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedKind::QualityOutOfRange(q) => {
                write!(f, "quality {} outside 0..={}", q, MAX_PHRED)
            }
            MalformedKind::InvalidBase(b) => write!(f, "invalid base {:?}", *b as char),
            MalformedKind::DuplicateRead(read) => write!(f, "read '{}' reported twice", read),
            MalformedKind::CoordinateOutOfRange => write!(f, "coordinate beyond reference"),
        }
    }
}

/// A rejected pileup record, kept for the caller to inspect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedRecord {
    pub sample_id: String,
    pub coordinate: u64,
    pub kind: MalformedKind,
}

/// Thresholds used to turn a pileup column into a call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Reads needed before any call is made
    pub min_depth: u32,
    /// Quality-weighted fraction the top base must strictly exceed
    pub min_call_fraction: f64,
    /// Bases within this fraction of the top base form an ambiguous call
    pub ambiguous_margin: f64,
    /// Bases below this Phred score are dropped from the tally
    pub min_base_quality: u8,
    /// Count a base only when both strands support it
    pub require_both_strands: bool,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            min_depth: 5,
            min_call_fraction: 0.8,
            ambiguous_margin: 0.2,
            min_base_quality: 0,
            require_both_strands: false,
        }
    }
}

impl ConsensusConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_depth == 0 {
            return Err(SnpclustError::config("min_depth must be at least 1"));
        }
        if !(0.5..1.0).contains(&self.min_call_fraction) {
            return Err(SnpclustError::config(format!(
                "min_call_fraction must be in [0.5, 1.0), got {}",
                self.min_call_fraction
            )));
        }
        if !(0.0..1.0).contains(&self.ambiguous_margin) {
            return Err(SnpclustError::config(format!(
                "ambiguous_margin must be in [0.0, 1.0), got {}",
                self.ambiguous_margin
            )));
        }
        if self.min_base_quality > MAX_PHRED {
            return Err(SnpclustError::config(format!(
                "min_base_quality must be at most {}",
                MAX_PHRED
            )));
        }
        Ok(())
    }
}

/// Per-position calls for one sample, sorted by coordinate.
///
/// Only coordinates with pileup evidence are stored. Anything else in
/// `0..reference_length` is an implicit no-call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleCallSet {
    sample_id: String,
    reference_length: u64,
    calls: Vec<PositionCall>,
    malformed: Vec<MalformedRecord>,
    records_seen: usize,
}

impl SampleCallSet {
    /// Call set for a sample with no pileup data at all
    pub fn empty(sample_id: impl Into<String>, reference_length: u64) -> Self {
        Self {
            sample_id: sample_id.into(),
            reference_length,
            calls: Vec::new(),
            malformed: Vec::new(),
            records_seen: 0,
        }
    }

    pub fn sample_id(&self) -> &str {
        &self.sample_id
    }

    pub fn reference_length(&self) -> u64 {
        self.reference_length
    }

    pub fn calls(&self) -> &[PositionCall] {
        &self.calls
    }

    pub fn malformed(&self) -> &[MalformedRecord] {
        &self.malformed
    }

    pub fn records_seen(&self) -> usize {
        self.records_seen
    }

    pub fn position(&self, coordinate: u64) -> Option<&PositionCall> {
        self.calls
            .binary_search_by_key(&coordinate, |c| c.coordinate)
            .ok()
            .map(|i| &self.calls[i])
    }

    /// Call at a coordinate, no-call when nothing was observed
    pub fn get(&self, coordinate: u64) -> BaseCall {
        self.position(coordinate)
            .map(|c| c.call)
            .unwrap_or(BaseCall::NoCall)
    }

    pub fn confident_sites(&self) -> usize {
        self.calls.iter().filter(|c| c.call.is_confident()).count()
    }

    pub fn ambiguous_sites(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c.call, BaseCall::Ambiguous(_)))
            .count()
    }

    /// Full-length consensus over the reference, N where nothing was called
    pub fn to_sequence(&self) -> Vec<u8> {
        let mut sequence = vec![b'N'; self.reference_length as usize];
        for call in &self.calls {
            sequence[call.coordinate as usize] = call.call.symbol();
        }
        sequence
    }
}

#[derive(Default)]
struct ColumnTally {
    weights: [f64; 4],
    forward: [u32; 4],
    reverse: [u32; 4],
    poisoned: bool,
}

/// Turns one sample's pileup into a [`SampleCallSet`]
pub struct ConsensusCaller {
    config: ConsensusConfig,
    reference_length: u64,
}

impl ConsensusCaller {
    pub fn new(config: ConsensusConfig, reference_length: u64) -> Self {
        Self {
            config,
            reference_length,
        }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Call every observed position of one sample.
    ///
    /// Entries may arrive in any order. They are sorted by coordinate and
    /// read id before tallying, so the result does not depend on input order.
    pub fn call(&self, sample_id: &str, entries: &[PileupEntry]) -> SampleCallSet {
        let mut malformed = Vec::new();

        let mut order: Vec<usize> = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if entry.coordinate >= self.reference_length {
                malformed.push(MalformedRecord {
                    sample_id: sample_id.to_string(),
                    coordinate: entry.coordinate,
                    kind: MalformedKind::CoordinateOutOfRange,
                });
            } else {
                order.push(i);
            }
        }
        order.sort_by(|&a, &b| {
            let (ea, eb) = (&entries[a], &entries[b]);
            ea.coordinate
                .cmp(&eb.coordinate)
                .then_with(|| ea.read_id.cmp(&eb.read_id))
                .then_with(|| a.cmp(&b))
        });

        let mut calls = Vec::new();
        let mut start = 0;
        while start < order.len() {
            let coordinate = entries[order[start]].coordinate;
            let mut end = start + 1;
            while end < order.len() && entries[order[end]].coordinate == coordinate {
                end += 1;
            }
            let column: Vec<&PileupEntry> = order[start..end].iter().map(|&i| &entries[i]).collect();
            calls.push(self.call_column(sample_id, coordinate, &column, &mut malformed));
            start = end;
        }

        if !malformed.is_empty() {
            warn!(
                "⚠️  Sample {}: {} malformed pileup records skipped",
                sample_id,
                malformed.len()
            );
            #[cfg(feature = "debug-stats")]
            for record in &malformed {
                debug!("   {}:{} {}", record.sample_id, record.coordinate, record.kind);
            }
        }

        let set = SampleCallSet {
            sample_id: sample_id.to_string(),
            reference_length: self.reference_length,
            calls,
            malformed,
            records_seen: entries.len(),
        };
        debug!(
            "Sample {}: {} positions observed, {} confident, {} ambiguous",
            set.sample_id,
            set.calls.len(),
            set.confident_sites(),
            set.ambiguous_sites()
        );
        set
    }

    /// Tally one coordinate. `column` is sorted by read id.
    fn call_column(
        &self,
        sample_id: &str,
        coordinate: u64,
        column: &[&PileupEntry],
        malformed: &mut Vec<MalformedRecord>,
    ) -> PositionCall {
        let mut tally = ColumnTally::default();
        let mut previous_read: Option<&str> = None;

        for entry in column {
            let reject = if previous_read == Some(entry.read_id.as_str()) {
                Some(MalformedKind::DuplicateRead(entry.read_id.clone()))
            } else if entry.quality > MAX_PHRED {
                Some(MalformedKind::QualityOutOfRange(entry.quality))
            } else if Nucleotide::from_byte(entry.base).is_none()
                && !matches!(entry.base, b'N' | b'n' | b'*')
            {
                Some(MalformedKind::InvalidBase(entry.base))
            } else {
                None
            };
            previous_read = Some(entry.read_id.as_str());

            if let Some(kind) = reject {
                tally.poisoned = true;
                malformed.push(MalformedRecord {
                    sample_id: sample_id.to_string(),
                    coordinate,
                    kind,
                });
                continue;
            }

            if entry.quality < self.config.min_base_quality {
                continue;
            }
            let Some(base) = Nucleotide::from_byte(entry.base) else {
                continue; // N or deletion
            };
            let i = base.index();
            tally.weights[i] += phred_weight(entry.quality);
            match entry.strand {
                Strand::Forward => tally.forward[i] += 1,
                Strand::Reverse => tally.reverse[i] += 1,
            }
        }

        if self.config.require_both_strands {
            for i in 0..4 {
                if tally.forward[i] == 0 || tally.reverse[i] == 0 {
                    tally.weights[i] = 0.0;
                    tally.forward[i] = 0;
                    tally.reverse[i] = 0;
                }
            }
        }

        let depth: u32 = (0..4).map(|i| tally.forward[i] + tally.reverse[i]).sum();
        let (call, confidence) = if tally.poisoned {
            (BaseCall::NoCall, 0.0)
        } else {
            self.decide(&tally.weights, depth)
        };

        PositionCall {
            coordinate,
            call,
            depth,
            confidence,
        }
    }

    /// Apply the depth, majority and near-tie rules to a weighted tally
    fn decide(&self, weights: &[f64; 4], depth: u32) -> (BaseCall, f64) {
        if depth < self.config.min_depth {
            return (BaseCall::NoCall, 0.0);
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return (BaseCall::NoCall, 0.0);
        }

        let fractions = weights.map(|w| w / total);
        let mut ranked = Nucleotide::ALL;
        ranked.sort_by(|a, b| fractions[b.index()].total_cmp(&fractions[a.index()]));
        let top = fractions[ranked[0].index()];
        let second = fractions[ranked[1].index()];

        if top > self.config.min_call_fraction + FRACTION_EPSILON {
            return (BaseCall::Base(ranked[0]), top);
        }

        let margin = self.config.ambiguous_margin + FRACTION_EPSILON;
        if second > 0.0 && top - second <= margin {
            let set: BaseSet = Nucleotide::ALL
                .into_iter()
                .filter(|b| fractions[b.index()] > 0.0 && top - fractions[b.index()] <= margin)
                .collect();
            let confidence = Nucleotide::ALL
                .into_iter()
                .filter(|b| set.contains(*b))
                .map(|b| fractions[b.index()])
                .sum();
            return (BaseCall::Ambiguous(set), confidence);
        }

        (BaseCall::NoCall, 0.0)
    }
}

/// Probability that a base with this Phred score is correct
fn phred_weight(quality: u8) -> f64 {
    1.0 - 10f64.powf(-(quality as f64) / 10.0)
}
