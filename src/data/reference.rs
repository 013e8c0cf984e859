// reference.rs - Reference genome coordinate space

use crate::error::{Result, SnpclustError};
use bio::io::fasta;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// One reference contig placed in the global coordinate space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contig {
    pub name: String,
    pub length: u64,
    pub offset: u64,
}

/// Contigs concatenated in file order.
///
/// Pileups are addressed per contig; the core works on one linear
/// coordinate space, so `offset + pos` maps between the two.
#[derive(Debug, Clone, Default)]
pub struct Reference {
    contigs: Vec<Contig>,
    by_name: HashMap<String, usize>,
    total_length: u64,
}

impl Reference {
    /// Build from (name, length) pairs
    pub fn from_lengths<I, S>(contigs: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut reference = Reference::default();
        for (name, length) in contigs {
            reference.push(name.into(), length);
        }
        reference
    }

    /// Load contig names and lengths from a FASTA file
    pub fn from_fasta(path: &Path) -> Result<Self> {
        info!("🧬 Loading reference from {}", path.display());
        let reader = fasta::Reader::from_file(path)
            .map_err(|e| SnpclustError::parse(path, format!("cannot open FASTA: {}", e)))?;

        let mut reference = Reference::default();
        for record in reader.records() {
            let record = record
                .map_err(|e| SnpclustError::parse(path, format!("bad FASTA record: {}", e)))?;
            if reference.by_name.contains_key(record.id()) {
                return Err(SnpclustError::parse(
                    path,
                    format!("duplicate contig '{}'", record.id()),
                ));
            }
            reference.push(record.id().to_string(), record.seq().len() as u64);
        }

        if reference.contigs.is_empty() {
            return Err(SnpclustError::parse(path, "reference contains no sequences"));
        }
        info!(
            "✅ Reference loaded: {} contigs, {} bp",
            reference.contigs.len(),
            reference.total_length
        );
        Ok(reference)
    }

    fn push(&mut self, name: String, length: u64) {
        self.by_name.insert(name.clone(), self.contigs.len());
        self.contigs.push(Contig {
            name,
            length,
            offset: self.total_length,
        });
        self.total_length += length;
    }

    pub fn contigs(&self) -> &[Contig] {
        &self.contigs
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    /// Global 0-based coordinate of a 0-based contig position
    pub fn coordinate(&self, contig: &str, position: u64) -> Option<u64> {
        let contig = &self.contigs[*self.by_name.get(contig)?];
        (position < contig.length).then(|| contig.offset + position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_coordinates_are_concatenated() {
        let reference = Reference::from_lengths(vec![("chr", 100u64), ("plasmid", 20)]);
        assert_eq!(reference.total_length(), 120);
        assert_eq!(reference.coordinate("chr", 0), Some(0));
        assert_eq!(reference.coordinate("plasmid", 5), Some(105));
        assert_eq!(reference.coordinate("plasmid", 20), None);
        assert_eq!(reference.coordinate("missing", 1), None);
    }

    #[test]
    fn test_from_fasta() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, ">chr1 description").unwrap();
        writeln!(file, "ACGTACGTAC").unwrap();
        writeln!(file, "GT").unwrap();
        writeln!(file, ">p1").unwrap();
        writeln!(file, "AAAA").unwrap();
        file.flush().unwrap();

        let reference = Reference::from_fasta(file.path()).unwrap();
        assert_eq!(reference.contigs().len(), 2);
        assert_eq!(reference.contigs()[0].length, 12);
        assert_eq!(reference.coordinate("p1", 0), Some(12));
    }
}
