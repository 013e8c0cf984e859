// tsv.rs - Tab-separated pileup and candidate pair loaders

use crate::data::candidates::CandidatePairs;
use crate::data::pileup::{PileupEntry, PileupSet, Strand};
use crate::data::reference::Reference;
use crate::error::{Result, SnpclustError};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

const PILEUP_COLUMNS: [&str; 7] = ["sample", "contig", "pos", "base", "qual", "read_id", "strand"];

/// Load a pileup table with the columns
/// `sample contig pos base qual read_id strand`.
///
/// `pos` is 1-based. Rows that cannot be parsed or placed on the reference
/// are counted as rejected and skipped; a missing column is fatal.
pub fn load_pileup_tsv(
    path: &Path,
    reference: &Reference,
    roster: Option<&HashSet<String>>,
) -> Result<PileupSet> {
    info!("📊 Loading pileup table: {}", path.display());

    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let mut columns = [0usize; 7];
    for (slot, name) in columns.iter_mut().zip(PILEUP_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| SnpclustError::parse(path, format!("missing column '{}'", name)))?;
    }

    let mut records = Vec::new();
    let mut unparsed = 0usize;
    for (row, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                // bad encoding or quoting: one row lost, not the table
                unparsed += 1;
                debug!("{}:{}: {}", path.display(), row + 2, e);
                continue;
            }
        };
        match parse_pileup_row(&record, &columns, reference) {
            Ok(parsed) => records.push(parsed),
            Err(reason) => {
                unparsed += 1;
                // header is line 1
                debug!("{}:{}: {}", path.display(), row + 2, reason);
            }
        }
    }

    let mut set = PileupSet::from_records(records, roster);
    set.total_records += unparsed;
    set.rejected_records += unparsed;

    if set.rejected_records > 0 {
        warn!(
            "⚠️  {} of {} pileup rows rejected (unparseable, off-reference or unknown sample)",
            set.rejected_records, set.total_records
        );
    }
    info!(
        "✅ Loaded {} pileup rows for {} samples",
        set.total_records - set.rejected_records,
        set.samples.len()
    );
    Ok(set)
}

fn parse_pileup_row(
    record: &StringRecord,
    columns: &[usize; 7],
    reference: &Reference,
) -> std::result::Result<(String, PileupEntry), String> {
    let field = |i: usize| -> std::result::Result<&str, String> {
        record
            .get(columns[i])
            .map(str::trim)
            .ok_or_else(|| format!("missing field '{}'", PILEUP_COLUMNS[i]))
    };

    let sample = field(0)?;
    if sample.is_empty() {
        return Err("empty sample id".to_string());
    }
    let contig = field(1)?;
    let pos: u64 = field(2)?
        .parse()
        .map_err(|_| format!("invalid position '{}'", field(2).unwrap_or_default()))?;
    if pos == 0 {
        return Err("position 0 in a 1-based table".to_string());
    }
    let coordinate = reference
        .coordinate(contig, pos - 1)
        .ok_or_else(|| format!("{}:{} is not on the reference", contig, pos))?;

    let base = match field(3)?.as_bytes() {
        [b] => *b,
        other => return Err(format!("base must be one character, got {:?}", other)),
    };
    let quality: u8 = field(4)?
        .parse()
        .map_err(|_| format!("invalid quality '{}'", field(4).unwrap_or_default()))?;
    let read_id = field(5)?.to_string();
    let strand = Strand::from_symbol(field(6)?)
        .ok_or_else(|| format!("invalid strand '{}'", field(6).unwrap_or_default()))?;

    Ok((
        sample.to_string(),
        PileupEntry {
            coordinate,
            base,
            quality,
            read_id,
            strand,
        },
    ))
}

/// Load candidate pairs: two sample ids per line, tab or space separated
pub fn load_candidate_pairs(path: &Path) -> Result<CandidatePairs> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_path(path)?;
    let mut pairs = CandidatePairs::new();

    for record in reader.records() {
        let record = record?;
        // a field may itself hold space-separated ids
        let mut ids = record.iter().flat_map(str::split_whitespace);
        match (ids.next(), ids.next()) {
            (Some(a), Some(b)) => {
                pairs.insert(a, b);
            }
            (None, _) => continue,
            (Some(_), None) => {
                let line = record.position().map_or(0, |p| p.line());
                return Err(SnpclustError::parse(
                    path,
                    format!("line {} needs two sample ids", line),
                ));
            }
        }
    }

    info!("📋 Loaded {} candidate pairs from '{}'", pairs.len(), path.display());
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn reference() -> Reference {
        Reference::from_lengths(vec![("chr", 10u64), ("pl", 5)])
    }

    #[test]
    fn test_load_pileup_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# produced by an upstream pileup step").unwrap();
        writeln!(file, "sample\tcontig\tpos\tbase\tqual\tread_id\tstrand").unwrap();
        writeln!(file, "s1\tchr\t1\tA\t30\tr1\t+").unwrap();
        writeln!(file, "s1\tpl\t2\tc\t25\tr2\t-").unwrap();
        writeln!(file, "s2\tchr\t10\tG\t40\tr3\t+").unwrap();
        writeln!(file, "s2\tchr\t11\tG\t40\tr4\t+").unwrap(); // off the contig
        writeln!(file, "s2\tchr\t0\tG\t40\tr5\t+").unwrap(); // 1-based
        writeln!(file, "s2\tchr\t3\tG\t-4\tr6\t+").unwrap(); // negative quality
        writeln!(file, "s2\tnope\t3\tG\t40\tr7\t+").unwrap();
        file.flush().unwrap();

        let set = load_pileup_tsv(file.path(), &reference(), None).unwrap();
        assert_eq!(set.total_records, 7);
        assert_eq!(set.rejected_records, 4);
        assert_eq!(set.sample_ids(), vec!["s1", "s2"]);
        assert_eq!(set.samples[0].entries[1].coordinate, 11);
        assert_eq!(set.samples[0].entries[1].strand, Strand::Reverse);
        assert_eq!(set.samples[1].entries[0].coordinate, 9);
    }

    #[test]
    fn test_undecodable_row_is_rejected_not_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sample\tcontig\tpos\tbase\tqual\tread_id\tstrand").unwrap();
        for pos in 1..=10 {
            writeln!(file, "s1\tchr\t{}\tA\t30\tr{}\t+", pos, pos).unwrap();
        }
        file.write_all(b"s1\tchr\t3\tA\t30\tbad\xff\xfe\t+\n").unwrap();
        writeln!(file, "s2\tpl\t1\tT\t30\tr1\t-").unwrap();
        file.flush().unwrap();

        let set = load_pileup_tsv(file.path(), &reference(), None).unwrap();
        assert_eq!(set.total_records, 12);
        assert_eq!(set.rejected_records, 1);
        assert_eq!(set.sample_ids(), vec!["s1", "s2"]);
        assert_eq!(set.samples[0].entries.len(), 10);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sample\tcontig\tpos\tbase\tqual\tread_id").unwrap();
        writeln!(file, "s1\tchr\t1\tA\t30\tr1").unwrap();
        file.flush().unwrap();
        let err = load_pileup_tsv(file.path(), &reference(), None).unwrap_err();
        assert!(err.to_string().contains("strand"));
    }

    #[test]
    fn test_load_candidate_pairs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# sketch hits").unwrap();
        writeln!(file, "s2\ts1").unwrap();
        writeln!(file, "s1 s2").unwrap();
        writeln!(file, "s1\ts3\t0.98").unwrap();
        file.flush().unwrap();
        let pairs = load_candidate_pairs(file.path()).unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.contains("s1", "s3"));
    }

    #[test]
    fn test_candidate_line_with_one_id_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "s1\ts2").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "s3").unwrap();
        file.flush().unwrap();
        let err = load_candidate_pairs(file.path()).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }
}
