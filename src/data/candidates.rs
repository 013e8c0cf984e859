// candidates.rs - Candidate sample pairs from an external pre-filter

use std::collections::BTreeSet;

/// Unordered, deduplicated sample pairs to compute.
///
/// Each pair is stored with the lexicographically smaller id first.
/// Self-pairs are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatePairs {
    pairs: BTreeSet<(String, String)>,
}

impl CandidatePairs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every unordered pair of the given samples
    pub fn all<S: AsRef<str>>(samples: &[S]) -> Self {
        let mut pairs = Self::new();
        for (i, a) in samples.iter().enumerate() {
            for b in &samples[i + 1..] {
                pairs.insert(a.as_ref(), b.as_ref());
            }
        }
        pairs
    }

    /// Each query against each database sample, without query-query pairs
    pub fn between<Q: AsRef<str>, D: AsRef<str>>(queries: &[Q], database: &[D]) -> Self {
        let mut pairs = Self::new();
        for q in queries {
            for d in database {
                pairs.insert(q.as_ref(), d.as_ref());
            }
        }
        pairs
    }

    /// Add a pair; returns false for self-pairs and duplicates
    pub fn insert(&mut self, a: &str, b: &str) -> bool {
        if a == b {
            return false;
        }
        let key = if a < b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        };
        self.pairs.insert(key)
    }

    pub fn contains(&self, a: &str, b: &str) -> bool {
        let (x, y) = if a < b { (a, b) } else { (b, a) };
        self.pairs.contains(&(x.to_string(), y.to_string()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(a, b)| (a.as_str(), b.as_str()))
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for CandidatePairs {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut pairs = Self::new();
        for (a, b) in iter {
            pairs.insert(a, b);
        }
        pairs
    }
}
