// metadata.rs - Per-sample sampling dates

use chrono::NaiveDate;
use std::collections::HashMap;

/// Sampling date per sample id. Samples may be undated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleDates {
    dates: HashMap<String, NaiveDate>,
}

impl SampleDates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous date if the sample was already present
    pub fn insert(&mut self, sample: impl Into<String>, date: NaiveDate) -> Option<NaiveDate> {
        self.dates.insert(sample.into(), date)
    }

    pub fn get(&self, sample: &str) -> Option<NaiveDate> {
        self.dates.get(sample).copied()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Absolute number of days between two sampling dates; `None` when
    /// either sample is undated
    pub fn date_difference(&self, a: &str, b: &str) -> Option<i64> {
        let (x, y) = (self.get(a)?, self.get(b)?);
        Some((x - y).num_days().abs())
    }

    /// Samples from `samples` that have no date
    pub fn undated<'a, I>(&self, samples: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        samples
            .into_iter()
            .filter(|s| !self.dates.contains_key(*s))
            .collect()
    }
}
