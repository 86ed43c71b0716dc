use std::collections::HashMap;

use clap::ValueEnum;
use serde::Serialize;

use crate::parser::LogRecord;
use crate::stats::{mean, percentile, share};

/// Which statistics are computed per URL.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggMode {
    /// count, average, max and median
    #[default]
    #[value(alias = "agg_mean")]
    Mean,
    /// count, max, median, 95th and 99th percentiles
    #[value(alias = "agg_perc")]
    Percentile,
}

/// Statistics row for one URL. Field names are the report's JSON keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlAggregate {
    pub url: String,
    pub count: u64,
    pub count_perc: f64,
    pub time_sum: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_avg: Option<f64>,
    pub time_max: f64,
    pub time_med: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_p95: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_p99: Option<f64>,
    pub time_perc: f64,
}

/// Request times grouped by URL, in order of first appearance.
///
/// Aggregators built from separate chunks can be combined with [`merge`],
/// which keeps every sample, so the final statistics do not depend on how
/// the input was split.
///
/// [`merge`]: Aggregator::merge
#[derive(Debug, Default)]
pub struct Aggregator {
    index: HashMap<String, usize>,
    groups: Vec<(String, Vec<f64>)>,
    malformed: u64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one record. Records without a URL are only counted as malformed.
    pub fn push(&mut self, record: LogRecord) {
        match record.url {
            Some(url) => self.samples_mut(url).push(record.request_time),
            None => self.malformed += 1,
        }
    }

    pub fn merge(&mut self, other: Aggregator) {
        self.malformed += other.malformed;
        for (url, times) in other.groups {
            self.samples_mut(url).extend(times);
        }
    }

    fn samples_mut(&mut self, url: String) -> &mut Vec<f64> {
        let idx = match self.index.get(&url) {
            Some(&idx) => idx,
            None => {
                let idx = self.groups.len();
                self.index.insert(url.clone(), idx);
                self.groups.push((url, Vec::new()));
                idx
            }
        };
        &mut self.groups[idx].1
    }

    /// Number of grouped records (records with a URL).
    pub fn total_count(&self) -> u64 {
        self.groups.iter().map(|(_, t)| t.len() as u64).sum()
    }

    pub fn total_time(&self) -> f64 {
        self.groups.iter().map(|(_, t)| t.iter().sum::<f64>()).sum()
    }

    pub fn url_count(&self) -> usize {
        self.groups.len()
    }

    /// Records dropped because their request field had no URL.
    pub fn malformed(&self) -> u64 {
        self.malformed
    }

    /// Reduce every group to a statistics row, in first-appearance order.
    ///
    /// Percentages are relative to all grouped records, before any ranking
    /// or truncation.
    pub fn finish(self, mode: AggMode) -> Vec<UrlAggregate> {
        let total_count = self.total_count() as f64;
        let total_time = self.total_time();

        self.groups
            .into_iter()
            .map(|(url, mut times)| {
                let count = times.len() as u64;
                let time_sum: f64 = times.iter().sum();
                let time_avg = match mode {
                    AggMode::Mean => mean(&times),
                    AggMode::Percentile => None,
                };
                times.sort_unstable_by(f64::total_cmp);
                // every group holds at least one sample
                let time_max = times.last().copied().unwrap_or_default();
                let time_med = percentile(&times, 50.0).unwrap_or_default();
                let (time_p95, time_p99) = match mode {
                    AggMode::Mean => (None, None),
                    AggMode::Percentile => (percentile(&times, 95.0), percentile(&times, 99.0)),
                };
                UrlAggregate {
                    url,
                    count,
                    count_perc: share(count as f64, total_count),
                    time_sum,
                    time_avg,
                    time_max,
                    time_med,
                    time_p95,
                    time_p99,
                    time_perc: share(time_sum, total_time),
                }
            })
            .collect()
    }
}

impl Extend<LogRecord> for Aggregator {
    fn extend<T: IntoIterator<Item = LogRecord>>(&mut self, iter: T) {
        for record in iter {
            self.push(record);
        }
    }
}

impl FromIterator<LogRecord> for Aggregator {
    fn from_iter<T: IntoIterator<Item = LogRecord>>(iter: T) -> Self {
        let mut agg = Aggregator::new();
        agg.extend(iter);
        agg
    }
}
