use serde::Serialize;
use serde_json::{Map, Value};

use crate::aggregate::UrlAggregate;
use crate::stats::round3;

pub const REPORT_SIZE: usize = 1000;

/// Ranked rows, most expensive URL first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Report {
    rows: Vec<UrlAggregate>,
}

impl Report {
    pub fn rows(&self) -> &[UrlAggregate] {
        &self.rows
    }

    /// At most the first `n` rows.
    pub fn head(&self, n: usize) -> &[UrlAggregate] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as plain key/value records, for sinks that should not know
    /// about [`UrlAggregate`].
    pub fn records(&self) -> serde_json::Result<Vec<Map<String, Value>>> {
        self.rows
            .iter()
            .map(|row| match serde_json::to_value(row)? {
                Value::Object(map) => Ok(map),
                _ => Err(<serde_json::Error as serde::ser::Error>::custom(
                    "report row is not a JSON object",
                )),
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a Report {
    type Item = &'a UrlAggregate;
    type IntoIter = std::slice::Iter<'a, UrlAggregate>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Order by total time (descending, ties keep their input order), keep the
/// first `report_size` rows and round them for display.
///
/// Sorting happens on the unrounded values.
pub fn rank(mut rows: Vec<UrlAggregate>, report_size: usize) -> Report {
    rows.sort_by(|a, b| b.time_sum.total_cmp(&a.time_sum));
    rows.truncate(report_size);
    for row in &mut rows {
        round_row(row);
    }
    Report { rows }
}

fn round_row(row: &mut UrlAggregate) {
    row.count_perc = round3(row.count_perc);
    row.time_sum = round3(row.time_sum);
    row.time_avg = row.time_avg.map(round3);
    row.time_max = round3(row.time_max);
    row.time_med = round3(row.time_med);
    row.time_p95 = row.time_p95.map(round3);
    row.time_p99 = row.time_p99.map(round3);
    row.time_perc = round3(row.time_perc);
}
