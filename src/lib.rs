//! Rank the URLs of an nginx `ui_short` access log by total response time.
//!
//! The pipeline is: [`reader::ChunkedReader`] yields bounded batches of lines,
//! [`parser::LogParser`] turns each line into a [`parser::LogRecord`],
//! [`aggregate::Aggregator`] groups them by URL, [`rank::rank`] orders and
//! truncates the rows and [`report`] writes them out.

pub mod aggregate;
pub mod config;
pub mod discovery;
pub mod parser;
pub mod pipeline;
pub mod rank;
pub mod reader;
pub mod report;
pub mod stats;

pub use aggregate::{AggMode, Aggregator, UrlAggregate};
pub use config::{Config, ConfigError};
pub use pipeline::{run, RunOutcome};
pub use rank::{Report, REPORT_SIZE};
pub use report::OutputFormat;

#[macro_export]
macro_rules! progressbar {
    () => {{
        let progressbar = indicatif::ProgressBar::new_spinner();
        if let Ok(style) =
            indicatif::ProgressStyle::with_template("{spinner} [{elapsed_precise}] {pos} lines ({per_sec})")
        {
            progressbar.set_style(style);
        }
        progressbar
    }};
}
