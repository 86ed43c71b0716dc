use anyhow::{Context, Result};
use std::{
    fs,
    io::{self, BufRead},
    path::{Path, PathBuf},
    time::Instant,
};

use crate::aggregate::{AggMode, Aggregator};
use crate::config::{Config, ConfigError};
use crate::discovery::newest_log;
use crate::parser::{ui_short::UiShortParser, LogParser};
use crate::progressbar;
use crate::rank::{rank, Report};
use crate::reader::ChunkedReader;
use crate::report::{emit_html, emit_json, report_path, OutputFormat};

/// Warn when more than this share of lines could not be used.
const ERROR_RATE_WARN: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Written(PathBuf),
    /// The report for this log date exists; nothing was read or written.
    AlreadyExists(PathBuf),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseStats {
    pub lines: u64,
    /// Records grouped under a URL.
    pub grouped: u64,
    /// Parsed, but the request field had no URL.
    pub malformed: u64,
    /// Lines that could not be parsed at all.
    pub skipped: u64,
}

impl ParseStats {
    pub fn error_rate(&self) -> f64 {
        if self.lines == 0 {
            0.0
        } else {
            (self.malformed + self.skipped) as f64 / self.lines as f64
        }
    }
}

/// Analyse the configured (or newest) log and write its report, unless a
/// report for the same date already exists.
pub fn run(config: &Config) -> Result<RunOutcome> {
    let log_path = match &config.log_path {
        Some(path) => path.clone(),
        None => newest_log(&config.log_dir)?,
    };
    let report_path = report_path(&config.report_dir, &log_path, config.format)?;
    if report_path.exists() {
        tracing::info!("Report {} already exists, skipping", report_path.display());
        return Ok(RunOutcome::AlreadyExists(report_path));
    }
    if config.format == OutputFormat::Html && !config.template_path.is_file() {
        return Err(ConfigError::TemplateMissing(config.template_path.clone()).into());
    }
    fs::create_dir_all(&config.report_dir)
        .with_context(|| format!("create {} failed", config.report_dir.display()))?;

    let report = analyze(&log_path, config)?;
    match config.format {
        OutputFormat::Json => emit_json(&report, &report_path)?,
        OutputFormat::Html => emit_html(&report, &config.template_path, &report_path)?,
    }
    tracing::info!(
        "Wrote {} rows to {}",
        report.len(),
        report_path.display()
    );
    Ok(RunOutcome::Written(report_path))
}

/// Parse, aggregate and rank one log file.
pub fn analyze(log_path: &Path, config: &Config) -> Result<Report> {
    let size = fs::metadata(log_path)
        .with_context(|| format!("stat {} failed", log_path.display()))?
        .len();
    tracing::info!(
        "Analysing {} ({})",
        log_path.display(),
        humansize::format_size(size, humansize::BINARY)
    );
    let start = Instant::now();

    // the reader, and any decompressor behind it, is dropped on every return
    let chunks = ChunkedReader::open(log_path, config.chunk_size)?;
    let (agg, stats) = aggregate_chunks(chunks, &UiShortParser::default())
        .with_context(|| format!("read {} failed", log_path.display()))?;
    let report = build_report(agg, config.agg_mode, config.report_size);

    tracing::info!(
        "Lines: {}, grouped: {}, malformed: {}, skipped: {}, report rows: {}, took {}",
        stats.lines,
        stats.grouped,
        stats.malformed,
        stats.skipped,
        report.len(),
        humantime::format_duration(start.elapsed())
    );
    if stats.error_rate() > ERROR_RATE_WARN {
        tracing::warn!(
            "{:.2}% of lines could not be used, is this a ui_short log?",
            stats.error_rate() * 100.0
        );
    }
    Ok(report)
}

/// Fold line batches into one aggregator. Each batch is reduced on its own
/// and merged, so only one batch of lines is alive at a time.
pub fn aggregate_chunks<R, P>(
    chunks: ChunkedReader<R>,
    parser: &P,
) -> io::Result<(Aggregator, ParseStats)>
where
    R: BufRead,
    P: LogParser,
{
    let progressbar = progressbar!();
    let mut total = Aggregator::new();
    let mut stats = ParseStats::default();

    for chunk in chunks {
        let chunk = chunk?;
        stats.lines += chunk.len() as u64;
        let mut partial = Aggregator::new();
        for line in &chunk {
            if line.trim().is_empty() {
                continue;
            }
            match parser.parse(line) {
                Ok(record) => partial.push(record),
                Err(e) => {
                    tracing::debug!("Skipping line ({:#}): {}", e, line);
                    stats.skipped += 1;
                }
            }
        }
        total.merge(partial);
        progressbar.inc(chunk.len() as u64);
    }
    progressbar.finish_and_clear();

    stats.grouped = total.total_count();
    stats.malformed = total.malformed();
    tracing::debug!("{} distinct URLs", total.url_count());
    Ok((total, stats))
}

pub fn build_report(agg: Aggregator, mode: AggMode, report_size: usize) -> Report {
    rank(agg.finish(mode), report_size)
}
