use core::fmt;
use std::path::{Path, PathBuf};

use crate::aggregate::AggMode;
use crate::rank::REPORT_SIZE;
use crate::reader::DEFAULT_CHUNK_SIZE;
use crate::report::OutputFormat;

/// Everything a run needs, fixed before the pipeline starts.
#[derive(Debug, Clone)]
pub struct Config {
    /// Analyse this file instead of the newest one in `log_dir`.
    pub log_path: Option<PathBuf>,
    pub log_dir: PathBuf,
    pub report_dir: PathBuf,
    pub template_path: PathBuf,
    pub report_size: usize,
    pub chunk_size: usize,
    pub agg_mode: AggMode,
    pub format: OutputFormat,
}

impl Config {
    /// Defaults with the given directories; the HTML template is expected
    /// inside the report directory.
    pub fn with_dirs(log_dir: impl AsRef<Path>, report_dir: impl AsRef<Path>) -> Self {
        let report_dir = report_dir.as_ref().to_path_buf();
        Config {
            log_path: None,
            log_dir: log_dir.as_ref().to_path_buf(),
            template_path: report_dir.join("report.html"),
            report_dir,
            report_size: REPORT_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            agg_mode: AggMode::default(),
            format: OutputFormat::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::with_dirs("./log", "./reports")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    NoLogFile(PathBuf),
    LogDirUnreadable(PathBuf, walkdir::Error),
    NoDateInLogName(PathBuf),
    TemplateMissing(PathBuf),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLogFile(dir) => write!(f, "No log file found in {}", dir.display()),
            Self::LogDirUnreadable(dir, e) => {
                write!(f, "Cannot read log directory {}: {}", dir.display(), e)
            }
            Self::NoDateInLogName(path) => {
                write!(f, "No YYYYMMDD date in log file name {}", path.display())
            }
            Self::TemplateMissing(path) => {
                write!(f, "Report template {} not found", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::LogDirUnreadable(_, e) => Some(e),
            _ => None,
        }
    }
}
