use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::{
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
};

use crate::config::ConfigError;
use crate::rank::Report;

/// Line marker in the HTML template replaced by the report rows.
pub const TABLE_MARKER: &str = "$table_json";
/// The HTML table never embeds more rows than this.
pub const HTML_TABLE_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Html,
    Json,
}

impl OutputFormat {
    /// Anything other than `json` produces an HTML report.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "html" => OutputFormat::Html,
            other => {
                tracing::warn!("Unknown output format {:?}, writing html", other);
                OutputFormat::Html
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Json => "json",
        }
    }
}

/// `report_dir/report-YYYY.MM.DD.<ext>`, dated from the first valid
/// `YYYYMMDD` in the log file name.
pub fn report_path(report_dir: &Path, log_path: &Path, format: OutputFormat) -> Result<PathBuf> {
    let name = log_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ConfigError::NoDateInLogName(log_path.to_path_buf()))?;
    let re = Regex::new(r"\d{8}")?;
    let date = re
        .find_iter(name)
        .find_map(|m| NaiveDate::parse_from_str(m.as_str(), "%Y%m%d").ok())
        .ok_or_else(|| ConfigError::NoDateInLogName(log_path.to_path_buf()))?;
    Ok(report_dir.join(format!(
        "report-{}.{}",
        date.format("%Y.%m.%d"),
        format.extension()
    )))
}

/// Write through a sibling temp file so `path` only ever holds a complete
/// report.
fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let result = File::create(&tmp)
        .with_context(|| format!("create {} failed", tmp.display()))
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write(&mut writer)?;
            writer.flush()?;
            Ok(())
        })
        .and_then(|()| {
            fs::rename(&tmp, path).with_context(|| format!("rename to {} failed", path.display()))
        });
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

pub fn emit_json(report: &Report, path: &Path) -> Result<()> {
    write_atomically(path, |w| {
        serde_json::to_writer(w, report)?;
        Ok(())
    })
}

/// Copy `template` to `path`, replacing the [`TABLE_MARKER`] with the rows
/// as a JSON array.
pub fn emit_html(report: &Report, template: &Path, path: &Path) -> Result<()> {
    let template_file = match File::open(template) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::TemplateMissing(template.to_path_buf()).into())
        }
        Err(e) => {
            return Err(e).with_context(|| format!("open {} failed", template.display()))
        }
    };
    let table_json = serde_json::to_string(report.head(HTML_TABLE_LIMIT))?;

    write_atomically(path, |w| {
        let mut template = BufReader::new(template_file);
        let mut line = String::new();
        while template.read_line(&mut line)? > 0 {
            if line.contains(TABLE_MARKER) {
                w.write_all(line.replace(TABLE_MARKER, &table_json).as_bytes())?;
            } else {
                w.write_all(line.as_bytes())?;
            }
            line.clear();
        }
        Ok(())
    })
}
