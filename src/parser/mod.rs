use anyhow::Result;

pub mod ui_short;

/// One access log line reduced to what the aggregation needs.
///
/// `url` is `None` when the request field is not a `METHOD PATH ...` triple
/// (e.g. a bare `"0"` left by a port scanner). Such records are never grouped.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub url: Option<String>,
    pub request_time: f64,
}

pub trait LogParser {
    fn parse(&self, line: &str) -> Result<LogRecord>;
}

/// Split a log line into fields.
///
/// Whitespace separates fields unless it sits inside double quotes or square
/// brackets, so `"GET /a HTTP/1.1"` and `[29/Jun/2017:03:50:22 +0300]` each
/// stay one field. Runs of separators collapse; the enclosing quotes or
/// brackets are stripped from the returned field.
pub fn tokenize(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_quotes = false;
    let mut in_brackets = false;

    for (i, c) in line.char_indices() {
        if c.is_whitespace() && !in_quotes && !in_brackets {
            if let Some(s) = start.take() {
                fields.push(strip_enclosing(&line[s..i]));
            }
            continue;
        }
        if start.is_none() {
            start = Some(i);
        }
        match c {
            '"' if !in_brackets => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            _ => {}
        }
    }
    if let Some(s) = start {
        fields.push(strip_enclosing(&line[s..]));
    }
    fields
}

fn strip_enclosing(field: &str) -> &str {
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .or_else(|| field.strip_prefix('[').and_then(|f| f.strip_suffix(']')))
        .unwrap_or(field)
}
