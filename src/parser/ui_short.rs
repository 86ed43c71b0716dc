// parse nginx `ui_short` log format:
//
// log_format ui_short '$remote_addr $remote_user $http_x_real_ip [$time_local] "$request" '
//                     '$status $body_bytes_sent "$http_referer" '
//                     '"$http_user_agent" "$http_x_forwarded_for" "$http_X_REQUEST_ID" "$http_X_RB_USER" '
//                     '$request_time';

use super::{tokenize, LogParser, LogRecord};
use anyhow::{bail, Context, Result};

/// Position of `"$request"` once the line is tokenized.
const REQUEST_FIELD: usize = 4;
/// Position of `$request_time`, the last of the format's fields.
const REQUEST_TIME_FIELD: usize = 12;
const FIELD_COUNT: usize = REQUEST_TIME_FIELD + 1;

#[derive(Default)]
pub struct UiShortParser {}

impl LogParser for UiShortParser {
    fn parse(&self, line: &str) -> Result<LogRecord> {
        let fields = tokenize(line);
        if fields.len() != FIELD_COUNT {
            bail!(
                "unexpected format: {} fields, expected {}",
                fields.len(),
                FIELD_COUNT
            );
        }

        let request = fields[REQUEST_FIELD];
        let time_str = fields[REQUEST_TIME_FIELD];
        let request_time: f64 = time_str
            .parse()
            .with_context(|| format!("invalid request time {:?}", time_str))?;
        if !request_time.is_finite() || request_time < 0.0 {
            bail!("request time out of range: {}", request_time);
        }

        // METHOD URL PROTOCOL, only URL is kept
        let url = request.split_whitespace().nth(1).map(str::to_string);

        Ok(LogRecord { url, request_time })
    }
}
