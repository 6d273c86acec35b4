use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use md5::{Digest, Md5};

/// Run identifier derived from a timestamp, microsecond precision.
///
/// `2025-03-04 05:06:07.123456 UTC` becomes `20250304T050607123456Z`.
pub fn generate_run_id(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%S%6fZ").to_string()
}

/// UTC calendar date used for the `dt=` partition.
pub fn partition_date(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

pub fn sanitize_partition_value(value: &str) -> String {
    value.trim().replace('/', "_")
}

pub fn checksum_md5(text: &str) -> String {
    format!("{:x}", Md5::digest(text.as_bytes()))
}

/// Collapse a payload into one JSON-lines record (trailing newline included).
pub fn to_single_line(raw_text: &str) -> String {
    let mut line = raw_text.trim().replace('\n', " ");
    line.push('\n');
    line
}

pub fn iso_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Parse a `key=value` CLI partition argument.
pub fn parse_partition(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{arg}'")),
    }
}

/// Parse a backoff unit given in (fractional) seconds.
pub fn parse_backoff(arg: &str) -> Result<Duration, String> {
    let secs: f64 = arg
        .trim()
        .parse()
        .map_err(|_| format!("expected seconds, got '{arg}'"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid backoff '{arg}': {e}"))
}
