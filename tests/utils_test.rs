use std::time::Duration;

use chrono::{TimeZone, Utc};
use sporlbronze::utils::*;

#[test]
fn test_generate_run_id_has_microseconds() {
    let ts = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap()
        + chrono::Duration::microseconds(123_456);

    assert_eq!(generate_run_id(ts), "20250304T050607123456Z");
}

#[test]
fn test_generate_run_id_differs_per_microsecond() {
    let ts = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
    let next = ts + chrono::Duration::microseconds(1);

    assert_ne!(generate_run_id(ts), generate_run_id(next));
}

#[test]
fn test_partition_date() {
    let ts = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
    assert_eq!(partition_date(ts), "2024-12-31");
}

#[test]
fn test_sanitize_partition_value() {
    assert_eq!(sanitize_partition_value("  videoclub "), "videoclub");
    assert_eq!(sanitize_partition_value("AC/DC"), "AC_DC");
    assert_eq!(sanitize_partition_value("/a/b/"), "_a_b_");
    assert_eq!(sanitize_partition_value("plain"), "plain");
}

#[test]
fn test_checksum_md5_known_vectors() {
    assert_eq!(checksum_md5(""), "d41d8cd98f00b204e9800998ecf8427e");
    assert_eq!(checksum_md5("abc"), "900150983cd24fb0d6963f7d28e17f72");
}

#[test]
fn test_to_single_line() {
    assert_eq!(to_single_line("{\"a\":1}"), "{\"a\":1}\n");
    assert_eq!(
        to_single_line("\n{\n  \"a\": 1\n}\n\n"),
        "{   \"a\": 1 }\n"
    );
}

#[test]
fn test_iso_timestamp_is_utc() {
    let ts = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    assert_eq!(iso_timestamp(ts), "2025-01-02T03:04:05.000000+00:00");
}

#[test]
fn test_parse_partition() {
    assert_eq!(
        parse_partition("q=videoclub").unwrap(),
        ("q".to_string(), "videoclub".to_string())
    );
    assert_eq!(
        parse_partition("q=a=b").unwrap(),
        ("q".to_string(), "a=b".to_string())
    );
    assert!(parse_partition("novalue").is_err());
    assert!(parse_partition("=x").is_err());
}

#[test]
fn test_parse_backoff() {
    assert_eq!(parse_backoff("1").unwrap(), Duration::from_secs(1));
    assert_eq!(parse_backoff("0.25").unwrap(), Duration::from_millis(250));
    assert_eq!(parse_backoff("0").unwrap(), Duration::ZERO);
    assert!(parse_backoff("-1").is_err());
    assert!(parse_backoff("NaN").is_err());
    assert!(parse_backoff("inf").is_err());
    assert!(parse_backoff("1e20").is_err());
    assert!(parse_backoff("soon").is_err());
}
