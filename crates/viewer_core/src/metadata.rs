//! Capture-timestamp resolution
//!
//! Shared by burst selection and the same-time badge: a fixed priority
//! order of metadata fields, normalized to second precision.

use chrono::NaiveDate;
use chrono::NaiveDateTime;
use viewer_fs::Metadata;

/// Fields tried in order; the first parseable one wins.
pub const CAPTURE_TIME_TAGS: &[&str] = &[
    "DateTimeOriginal",
    "CreateDate",
    "MediaCreateDate",
    "TrackCreateDate",
    "ModifyDate",
    "FileModifyDate",
];

/// Parse `YYYY-MM-DD(T| )HH:MM:SS` with `:` or `-` date delimiters.
/// Trailing timezone or fractional seconds are ignored.
pub fn normalize_capture_time(value: &str) -> Option<NaiveDateTime> {
    let s = value.trim();
    let b = s.as_bytes();
    if b.len() < 19 {
        return None;
    }

    let digits = [0, 1, 2, 3, 5, 6, 8, 9, 11, 12, 14, 15, 17, 18];
    if !digits.iter().all(|&i| b[i].is_ascii_digit()) {
        return None;
    }
    if !matches!(b[4], b':' | b'-') || !matches!(b[7], b':' | b'-') {
        return None;
    }
    if !matches!(b[10], b' ' | b'T') || b[13] != b':' || b[16] != b':' {
        return None;
    }

    let num = |range: std::ops::Range<usize>| s[range].parse::<u32>().ok();
    let year = s[0..4].parse::<i32>().ok()?;
    let (month, day) = (num(5..7)?, num(8..10)?);
    let (hour, min, sec) = (num(11..13)?, num(14..16)?, num(17..19)?);

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, min, sec)
}

/// First capture timestamp resolvable from the metadata, per the tag
/// priority order.
pub fn pick_capture_time(metadata: &Metadata) -> Option<NaiveDateTime> {
    CAPTURE_TIME_TAGS
        .iter()
        .filter_map(|tag| metadata.get(tag))
        .find_map(normalize_capture_time)
}

/// Second-precision grouping key (`2024-06-01T10:00:00`), used to count
/// entries captured in the same second.
pub fn capture_date_key(metadata: &Metadata) -> Option<String> {
    pick_capture_time(metadata).map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
}

/// Milliseconds since epoch, for burst-gap comparisons.
pub fn capture_time_ms(metadata: &Metadata) -> Option<i64> {
    pick_capture_time(metadata).map(|dt| dt.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, &str)]) -> Metadata {
        let mut m = Metadata::default();
        for (k, v) in pairs {
            m.insert(*k, *v);
        }
        m
    }

    #[test]
    fn test_parse_formats() {
        // Exif-style colons, space separator
        assert!(normalize_capture_time("2024:06:01 10:00:00").is_some());
        // ISO dashes, T separator
        assert!(normalize_capture_time("2024-06-01T10:00:00").is_some());
        // Trailing fraction / timezone ignored
        let a = normalize_capture_time("2024-06-01T10:00:00.123+09:00").unwrap();
        let b = normalize_capture_time("2024-06-01T10:00:00").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(normalize_capture_time("").is_none());
        assert!(normalize_capture_time("not a date").is_none());
        assert!(normalize_capture_time("2024-06-01").is_none());
        assert!(normalize_capture_time("2024/06/01 10:00:00").is_none());
        // Out-of-range calendar values
        assert!(normalize_capture_time("2024-13-01T10:00:00").is_none());
    }

    #[test]
    fn test_priority_order() {
        let m = meta(&[
            ("ModifyDate", "2024-06-02 12:00:00"),
            ("DateTimeOriginal", "2024:06:01 10:00:00"),
        ]);
        let dt = pick_capture_time(&m).unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-06-01");
    }

    #[test]
    fn test_unparseable_high_priority_falls_through() {
        let m = meta(&[
            ("DateTimeOriginal", "0000:00:00 00:00:00"),
            ("CreateDate", "2024:06:01 10:00:00"),
        ]);
        assert!(pick_capture_time(&m).is_some());
    }

    #[test]
    fn test_no_fields_means_no_timestamp() {
        let m = meta(&[("Model", "CAM-1")]);
        assert!(pick_capture_time(&m).is_none());
        assert!(capture_date_key(&m).is_none());
    }

    #[test]
    fn test_date_key_normalized() {
        let m = meta(&[("CreateDate", "2024:06:01 10:00:05.55")]);
        assert_eq!(
            capture_date_key(&m).as_deref(),
            Some("2024-06-01T10:00:05")
        );
    }
}
