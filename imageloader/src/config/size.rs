//! Byte sizes written the way people write them ("512MB", "1 GB", "64k").

use thiserror::Error;

const KB: usize = 1024;
const MB: usize = KB * 1024;
const GB: usize = MB * 1024;

/// Longest suffixes first so "MB" is not read as "B".
const UNITS: &[(&str, usize)] = &[
    ("GB", GB),
    ("MB", MB),
    ("KB", KB),
    ("G", GB),
    ("M", MB),
    ("K", KB),
    ("B", 1),
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid size '{0}' - expected a whole number with an optional KB, MB or GB suffix")]
pub struct SizeParseError(String);

/// Parses a size into bytes. Suffixes are binary and case-insensitive; a
/// bare number is bytes.
///
/// ```
/// use imageloader::config::parse_size;
///
/// assert_eq!(parse_size("64k").unwrap(), 64 * 1024);
/// assert_eq!(parse_size("512 MB").unwrap(), 512 * 1024 * 1024);
/// assert_eq!(parse_size("1000").unwrap(), 1000);
/// ```
pub fn parse_size(input: &str) -> Result<usize, SizeParseError> {
    let err = || SizeParseError(input.to_string());
    let trimmed = input.trim();
    let upper = trimmed.to_ascii_uppercase();

    let (digits, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, mult)| upper.strip_suffix(suffix).map(|rest| (rest, *mult)))
        .unwrap_or((upper.as_str(), 1));

    let digits = digits.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }

    digits
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(err)
}

/// Formats bytes using the largest unit that divides evenly.
///
/// ```
/// use imageloader::config::format_size;
///
/// assert_eq!(format_size(3 * 1024 * 1024), "3MB");
/// assert_eq!(format_size(1536), "1536");
/// ```
pub fn format_size(bytes: usize) -> String {
    [("GB", GB), ("MB", MB), ("KB", KB)]
        .iter()
        .find(|(_, unit)| bytes >= *unit && bytes % unit == 0)
        .map(|(suffix, unit)| format!("{}{}", bytes / unit, suffix))
        .unwrap_or_else(|| bytes.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_size("0").unwrap(), 0);
        assert_eq!(parse_size("12B").unwrap(), 12);
        assert_eq!(parse_size("3kb").unwrap(), 3 * KB);
        assert_eq!(parse_size("3K").unwrap(), 3 * KB);
        assert_eq!(parse_size("256MB").unwrap(), 256 * MB);
        assert_eq!(parse_size("2g").unwrap(), 2 * GB);
    }

    #[test]
    fn test_parse_whitespace() {
        assert_eq!(parse_size("  128 MB ").unwrap(), 128 * MB);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "MB", "abc", "-5MB", "1.5GB", "2TB", "1 2MB", "+4K"] {
            assert!(parse_size(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_parse_overflow() {
        assert!(parse_size(&format!("{}GB", usize::MAX)).is_err());
    }

    #[test]
    fn test_format_roundtrip() {
        for s in ["1KB", "640KB", "96MB", "4GB", "1000"] {
            assert_eq!(format_size(parse_size(s).unwrap()), s);
        }
    }
}
