//! Human-readable durations ("250ms", "30s", "5m", "24h", "1d") for config files.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer, Serializer};

/// Unit suffixes, longest first so "ms" wins over "m" and "s".
const UNITS: [(&str, u64); 5] = [
    ("ms", 1),
    ("d", 24 * 60 * 60 * 1000),
    ("h", 60 * 60 * 1000),
    ("m", 60 * 1000),
    ("s", 1000),
];

/// Parse a duration string like "250ms", "30s", "5m", "24h" or "1d".
///
/// Input is case-insensitive and surrounding whitespace is ignored.
///
/// ```
/// use tokenworth::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
/// assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();

    let (num, millis_per_unit) = UNITS
        .iter()
        .find_map(|(suffix, factor)| s.strip_suffix(suffix).map(|num| (num, *factor)))
        .context("Duration must end with ms, s, m, h, or d")?;

    if num.is_empty() || !num.bytes().all(|b| b.is_ascii_digit()) {
        anyhow::bail!("Invalid number in duration: {s:?}");
    }
    let num: u64 = num.parse().context("Invalid number in duration")?;

    let millis = num
        .checked_mul(millis_per_unit)
        .context("Duration is too large")?;

    Ok(Duration::from_millis(millis))
}

/// Format a duration using the largest unit that divides it evenly.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis == 0 {
        return "0s".to_string();
    }

    for (suffix, factor) in UNITS.iter().skip(1).chain(UNITS.iter().take(1)) {
        let factor = u128::from(*factor);
        if millis % factor == 0 {
            return format!("{}{suffix}", millis / factor);
        }
    }
    unreachable!("every duration is a whole number of milliseconds")
}

/// Serde deserializer for duration strings.
///
/// Use with `#[serde(deserialize_with = "deserialize_duration")]`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(de::Error::custom)
}

/// Serde serializer that writes durations back in the same string form.
pub fn serialize_duration<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_duration(*d))
}
