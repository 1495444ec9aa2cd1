//! Parses the "1d2h3m" duration style used throughout spec §6 CLI options
//! (`--snatch-timeout`, `--search-cadence`, ...), and the matching
//! `serde` wrapper so the same syntax works in the TOML config file.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration(pub StdDuration);

impl Duration {
    pub fn as_std(&self) -> StdDuration {
        self.0
    }

    pub fn from_secs(secs: u64) -> Self {
        Duration(StdDuration::from_secs(secs))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0.as_secs())
    }
}

impl FromStr for Duration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s).map(Duration)
    }
}

/// Parses strings like `"1d2h3m"`, `"30s"`, `"90"` (bare seconds) into a
/// [`std::time::Duration`]. Units: `d` (day), `h` (hour), `m` (minute),
/// `s` (second). Units may be combined in descending order; a bare
/// number with no suffix is interpreted as seconds.
pub fn parse_duration(s: &str) -> Result<StdDuration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(StdDuration::from_secs(secs));
    }

    let mut total_secs: u64 = 0;
    let mut number = String::new();
    let mut any_unit = false;

    for ch in s.chars() {
        if ch.is_ascii_digit() {
            number.push(ch);
            continue;
        }
        let value: u64 = number
            .parse()
            .map_err(|_| format!("invalid duration `{}`: expected a number before `{}`", s, ch))?;
        number.clear();
        let multiplier = match ch {
            'd' => 86_400,
            'h' => 3_600,
            'm' => 60,
            's' => 1,
            other => return Err(format!("invalid duration `{}`: unknown unit `{}`", s, other)),
        };
        total_secs += value * multiplier;
        any_unit = true;
    }

    if !number.is_empty() || !any_unit {
        return Err(format!("invalid duration `{}`: trailing number with no unit", s));
    }

    Ok(StdDuration::from_secs(total_secs))
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DurationVisitor;

        impl serde::de::Visitor<'_> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a duration string like `1d2h3m` or a number of seconds")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Duration::from_secs(v))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(Duration::from_secs(v.max(0) as u64))
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_combined_units() {
        assert_eq!(parse_duration("1d2h3m").unwrap(), StdDuration::from_secs(86_400 + 7_200 + 180));
    }

    #[test]
    fn parses_bare_seconds() {
        assert_eq!(parse_duration("30").unwrap(), StdDuration::from_secs(30));
        assert_eq!(parse_duration("30s").unwrap(), StdDuration::from_secs(30));
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(parse_duration("5x").is_err());
    }

    #[test]
    fn rejects_trailing_digits_without_unit() {
        assert!(parse_duration("1d2").is_err());
    }
}
