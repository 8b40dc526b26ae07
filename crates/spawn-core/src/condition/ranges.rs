//! Integer range lists such as `"0-3,5"` and named time-of-day ranges.

use std::ops::RangeInclusive;
use std::str::FromStr;

use thiserror::Error;

/// Length of a day in ticks.
pub const DAY_LENGTH: i64 = 24_000;

/// Named time-of-day ranges, in day ticks.
const NAMED_TIMES: &[(&str, &[(i64, i64)])] = &[
    ("any", &[(0, 23_999)]),
    ("day", &[(23_460, 23_999), (0, 12_541)]),
    ("night", &[(12_542, 23_459)]),
    ("morning", &[(0, 4_999)]),
    ("noon", &[(5_000, 6_999)]),
    ("afternoon", &[(7_000, 11_999)]),
    ("evening", &[(12_000, 13_799)]),
    ("dusk", &[(12_000, 13_799)]),
    ("midnight", &[(17_000, 18_999)]),
    ("dawn", &[(22_300, 23_999)]),
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid range `{0}`")]
pub struct RangeParseError(pub String);

/// A union of inclusive integer ranges.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct IntRanges {
    ranges: Vec<RangeInclusive<i64>>,
}

impl IntRanges {
    pub fn contains(&self, value: i64) -> bool {
        self.ranges.iter().any(|range| range.contains(&value))
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    fn push(&mut self, start: i64, end: i64) {
        self.ranges.push(start..=end);
    }

    /// Parses a time range list. Items are either a named range (`day`,
    /// `night`, `noon`, ...) or `a-b` in day ticks; `a > b` wraps past
    /// midnight.
    pub fn parse_time(text: &str) -> Result<Self, RangeParseError> {
        let mut ranges = IntRanges::default();
        for item in text.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            if let Some((_, named)) = NAMED_TIMES.iter().find(|(name, _)| *name == item) {
                for (start, end) in named.iter() {
                    ranges.push(*start, *end);
                }
                continue;
            }
            let (start, end) = parse_pair(item)?;
            if start <= end {
                ranges.push(start, end);
            } else {
                ranges.push(start, DAY_LENGTH - 1);
                ranges.push(0, end);
            }
        }
        if ranges.is_empty() {
            return Err(RangeParseError(text.to_string()));
        }
        Ok(ranges)
    }
}

impl FromStr for IntRanges {
    type Err = RangeParseError;

    /// Parses `"0-3,5"`: comma-separated single values or inclusive pairs.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut ranges = IntRanges::default();
        for item in text.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            let (start, end) = parse_pair(item)?;
            if start > end {
                return Err(RangeParseError(item.to_string()));
            }
            ranges.push(start, end);
        }
        if ranges.is_empty() {
            return Err(RangeParseError(text.to_string()));
        }
        Ok(ranges)
    }
}

fn parse_pair(item: &str) -> Result<(i64, i64), RangeParseError> {
    let invalid = || RangeParseError(item.to_string());
    match item.split_once('-') {
        Some((start, end)) => {
            let start = start.trim().parse().map_err(|_| invalid())?;
            let end = end.trim().parse().map_err(|_| invalid())?;
            Ok((start, end))
        }
        None => {
            let value = item.parse().map_err(|_| invalid())?;
            Ok((value, value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_list() {
        let ranges: IntRanges = "0-3,5".parse().unwrap();
        assert!(ranges.contains(0));
        assert!(ranges.contains(3));
        assert!(!ranges.contains(4));
        assert!(ranges.contains(5));
        assert!(!ranges.contains(6));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("full".parse::<IntRanges>().is_err());
        assert!("5-2".parse::<IntRanges>().is_err());
        assert!("".parse::<IntRanges>().is_err());
    }

    #[test]
    fn test_named_time_ranges() {
        let night = IntRanges::parse_time("night").unwrap();
        assert!(night.contains(18_000));
        assert!(!night.contains(6_000));
        let day = IntRanges::parse_time("day").unwrap();
        assert!(day.contains(23_500));
        assert!(day.contains(6_000));
    }

    #[test]
    fn test_wrapping_time_range() {
        let ranges = IntRanges::parse_time("22000-2000").unwrap();
        assert!(ranges.contains(23_000));
        assert!(ranges.contains(1_000));
        assert!(!ranges.contains(12_000));
    }
}
