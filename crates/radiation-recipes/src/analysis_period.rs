//! Analysis period strings
//!
//! The radiation tool takes its run period as text, `M/D to M/D between
//! H and H @T` (start and end month/day, start and end hour, timesteps per
//! hour), with an optional trailing `*` for leap years. The `analysis-period`
//! value format is registered here, so an impossible period (`2/30`) is
//! rejected when inputs are validated, before any folder is staged.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Regular expression accepted by the `run_period` input
pub const ANALYSIS_PERIOD_PATTERN: &str = concat!(
    r"\s*\d{1,2}\s*/\s*\d{1,2}\s+to\s+\d{1,2}\s*/\s*\d{1,2}\s+",
    r"between\s+\d{1,2}\s+and\s+\d{1,2}\s+@\s*\d{1,2}\s*\*?\s*",
);

/// Value format checking that a period actually exists
pub const ANALYSIS_PERIOD_FORMAT: &str = "analysis-period";

/// Timesteps per hour the tool supports
pub const VALID_TIMESTEPS: [u32; 12] = [1, 2, 3, 4, 5, 6, 10, 12, 15, 20, 30, 60];

const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Errors raised while parsing an analysis period
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisPeriodError {
    #[error("Analysis period '{0}' is not formatted as 'M/D to M/D between H and H @T'")]
    Malformed(String),

    #[error("Month {0} is outside 1-12")]
    InvalidMonth(u32),

    #[error("Day {day} is not valid for month {month}")]
    InvalidDay { month: u32, day: u32 },

    #[error("Hour {0} is outside 0-23")]
    InvalidHour(u32),

    #[error("Timestep {0} is not one of 1, 2, 3, 4, 5, 6, 10, 12, 15, 20, 30, 60")]
    InvalidTimestep(u32),
}

/// A span of the year at a given number of timesteps per hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisPeriod {
    pub st_month: u32,
    pub st_day: u32,
    pub st_hour: u32,
    pub end_month: u32,
    pub end_day: u32,
    pub end_hour: u32,
    pub timestep: u32,
    pub is_leap_year: bool,
}

impl Default for AnalysisPeriod {
    /// The whole year at one timestep per hour
    fn default() -> Self {
        Self {
            st_month: 1,
            st_day: 1,
            st_hour: 0,
            end_month: 12,
            end_day: 31,
            end_hour: 23,
            timestep: 1,
            is_leap_year: false,
        }
    }
}

impl AnalysisPeriod {
    /// Parse and check an analysis period string
    pub fn parse(text: &str) -> Result<Self, AnalysisPeriodError> {
        let caps = period_regex()
            .and_then(|re| re.captures(text))
            .ok_or_else(|| AnalysisPeriodError::Malformed(text.to_string()))?;

        let number = |i: usize| -> Result<u32, AnalysisPeriodError> {
            caps.get(i)
                .and_then(|m| m.as_str().parse().ok())
                .ok_or_else(|| AnalysisPeriodError::Malformed(text.to_string()))
        };

        let period = Self {
            st_month: number(1)?,
            st_day: number(2)?,
            end_month: number(3)?,
            end_day: number(4)?,
            st_hour: number(5)?,
            end_hour: number(6)?,
            timestep: number(7)?,
            is_leap_year: caps.get(8).is_some(),
        };
        period.check()?;
        Ok(period)
    }

    /// Check month, day, hour and timestep ranges
    pub fn check(&self) -> Result<(), AnalysisPeriodError> {
        for (month, day) in [(self.st_month, self.st_day), (self.end_month, self.end_day)] {
            if !(1..=12).contains(&month) {
                return Err(AnalysisPeriodError::InvalidMonth(month));
            }
            if day == 0 || day > self.days_in_month(month) {
                return Err(AnalysisPeriodError::InvalidDay { month, day });
            }
        }
        for hour in [self.st_hour, self.end_hour] {
            if hour > 23 {
                return Err(AnalysisPeriodError::InvalidHour(hour));
            }
        }
        if !VALID_TIMESTEPS.contains(&self.timestep) {
            return Err(AnalysisPeriodError::InvalidTimestep(self.timestep));
        }
        Ok(())
    }

    /// Whether the period wraps over the end of the year
    pub fn is_reversed(&self) -> bool {
        (self.st_month, self.st_day) > (self.end_month, self.end_day)
    }

    fn days_in_month(&self, month: u32) -> u32 {
        if month == 2 && self.is_leap_year {
            29
        } else {
            DAYS_IN_MONTH[(month - 1) as usize]
        }
    }
}

impl FromStr for AnalysisPeriod {
    type Err = AnalysisPeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for AnalysisPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} to {}/{} between {} and {} @{}",
            self.st_month,
            self.st_day,
            self.end_month,
            self.end_day,
            self.st_hour,
            self.end_hour,
            self.timestep
        )?;
        if self.is_leap_year {
            f.write_str("*")?;
        }
        Ok(())
    }
}

fn period_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^\s*(\d{1,2})\s*/\s*(\d{1,2})\s+to\s+(\d{1,2})\s*/\s*(\d{1,2})\s+",
            r"between\s+(\d{1,2})\s+and\s+(\d{1,2})\s+@\s*(\d{1,2})\s*(\*)?\s*$",
        ))
        .ok()
    })
    .as_ref()
}

fn check_analysis_period(value: &str) -> Result<(), String> {
    AnalysisPeriod::parse(value)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

inventory::submit! {
    recipe_engine::ValueFormat {
        name: ANALYSIS_PERIOD_FORMAT,
        check: check_analysis_period,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_text() {
        let period = AnalysisPeriod::parse("1/1 to 12/31 between 0 and 23 @1").unwrap();
        assert_eq!(period, AnalysisPeriod::default());
        assert_eq!(period.to_string(), "1/1 to 12/31 between 0 and 23 @1");
    }

    #[test]
    fn test_summer_afternoons() {
        let period: AnalysisPeriod = "6/21 to 9/21 between 12 and 18 @4".parse().unwrap();
        assert_eq!(period.st_month, 6);
        assert_eq!(period.end_day, 21);
        assert_eq!(period.st_hour, 12);
        assert_eq!(period.timestep, 4);
        assert!(!period.is_reversed());
    }

    #[test]
    fn test_winter_wraps_year_end() {
        let period = AnalysisPeriod::parse("12/1 to 2/28 between 0 and 23 @1").unwrap();
        assert!(period.is_reversed());
    }

    #[test]
    fn test_leap_day_needs_marker() {
        assert_eq!(
            AnalysisPeriod::parse("2/29 to 3/1 between 0 and 23 @1"),
            Err(AnalysisPeriodError::InvalidDay { month: 2, day: 29 })
        );
        let period = AnalysisPeriod::parse("2/29 to 3/1 between 0 and 23 @1*").unwrap();
        assert!(period.is_leap_year);
        assert_eq!(period.to_string(), "2/29 to 3/1 between 0 and 23 @1*");
    }

    #[test]
    fn test_rejects_out_of_range_parts() {
        assert_eq!(
            AnalysisPeriod::parse("13/1 to 12/31 between 0 and 23 @1"),
            Err(AnalysisPeriodError::InvalidMonth(13))
        );
        assert_eq!(
            AnalysisPeriod::parse("4/31 to 12/31 between 0 and 23 @1"),
            Err(AnalysisPeriodError::InvalidDay { month: 4, day: 31 })
        );
        assert_eq!(
            AnalysisPeriod::parse("1/1 to 12/31 between 0 and 24 @1"),
            Err(AnalysisPeriodError::InvalidHour(24))
        );
        assert_eq!(
            AnalysisPeriod::parse("1/1 to 12/31 between 0 and 23 @7"),
            Err(AnalysisPeriodError::InvalidTimestep(7))
        );
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            AnalysisPeriod::parse("all year"),
            Err(AnalysisPeriodError::Malformed(_))
        ));
    }

    #[test]
    fn test_registered_format_rejects_missing_day() {
        let format = recipe_engine::find_format(ANALYSIS_PERIOD_FORMAT).unwrap();
        assert!((format.check)("1/1 to 12/31 between 0 and 23 @1").is_ok());
        assert_eq!(
            (format.check)("2/30 to 3/1 between 0 and 23 @1"),
            Err("Day 30 is not valid for month 2".to_string())
        );
    }

    #[test]
    fn test_pattern_agrees_with_parser() {
        let re = Regex::new(&format!("^(?:{})$", ANALYSIS_PERIOD_PATTERN)).unwrap();
        assert!(re.is_match("1/1 to 12/31 between 0 and 23 @1"));
        assert!(re.is_match("2/29 to 3/1 between 0 and 23 @1*"));
        assert!(!re.is_match("1/1 - 12/31"));
    }
}
