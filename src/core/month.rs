use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonthParseError {
    #[error("expected a YYYY-MM month, got {0:?}")]
    Shape(String),
    #[error("month must be between 1 and 12, got {0}")]
    MonthOutOfRange(u32),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u8,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, MonthParseError> {
        if !(1..=12).contains(&month) {
            return Err(MonthParseError::MonthOutOfRange(month));
        }
        Ok(Self {
            year,
            month: month as u8,
        })
    }

    pub fn from_abs(abs: i32) -> Self {
        Self {
            year: abs.div_euclid(12),
            month: (abs.rem_euclid(12) + 1) as u8,
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    /// 1-based month of the year.
    pub fn month(self) -> u32 {
        u32::from(self.month)
    }

    pub fn to_abs(self) -> i32 {
        self.year * 12 + i32::from(self.month) - 1
    }

    pub fn current() -> Self {
        let now = jiff::Zoned::now();
        Self {
            year: i32::from(now.year()),
            month: now.month() as u8,
        }
    }

    /// "Mon YYYY", e.g. "Mar 2031".
    pub fn label(self) -> String {
        format!(
            "{} {:04}",
            MONTH_ABBREVIATIONS[usize::from(self.month - 1)],
            self.year
        )
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let shape = || MonthParseError::Shape(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(shape)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(shape());
        }
        if !year.bytes().all(|b| b.is_ascii_digit()) || !month.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(shape());
        }
        let year = year.parse::<i32>().map_err(|_| shape())?;
        let month = month.parse::<u32>().map_err(|_| shape())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = MonthParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// Formats a `"YYYY-MM"` string as `"Mon YYYY"`.
pub fn format_month(month: &str) -> Result<String, MonthParseError> {
    Ok(month.parse::<YearMonth>()?.label())
}

/// The current local calendar month as `"YYYY-MM"`.
pub fn current_month() -> String {
    YearMonth::current().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert_eq, proptest};

    #[test]
    fn parses_and_prints_round_months() {
        let ym: YearMonth = "2031-03".parse().expect("valid month");
        assert_eq!(ym.year(), 2031);
        assert_eq!(ym.month(), 3);
        assert_eq!(ym.to_string(), "2031-03");
    }

    #[test]
    fn accepts_single_digit_month() {
        let ym: YearMonth = "2026-6".parse().expect("valid month");
        assert_eq!(ym.to_string(), "2026-06");
    }

    #[test]
    fn rejects_malformed_strings() {
        for bad in ["", "2031", "31-03", "2031-13", "2031-00", "2031-ab", "2031-03-01"] {
            assert!(bad.parse::<YearMonth>().is_err(), "{bad:?} should not parse");
        }
        assert_eq!(
            "2031-13".parse::<YearMonth>(),
            Err(MonthParseError::MonthOutOfRange(13))
        );
    }

    #[test]
    fn abs_encoding_is_year_times_twelve_plus_zero_based_month() {
        let ym = YearMonth::new(2025, 1).expect("valid");
        assert_eq!(ym.to_abs(), 2025 * 12);
        let dec = YearMonth::new(2024, 12).expect("valid");
        assert_eq!(dec.to_abs() + 1, ym.to_abs());
    }

    #[test]
    fn format_month_uses_three_letter_abbreviation() {
        assert_eq!(format_month("2031-01").as_deref(), Ok("Jan 2031"));
        assert_eq!(format_month("2024-12").as_deref(), Ok("Dec 2024"));
        assert!(format_month("December 2024").is_err());
    }

    #[test]
    fn current_month_is_in_wire_format() {
        let now = current_month();
        assert_eq!(now.len(), 7);
        assert!(now.parse::<YearMonth>().is_ok());
    }

    #[test]
    fn serde_uses_string_form() {
        let ym = YearMonth::new(2030, 7).expect("valid");
        let json = serde_json::to_string(&ym).expect("serializes");
        assert_eq!(json, "\"2030-07\"");
        let back: YearMonth = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(back, ym);
        assert!(serde_json::from_str::<YearMonth>("\"2030-99\"").is_err());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_abs_conversion_is_lossless(abs in 0i32..(9999 * 12)) {
            let ym = YearMonth::from_abs(abs);
            prop_assert_eq!(ym.to_abs(), abs);
        }
    }
}
