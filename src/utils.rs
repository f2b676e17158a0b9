use crate::error::{IncomeReportError, Result};
use crate::period::Period;
use chrono::{Datelike, NaiveDate};

pub fn quarter_of_month(month: u32) -> u8 {
    ((month.clamp(1, 12) - 1) / 3 + 1) as u8
}

pub fn quarter_of_date(date: NaiveDate) -> Period {
    Period {
        year: date.year(),
        quarter: quarter_of_month(date.month()),
    }
}

pub fn next_quarter(year: i32, quarter: u8) -> (i32, u8) {
    if quarter >= 4 {
        (year + 1, 1)
    } else {
        (year, quarter + 1)
    }
}

/// Number of quarters covered from `first` to `last`, both inclusive.
///
/// Counts the quarters left in the first year, the quarters used in the last
/// year, and four for every whole year in between. Assumes `first <= last`.
pub fn quarters_between(first: Period, last: Period) -> u32 {
    if first.year == last.year {
        (last.quarter as i64 - first.quarter as i64 + 1).max(0) as u32
    } else {
        let partial_first = 5 - first.quarter as i64;
        let partial_last = last.quarter as i64;
        let whole_years = (last.year as i64 - first.year as i64 - 1) * 4;
        (partial_first + partial_last + whole_years).max(0) as u32
    }
}

/// Rounds to cents, the precision every displayed total uses.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parses a period string in the format "YYYY-Qn" (e.g. "2023-Q1").
pub fn parse_period_string(period: &str) -> Result<Period> {
    let (year, quarter) = period
        .trim()
        .split_once('-')
        .ok_or_else(|| IncomeReportError::PeriodParse(period.to_string()))?;

    let year: i32 = year
        .parse()
        .map_err(|_| IncomeReportError::PeriodParse(period.to_string()))?;

    let quarter: u8 = quarter
        .strip_prefix('Q')
        .or_else(|| quarter.strip_prefix('q'))
        .and_then(|q| q.parse().ok())
        .ok_or_else(|| IncomeReportError::PeriodParse(period.to_string()))?;

    Period::new(year, quarter)
}
