//! Reporting periods and the duration a subject's records cover.

use crate::error::{IncomeReportError, Result};
use crate::schema::IncomeRecord;
use crate::utils::{next_quarter, quarters_between, round2};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A (year, quarter) reporting interval.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct Period {
    pub year: i32,
    pub quarter: u8,
}

impl Period {
    pub fn new(year: i32, quarter: u8) -> Result<Self> {
        if !(1..=4).contains(&quarter) {
            return Err(IncomeReportError::InvalidQuarter(quarter));
        }
        Ok(Self { year, quarter })
    }

    /// Chronological ordering key `year * 10 + quarter`. Only meant for comparison.
    pub fn key(&self) -> i64 {
        self.year as i64 * 10 + self.quarter as i64
    }

    pub fn next(&self) -> Self {
        let (year, quarter) = next_quarter(self.year, self.quarter);
        Self { year, quarter }
    }

    /// Display label used on timelines and in detail rows, e.g. "2023 (Q1)".
    pub fn label(&self) -> String {
        format!("{} (Q{})", self.year, self.quarter)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Q{}", self.year, self.quarter)
    }
}

/// Earliest and latest period present in a subject's records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PeriodRange {
    pub first: Period,
    pub last: Period,
}

impl PeriodRange {
    pub fn from_periods<I>(subject: &str, periods: I) -> Result<Self>
    where
        I: IntoIterator<Item = Period>,
    {
        let mut range: Option<(Period, Period)> = None;

        for period in periods {
            let period = Period::new(period.year, period.quarter)?;
            range = Some(match range {
                None => (period, period),
                Some((first, last)) => (
                    if period.key() < first.key() { period } else { first },
                    if period.key() > last.key() { period } else { last },
                ),
            });
        }

        let (first, last) =
            range.ok_or_else(|| IncomeReportError::EmptyPeriod(subject.to_string()))?;
        Ok(Self { first, last })
    }

    pub fn from_records(subject: &str, records: &[IncomeRecord]) -> Result<Self> {
        Self::from_periods(subject, records.iter().map(IncomeRecord::period))
    }

    pub fn quarter_count(&self) -> u32 {
        quarters_between(self.first, self.last)
    }

    /// Every quarter from `first` to `last` inclusive, in chronological order.
    pub fn iter(&self) -> PeriodIter {
        PeriodIter {
            current: self.first,
            remaining: self.quarter_count(),
        }
    }

    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.first.year..=self.last.year
    }

    pub fn duration(&self) -> Duration {
        Duration::from_quarters(self.quarter_count())
    }
}

pub struct PeriodIter {
    current: Period,
    remaining: u32,
}

impl Iterator for PeriodIter {
    type Item = Period;

    fn next(&mut self) -> Option<Period> {
        if self.remaining == 0 {
            return None;
        }
        let period = self.current;
        self.current = self.current.next();
        self.remaining -= 1;
        Some(period)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

impl ExactSizeIterator for PeriodIter {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Duration {
    pub quarters: u32,
    pub months: u32,
    /// "<years> y." or "<years> y. <months> mo."
    pub display_text: String,
}

impl Duration {
    pub fn from_quarters(quarters: u32) -> Self {
        let months = quarters * 3;
        let display_text = if months % 12 == 0 {
            format!("{} y.", months / 12)
        } else {
            format!("{} y. {} mo.", months / 12, months % 12)
        };
        Self {
            quarters,
            months,
            display_text,
        }
    }
}

/// Duration covered by a set of periods. Fails with `EmptyPeriod` when no
/// period is given.
pub fn compute_duration<I>(subject: &str, periods: I) -> Result<Duration>
where
    I: IntoIterator<Item = Period>,
{
    Ok(PeriodRange::from_periods(subject, periods)?.duration())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProfitAverages {
    pub monthly: f64,
    pub yearly: f64,
}

/// Average profit per month over the covered duration, and that monthly
/// figure scaled to a year. Both are rounded to cents.
pub fn profit_averages(total_profit: f64, duration: &Duration) -> ProfitAverages {
    if duration.months == 0 {
        return ProfitAverages {
            monthly: 0.0,
            yearly: 0.0,
        };
    }
    let monthly = round2(total_profit / duration.months as f64);
    ProfitAverages {
        monthly,
        yearly: round2(monthly * 12.0),
    }
}
