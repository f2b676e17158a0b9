use crate::error::{IncomeReportError, Result};
use crate::schema::IncomeRecord;
use crate::utils::quarter_of_date;
use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the flat registry extract, before it is split per subject.
///
/// The period is taken from `year` + `quarter` when both are present,
/// otherwise from the quarter `date` falls in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIncomeRow {
    pub subject: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub quarter: Option<u8>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub employer_id: String,
    #[serde(default)]
    pub employer_name: String,
    pub income: f64,
    #[serde(default)]
    pub tax: f64,
    /// Income net of tax; computed as `income - tax` when absent.
    #[serde(default)]
    pub profit: Option<f64>,
    pub income_type_code: String,
}

impl RawIncomeRow {
    pub fn into_record(self) -> Result<IncomeRecord> {
        let (year, quarter) = match (self.year, self.quarter, self.date) {
            (Some(year), Some(quarter), _) => (year, quarter),
            (_, _, Some(date)) => {
                let period = quarter_of_date(date);
                (period.year, period.quarter)
            }
            _ => {
                return Err(IncomeReportError::ValidationError {
                    subject: self.subject,
                    details: format!(
                        "Row for employer {} has neither year/quarter nor a date",
                        self.employer_id
                    ),
                })
            }
        };

        Ok(IncomeRecord {
            year,
            quarter,
            profit: self.profit.unwrap_or(self.income - self.tax),
            employer_id: self.employer_id,
            employer_name: self.employer_name,
            income: self.income,
            tax: self.tax,
            income_type_code: self.income_type_code,
        })
    }
}

/// Subject ids shorter than this are not personal ids and are dropped.
pub const MIN_SUBJECT_ID_LEN: usize = 7;

/// Records split per subject, plus the subjects that could not be read.
///
/// A subject with one unreadable row is moved to `failures` as a whole, so
/// no report is ever built from a partial record set.
#[derive(Debug, Default)]
pub struct IngestedSubjects {
    pub subjects: BTreeMap<String, Vec<IncomeRecord>>,
    pub failures: Vec<(String, IncomeReportError)>,
}

impl IngestedSubjects {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Splits a flat table into per-subject record sets, keeping row order
/// within each subject. Rows whose subject id is shorter than
/// [`MIN_SUBJECT_ID_LEN`] are dropped.
pub fn group_by_subject(rows: Vec<RawIncomeRow>) -> IngestedSubjects {
    let mut grouped: BTreeMap<String, Result<Vec<IncomeRecord>>> = BTreeMap::new();
    let mut skipped = 0usize;

    for row in rows {
        let subject = row.subject.trim().to_string();
        if subject.chars().count() < MIN_SUBJECT_ID_LEN {
            skipped += 1;
            continue;
        }

        let slot = grouped.entry(subject).or_insert_with(|| Ok(Vec::new()));
        if slot.is_err() {
            continue;
        }
        match row.into_record() {
            Ok(record) => {
                if let Ok(records) = slot {
                    records.push(record);
                }
            }
            Err(e) => {
                warn!("{}", e);
                *slot = Err(e);
            }
        }
    }

    if skipped > 0 {
        debug!("Skipped {} rows without a valid subject id", skipped);
    }

    let mut ingested = IngestedSubjects::default();
    for (subject, result) in grouped {
        match result {
            Ok(records) => {
                ingested.subjects.insert(subject, records);
            }
            Err(e) => ingested.failures.push((subject, e)),
        }
    }
    ingested
}

pub fn rows_from_json(json: &str) -> Result<Vec<RawIncomeRow>> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(subject: &str) -> RawIncomeRow {
        RawIncomeRow {
            subject: subject.to_string(),
            year: Some(2022),
            quarter: Some(2),
            date: None,
            employer_id: "12345678".to_string(),
            employer_name: "Acme".to_string(),
            income: 1000.0,
            tax: 195.0,
            profit: None,
            income_type_code: "101".to_string(),
        }
    }

    #[test]
    fn test_profit_defaults_to_income_minus_tax() {
        let record = row("1234567890").into_record().unwrap();
        assert_eq!(record.profit, 805.0);

        let mut supplied = row("1234567890");
        supplied.profit = Some(900.0);
        assert_eq!(supplied.into_record().unwrap().profit, 900.0);
    }

    #[test]
    fn test_period_from_date() {
        let mut dated = row("1234567890");
        dated.year = None;
        dated.quarter = None;
        dated.date = NaiveDate::from_ymd_opt(2021, 11, 3);
        let record = dated.into_record().unwrap();
        assert_eq!((record.year, record.quarter), (2021, 4));

        let mut undated = row("1234567890");
        undated.quarter = None;
        assert!(matches!(
            undated.into_record(),
            Err(IncomeReportError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_group_by_subject() {
        let rows = vec![row("2222222222"), row(" "), row("1111111111"), row("2222222222")];
        let ingested = group_by_subject(rows);
        assert!(ingested.is_clean());
        assert_eq!(ingested.subjects.len(), 2);
        assert_eq!(ingested.subjects["2222222222"].len(), 2);
        assert_eq!(ingested.subjects["1111111111"].len(), 1);
    }

    #[test]
    fn test_short_subject_ids_are_dropped() {
        let rows = vec![row("123456"), row("1234567"), row("  42  ")];
        let ingested = group_by_subject(rows);
        let subjects: Vec<&str> = ingested.subjects.keys().map(String::as_str).collect();
        assert_eq!(subjects, vec!["1234567"]);
        assert!(ingested.is_clean());
    }

    #[test]
    fn test_bad_row_fails_only_its_subject() {
        let mut first = row("1111111111");
        first.quarter = Some(1);
        let mut undated = row("2222222222");
        undated.quarter = None;
        let mut third = row("3333333333");
        third.quarter = Some(2);
        let rows = vec![first, row("2222222222"), undated, third, row("2222222222")];

        let ingested = group_by_subject(rows);

        let subjects: Vec<&str> = ingested.subjects.keys().map(String::as_str).collect();
        assert_eq!(subjects, vec!["1111111111", "3333333333"]);
        assert_eq!(ingested.subjects["1111111111"][0].quarter, 1);
        assert_eq!(ingested.subjects["3333333333"][0].quarter, 2);

        assert_eq!(ingested.failures.len(), 1);
        assert!(matches!(
            &ingested.failures[0],
            (s, IncomeReportError::ValidationError { subject, .. })
                if s == "2222222222" && subject == "2222222222"
        ));
    }

    #[test]
    fn test_rows_from_json() {
        let rows = rows_from_json(
            r#"[{"subject": "1111111111", "date": "2023-02-10", "employer_id": "1",
                 "income": 10.0, "income_type_code": "101"}]"#,
        )
        .unwrap();
        let record = rows[0].clone().into_record().unwrap();
        assert_eq!((record.year, record.quarter), (2023, 1));
        assert_eq!(record.tax, 0.0);
        assert_eq!(record.profit, 10.0);
    }
}
