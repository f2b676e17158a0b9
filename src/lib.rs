//! # Income Report Builder
//!
//! A library for turning a flat table of per-person income records into the
//! data behind a human-readable income summary: the period covered, totals and
//! averages, per-year / per-income-type / per-employer breakdowns, ranked chart
//! buckets with a long-tail "Other" slice, and a year -> income type -> employer
//! pivot table whose merged cells are spelled out as explicit row spans.
//!
//! Rendering (documents, charts, files) is left to the caller. Every function
//! here is pure: one subject's report never depends on another's.
//!
//! ## Core Concepts
//!
//! - **Subject**: the person whose records are summarized
//! - **Period**: a (year, quarter) pair; durations count whole quarters
//! - **Merge-continuation**: a pivot cell left empty because the cell above covers it
//! - **Other bucket**: contributors below a percentage threshold, folded together
//!
//! ## Example
//!
//! ```rust,ignore
//! use income_report_builder::*;
//!
//! let records = vec![IncomeRecord {
//!     year: 2022,
//!     quarter: 2,
//!     employer_id: "12345678".to_string(),
//!     employer_name: "Acme".to_string(),
//!     income: 1_000.0,
//!     tax: 195.0,
//!     profit: 805.0,
//!     income_type_code: "101".to_string(),
//! }];
//!
//! let report = IncomeReportProcessor::process(
//!     "1234567890",
//!     &records,
//!     &ReportOptions::default(),
//!     &LabelCatalog::default(),
//! )
//! .unwrap();
//! assert_eq!(report.intro.duration.display_text, "0 y. 3 mo.");
//! ```

pub mod aggregate;
pub mod error;
pub mod format;
pub mod ingestion;
pub mod labels;
pub mod period;
pub mod pivot;
pub mod ranking;
pub mod report;
pub mod schema;
pub mod utils;

pub use aggregate::{
    aggregate, aggregate_sorted, employer_names, quarterly_timeline, yearly_timeline,
    AggregateGroup, Amount, GroupField, KeyPart, PeriodRow, PeriodTotals,
};
pub use error::{IncomeReportError, Result};
pub use format::{format_amount, format_amount_or_na, format_thousands, NOT_AVAILABLE};
pub use ingestion::*;
pub use labels::{CompanyFormRule, CompanyTitles, LabelCatalog, UNNAMED_EMPLOYER};
pub use period::{compute_duration, profit_averages, Duration, Period, PeriodRange, ProfitAverages};
pub use pivot::{build_pivot, CellSpan, PivotColumn, PivotRow, PivotTable};
pub use ranking::{rank, rank_descending, RankedBucket, OTHER_LABEL};
pub use report::*;
pub use schema::*;
pub use utils::*;

use log::{error, info};
use std::collections::BTreeMap;

/// Outcome of a batch run: the reports that were built, and the subjects
/// that failed together with their errors.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub reports: Vec<SubjectReport>,
    pub failures: Vec<(String, IncomeReportError)>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct IncomeReportProcessor;

impl IncomeReportProcessor {
    pub fn process(
        subject: &str,
        records: &[IncomeRecord],
        options: &ReportOptions,
        labels: &LabelCatalog,
    ) -> Result<SubjectReport> {
        validate_options(options)?;
        SubjectReport::build(subject, records, options, labels)
    }

    /// Builds one report per subject, sequentially. A failing subject is
    /// logged and recorded; the remaining subjects are still processed.
    pub fn process_batch(
        subjects: &BTreeMap<String, Vec<IncomeRecord>>,
        options: &ReportOptions,
        labels: &LabelCatalog,
    ) -> BatchOutcome {
        Self::run_batch(subjects, Vec::new(), options, labels)
    }

    /// Like [`Self::process_batch`], but subjects that already failed during
    /// ingestion are carried over into the outcome's failures.
    pub fn process_ingested(
        ingested: IngestedSubjects,
        options: &ReportOptions,
        labels: &LabelCatalog,
    ) -> BatchOutcome {
        for (subject, e) in &ingested.failures {
            error!("Skipping report for subject {}: {}", subject, e);
        }
        Self::run_batch(&ingested.subjects, ingested.failures, options, labels)
    }

    fn run_batch(
        subjects: &BTreeMap<String, Vec<IncomeRecord>>,
        failures: Vec<(String, IncomeReportError)>,
        options: &ReportOptions,
        labels: &LabelCatalog,
    ) -> BatchOutcome {
        info!(
            "Processing income reports for {} subjects",
            subjects.len() + failures.len()
        );

        let mut outcome = BatchOutcome {
            reports: Vec::with_capacity(subjects.len()),
            failures,
        };
        for (subject, records) in subjects {
            match Self::process(subject, records, options, labels) {
                Ok(report) => outcome.reports.push(report),
                Err(e) => {
                    error!("Skipping report for subject {}: {}", subject, e);
                    outcome.failures.push((subject.clone(), e));
                }
            }
        }
        outcome.failures.sort_by(|a, b| a.0.cmp(&b.0));

        info!(
            "Batch finished: {} reports, {} failures",
            outcome.reports.len(),
            outcome.failures.len()
        );
        outcome
    }
}

pub fn process_subject(
    subject: &str,
    records: &[IncomeRecord],
    options: &ReportOptions,
    labels: &LabelCatalog,
) -> Result<SubjectReport> {
    IncomeReportProcessor::process(subject, records, options, labels)
}

pub fn process_batch(
    subjects: &BTreeMap<String, Vec<IncomeRecord>>,
    options: &ReportOptions,
    labels: &LabelCatalog,
) -> BatchOutcome {
    IncomeReportProcessor::process_batch(subjects, options, labels)
}

pub fn process_ingested(
    ingested: IngestedSubjects,
    options: &ReportOptions,
    labels: &LabelCatalog,
) -> BatchOutcome {
    IncomeReportProcessor::process_ingested(ingested, options, labels)
}

fn validate_options(options: &ReportOptions) -> Result<()> {
    let threshold = options.pie_percent_threshold;
    if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
        return Err(IncomeReportError::InvalidThreshold(threshold));
    }
    Ok(())
}
